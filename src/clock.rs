use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::constants::DATE_FORMAT;

/// Source of wall-clock time for the timer engine.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Calendar date key (`YYYY-MM-DD`) that `at_ms` falls on.
    fn date_key(&self, at_ms: i64) -> String;

    fn today(&self) -> String {
        self.date_key(self.now_ms())
    }
}

/// Real time, with dates taken in the local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn date_key(&self, at_ms: i64) -> String {
        match DateTime::<Utc>::from_timestamp_millis(at_ms) {
            Some(utc) => utc.with_timezone(&Local).format(DATE_FORMAT).to_string(),
            None => Local::now().format(DATE_FORMAT).to_string(),
        }
    }
}

pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub fn is_date_key(value: &str) -> bool {
    // NaiveDate accepts "2026-1-5"; keys must be zero-padded to sort correctly.
    value.len() == 10 && parse_date_key(value).is_some()
}

#[cfg(test)]
pub use manual::ManualClock;
