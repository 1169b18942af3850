use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    constants::{BREAK_LABEL, STORE_KEYS},
    domain::DayLedger,
    error::StoreError,
    store::{KeyValueStore, load_json, save_json},
    time_format::parse_duration,
};

/// Per-day task totals and break time, keyed by date.
pub struct Ledger<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn day(&self, date: &str) -> DayLedger {
        DayLedger {
            date: date.to_string(),
            tasks: load_ms_map(self.store, &STORE_KEYS.daily_tasks(date)),
            break_ms: load_ms(self.store, &STORE_KEYS.break_time(date)),
        }
    }

    /// Adds `delta_ms` to `task` on `date` and returns the entry's new value.
    /// A zero delta writes nothing.
    pub fn flush(&self, date: &str, task: &str, delta_ms: u64) -> Result<u64, StoreError> {
        if task == BREAK_LABEL {
            warn!(date, "refusing to record break time as a task entry");
            return Ok(0);
        }

        let key = STORE_KEYS.daily_tasks(date);
        let mut tasks = load_ms_map(self.store, &key);
        let current = tasks.get(task).copied().unwrap_or(0);
        if delta_ms == 0 {
            return Ok(current);
        }

        let updated = current.saturating_add(delta_ms);
        tasks.insert(task.to_string(), updated);
        save_json(self.store, &key, &tasks)?;
        debug!(date, task, delta_ms, total_ms = updated, "ledger flush");
        Ok(updated)
    }

    pub fn flush_break(&self, date: &str, delta_ms: u64) -> Result<u64, StoreError> {
        let key = STORE_KEYS.break_time(date);
        let current = load_ms(self.store, &key);
        if delta_ms == 0 {
            return Ok(current);
        }

        let updated = current.saturating_add(delta_ms);
        save_json(self.store, &key, &updated)?;
        debug!(date, delta_ms, total_ms = updated, "break flush");
        Ok(updated)
    }

    /// Deletes `task` from `date` and returns what it held (zero if absent).
    pub fn remove(&self, date: &str, task: &str) -> Result<u64, StoreError> {
        let key = STORE_KEYS.daily_tasks(date);
        let mut tasks = load_ms_map(self.store, &key);
        let Some(removed) = tasks.remove(task) else {
            return Ok(0);
        };

        save_json(self.store, &key, &tasks)?;
        debug!(date, task, removed_ms = removed, "ledger remove");
        Ok(removed)
    }

    pub fn clear(&self, date: &str) -> Result<(), StoreError> {
        self.store.delete(&STORE_KEYS.daily_tasks(date))?;
        self.store.delete(&STORE_KEYS.break_time(date))
    }
}

/// Lifetime per-task totals. Only ever grows.
pub struct OverallAggregate<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> OverallAggregate<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn totals(&self) -> BTreeMap<String, u64> {
        load_ms_map(self.store, STORE_KEYS.overall_tasks)
    }

    pub fn total_ms(&self) -> u64 {
        self.totals().values().copied().fold(0, u64::saturating_add)
    }

    pub fn task_names(&self) -> Vec<String> {
        self.totals().into_keys().collect()
    }

    pub fn merge(&self, task: &str, delta_ms: u64) -> Result<u64, StoreError> {
        if task == BREAK_LABEL {
            warn!("refusing to merge break time into lifetime totals");
            return Ok(0);
        }

        let mut totals = self.totals();
        let current = totals.get(task).copied().unwrap_or(0);
        if delta_ms == 0 {
            return Ok(current);
        }

        let updated = current.saturating_add(delta_ms);
        totals.insert(task.to_string(), updated);
        save_json(self.store, STORE_KEYS.overall_tasks, &totals)?;
        Ok(updated)
    }
}

/// Reads a task → milliseconds map. Entries that are not non-negative
/// numbers or `HH:MM:SS` strings are dropped one by one; fractional values
/// are floored.
pub(crate) fn load_ms_map(store: &dyn KeyValueStore, key: &str) -> BTreeMap<String, u64> {
    let raw: BTreeMap<String, Value> = load_json(store, key);
    raw.into_iter()
        .filter_map(|(task, value)| match value_to_ms(&value) {
            Some(ms) if task != BREAK_LABEL => Some((task, ms)),
            Some(_) => None,
            None => {
                warn!(key, task = %task, "dropping malformed duration entry");
                None
            }
        })
        .collect()
}

fn load_ms(store: &dyn KeyValueStore, key: &str) -> u64 {
    let raw: Value = load_json(store, key);
    match raw {
        Value::Null => 0,
        other => value_to_ms(&other).unwrap_or_else(|| {
            warn!(key, "malformed duration value, treating as zero");
            0
        }),
    }
}

fn value_to_ms(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    if let Some(text) = value.as_str() {
        return (text.split(':').count() == 3).then(|| parse_duration(text));
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const DAY: &str = "2026-02-25";

    #[test]
    fn test_flush_accumulates_per_task() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);

        assert_eq!(ledger.flush(DAY, "A", 10_000).unwrap(), 10_000);
        assert_eq!(ledger.flush(DAY, "A", 20_000).unwrap(), 30_000);
        ledger.flush(DAY, "B", 5_000).unwrap();

        let day = ledger.day(DAY);
        assert_eq!(day.tasks.get("A"), Some(&30_000));
        assert_eq!(day.tasks.get("B"), Some(&5_000));
        assert_eq!(day.work_total_ms(), 35_000);
    }

    #[test]
    fn test_zero_flush_creates_nothing() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);

        assert_eq!(ledger.flush(DAY, "A", 0).unwrap(), 0);
        assert_eq!(ledger.flush_break(DAY, 0).unwrap(), 0);
        assert_eq!(store.raw("daily-tasks-2026-02-25"), None);
        assert_eq!(store.raw("break-time-2026-02-25"), None);

        ledger.flush(DAY, "A", 1_000).unwrap();
        assert_eq!(ledger.flush(DAY, "A", 0).unwrap(), 1_000);
    }

    #[test]
    fn test_break_label_never_becomes_a_task() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);

        ledger.flush(DAY, BREAK_LABEL, 5_000).unwrap();
        assert!(ledger.day(DAY).tasks.is_empty());

        store
            .set("daily-tasks-2026-02-25", "{\"BREAK\":5000,\"A\":1000}")
            .unwrap();
        assert_eq!(ledger.day(DAY).tasks.len(), 1);
    }

    #[test]
    fn test_flush_break_is_separate_from_tasks() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);

        ledger.flush_break(DAY, 5_000).unwrap();
        ledger.flush_break(DAY, 2_500).unwrap();

        let day = ledger.day(DAY);
        assert_eq!(day.break_ms, 7_500);
        assert!(day.tasks.is_empty());
        assert_eq!(store.raw("break-time-2026-02-25").as_deref(), Some("7500"));
    }

    #[test]
    fn test_remove_then_flush_restores_total() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        ledger.flush(DAY, "A", 120_000).unwrap();
        ledger.flush(DAY, "B", 60_000).unwrap();
        let before = ledger.day(DAY).work_total_ms();

        let removed = ledger.remove(DAY, "B").unwrap();
        assert_eq!(removed, 60_000);
        assert_eq!(ledger.day(DAY).work_total_ms(), 120_000);
        assert_eq!(ledger.remove(DAY, "B").unwrap(), 0);

        ledger.flush(DAY, "B", removed).unwrap();
        assert_eq!(ledger.day(DAY).work_total_ms(), before);
    }

    #[test]
    fn test_clear_drops_day_but_not_overall() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        let overall = OverallAggregate::new(&store);

        ledger.flush(DAY, "A", 10_000).unwrap();
        overall.merge("A", 10_000).unwrap();
        ledger.flush_break(DAY, 3_000).unwrap();

        ledger.clear(DAY).unwrap();
        assert!(ledger.day(DAY).is_empty());
        assert_eq!(overall.total_ms(), 10_000);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let first = MemoryStore::new();
        let second = MemoryStore::new();

        OverallAggregate::new(&first).merge("A", 1_000).unwrap();
        OverallAggregate::new(&first).merge("A", 2_000).unwrap();
        OverallAggregate::new(&second).merge("A", 2_000).unwrap();
        OverallAggregate::new(&second).merge("A", 1_000).unwrap();

        assert_eq!(
            OverallAggregate::new(&first).totals(),
            OverallAggregate::new(&second).totals()
        );
    }

    #[test]
    fn test_merge_refuses_break() {
        let store = MemoryStore::new();
        let overall = OverallAggregate::new(&store);
        overall.merge(BREAK_LABEL, 5_000).unwrap();
        assert!(overall.totals().is_empty());
    }

    #[test]
    fn test_malformed_entries_are_dropped_individually() {
        let store = MemoryStore::new();
        store
            .set(
                "daily-tasks-2026-02-25",
                "{\"A\":1500.7,\"B\":\"soon\",\"C\":-4,\"D\":2000}",
            )
            .unwrap();
        store.set("break-time-2026-02-25", "\"lots\"").unwrap();

        let day = Ledger::new(&store).day(DAY);
        assert_eq!(day.tasks.get("A"), Some(&1_500));
        assert_eq!(day.tasks.get("D"), Some(&2_000));
        assert_eq!(day.tasks.len(), 2);
        assert_eq!(day.break_ms, 0);
    }

    #[test]
    fn test_clock_strings_are_read_as_durations() {
        let store = MemoryStore::new();
        store
            .set("daily-tasks-2026-02-25", "{\"A\":\"00:02:05\",\"B\":\"x:y:z\"}")
            .unwrap();
        store.set("break-time-2026-02-25", "\"00:00:05\"").unwrap();

        let day = Ledger::new(&store).day(DAY);
        assert_eq!(day.tasks.get("A"), Some(&125_000));
        assert_eq!(day.tasks.get("B"), Some(&0));
        assert_eq!(day.break_ms, 5_000);
    }

    #[test]
    fn test_corrupt_day_is_overwritten_on_next_flush() {
        let store = MemoryStore::new();
        store.set("daily-tasks-2026-02-25", "[[[").unwrap();

        let ledger = Ledger::new(&store);
        assert!(ledger.day(DAY).tasks.is_empty());
        ledger.flush(DAY, "A", 1_000).unwrap();
        assert_eq!(ledger.day(DAY).tasks.get("A"), Some(&1_000));
    }
}
