use std::{collections::BTreeMap, fmt};

use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    OnBreak,
}

impl TimerState {
    /// States during which wall-clock time is being counted and ticks fire.
    pub fn is_ticking(self) -> bool {
        matches!(self, TimerState::Running | TimerState::OnBreak)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::OnBreak => "on break",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The live timing context. `started_at_ms` is back-dated by any time carried
/// over from earlier running intervals, so `now - started_at_ms` is already
/// the whole pending elapsed time.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Session {
    pub state: TimerState,
    pub task: String,
    pub started_at_ms: Option<i64>,
    pub accumulated_ms: u64,
    pub task_before_break: String,
}

impl Session {
    pub fn idle() -> Self {
        Self {
            state: TimerState::Idle,
            task: String::new(),
            started_at_ms: None,
            accumulated_ms: 0,
            task_before_break: String::new(),
        }
    }

    /// Pending, not yet flushed time at `now_ms`. A clock that moved
    /// backwards yields zero rather than a negative span.
    pub fn elapsed_ms(&self, now_ms: i64) -> u64 {
        match self.state {
            TimerState::Running | TimerState::OnBreak => self
                .started_at_ms
                .map(|start| now_ms.saturating_sub(start).max(0) as u64)
                .unwrap_or(self.accumulated_ms),
            TimerState::Paused => self.accumulated_ms,
            TimerState::Idle => 0,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::idle()
    }
}

/// One day's committed totals.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct DayLedger {
    pub date: String,
    pub tasks: BTreeMap<String, u64>,
    pub break_ms: u64,
}

impl DayLedger {
    pub fn work_total_ms(&self) -> u64 {
        self.tasks.values().copied().fold(0, u64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.break_ms == 0
    }

    /// Entries ordered by duration, longest first, ties by name.
    pub fn entries_by_duration(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .tasks
            .iter()
            .map(|(name, ms)| (name.as_str(), *ms))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}
