use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    clock::Clock,
    constants::{BREAK_LABEL, DEFAULT_TASK_LABEL, TIME_SETTINGS},
    domain::{DayLedger, Session, TimerState},
    ledger::{Ledger, OverallAggregate},
    recovery::RecoveryManager,
    store::KeyValueStore,
    time_format::format_duration,
};

/// Periodic scheduling contract implemented by the host. Disarming is the
/// only cancellation.
pub trait Ticker {
    fn arm(&mut self, period: Duration);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
    /// True once per elapsed period while armed.
    fn due(&mut self) -> bool;
}

/// Ticker backed by `Instant`, polled from the host loop.
#[derive(Debug, Default)]
pub struct IntervalTicker {
    period: Option<Duration>,
    next_at: Option<Instant>,
}

impl IntervalTicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ticker for IntervalTicker {
    fn arm(&mut self, period: Duration) {
        self.period = Some(period);
        self.next_at = Some(Instant::now() + period);
    }

    fn disarm(&mut self) {
        self.period = None;
        self.next_at = None;
    }

    fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    fn due(&mut self) -> bool {
        let (Some(period), Some(next_at)) = (self.period, self.next_at) else {
            return false;
        };
        let now = Instant::now();
        if now < next_at {
            return false;
        }
        // Missed periods collapse into a single tick.
        self.next_at = Some(now + period);
        true
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub default_task: String,
    pub tick_period: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_task: DEFAULT_TASK_LABEL.to_string(),
            tick_period: Duration::from_millis(TIME_SETTINGS.tick_ms),
        }
    }
}

/// What the display layer needs each refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TimerView {
    pub state: TimerState,
    pub label: String,
    pub elapsed_ms: u64,
    pub elapsed: String,
    pub today: DayLedger,
    pub today_total_ms: u64,
    pub overall_total_ms: u64,
}

/// Running total for one date, adjusted in step with ledger mutations and
/// never allowed below zero.
#[derive(Debug, Clone)]
struct DailyTotal {
    date: String,
    ms: u64,
}

pub struct TimerEngine {
    session: Session,
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    ticker: Box<dyn Ticker>,
    settings: EngineSettings,
    last_elapsed_ms: u64,
    daily_total: DailyTotal,
}

impl TimerEngine {
    /// Builds the engine and resumes any session left in the store by a
    /// previous process.
    pub fn new(
        store: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
        ticker: Box<dyn Ticker>,
        settings: EngineSettings,
    ) -> Self {
        let today = clock.today();
        let today_total = Ledger::new(store.as_ref()).day(&today).work_total_ms();

        let mut engine = Self {
            session: Session::idle(),
            store,
            clock,
            ticker,
            settings,
            last_elapsed_ms: 0,
            daily_total: DailyTotal {
                date: today,
                ms: today_total,
            },
        };
        engine.restore();
        engine
    }

    fn restore(&mut self) {
        let Some(restored) = RecoveryManager::new(self.store.as_ref()).restore() else {
            info!("no running state to restore");
            return;
        };

        let now = self.clock.now_ms();
        self.session = restored.session;
        self.last_elapsed_ms = self.session.elapsed_ms(now);

        let gap_ms = restored
            .saved_at_ms
            .map(|saved| now.saturating_sub(saved).max(0));
        info!(
            state = %self.session.state,
            task = %self.session.task,
            elapsed_ms = self.last_elapsed_ms,
            gap_since_snapshot_ms = ?gap_ms,
            "restored running state"
        );

        if self.session.state.is_ticking() {
            self.ticker.arm(self.settings.tick_period);
            self.persist_snapshot();
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> TimerState {
        self.session.state
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.session.elapsed_ms(self.clock.now_ms())
    }

    /// Elapsed as of the last tick or transition.
    pub fn last_elapsed_ms(&self) -> u64 {
        self.last_elapsed_ms
    }

    pub fn today(&self) -> String {
        self.clock.today()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.store.as_ref())
    }

    pub fn overall(&self) -> OverallAggregate<'_> {
        OverallAggregate::new(self.store.as_ref())
    }

    pub fn start(&mut self, task: &str) -> bool {
        if self.session.state != TimerState::Idle {
            debug!(state = %self.session.state, "start ignored");
            return false;
        }

        let now = self.clock.now_ms();
        let trimmed = task.trim();
        self.session.task = if trimmed.is_empty() || trimmed == BREAK_LABEL {
            self.settings.default_task.clone()
        } else {
            trimmed.to_string()
        };
        self.session.started_at_ms = Some(back_dated_start(now, self.session.accumulated_ms));
        self.session.state = TimerState::Running;
        self.begin_ticking(now);

        info!(task = %self.session.task, "timer started");
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.session.state != TimerState::Running {
            debug!(state = %self.session.state, "pause ignored");
            return false;
        }

        let now = self.clock.now_ms();
        self.ticker.disarm();
        self.session.accumulated_ms = self.session.elapsed_ms(now);
        self.session.started_at_ms = None;
        self.session.state = TimerState::Paused;
        self.last_elapsed_ms = self.session.accumulated_ms;
        self.persist_snapshot();

        info!(
            task = %self.session.task,
            accumulated_ms = self.session.accumulated_ms,
            "timer paused"
        );
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.session.state != TimerState::Paused {
            debug!(state = %self.session.state, "resume ignored");
            return false;
        }

        let now = self.clock.now_ms();
        self.session.started_at_ms = Some(back_dated_start(now, self.session.accumulated_ms));
        self.session.state = TimerState::Running;
        self.begin_ticking(now);

        info!(task = %self.session.task, "timer resumed");
        true
    }

    pub fn toggle_break(&mut self) -> bool {
        let now = self.clock.now_ms();
        match self.session.state {
            TimerState::Idle => {
                debug!("break ignored while idle");
                false
            }
            TimerState::Running | TimerState::Paused => {
                let pending = self.session.elapsed_ms(now);
                let task = std::mem::replace(&mut self.session.task, BREAK_LABEL.to_string());
                self.commit_task(now, &task, pending);

                self.session.task_before_break = task;
                self.session.accumulated_ms = 0;
                self.session.started_at_ms = Some(now);
                self.session.state = TimerState::OnBreak;
                self.begin_ticking(now);

                info!(
                    task = %self.session.task_before_break,
                    flushed_ms = pending,
                    "break started"
                );
                true
            }
            TimerState::OnBreak => {
                let pending = self.session.elapsed_ms(now);
                self.commit_break(now, pending);

                self.session.task = std::mem::take(&mut self.session.task_before_break);
                self.session.accumulated_ms = 0;
                self.session.started_at_ms = Some(now);
                self.session.state = TimerState::Running;
                self.begin_ticking(now);

                info!(task = %self.session.task, break_ms = pending, "break ended");
                true
            }
        }
    }

    /// Commits pending time and returns to idle. Returns the flushed amount,
    /// or `None` when there was no session.
    pub fn stop_and_flush(&mut self) -> Option<u64> {
        if self.session.state == TimerState::Idle {
            debug!("stop ignored while idle");
            return None;
        }

        let now = self.clock.now_ms();
        let pending = self.session.elapsed_ms(now);
        if self.session.state == TimerState::OnBreak {
            self.commit_break(now, pending);
        } else {
            let task = self.session.task.clone();
            self.commit_task(now, &task, pending);
        }

        info!(
            state = %self.session.state,
            task = %self.session.task,
            flushed_ms = pending,
            "timer stopped"
        );

        self.ticker.disarm();
        self.session = Session::idle();
        self.last_elapsed_ms = 0;
        if let Err(e) = RecoveryManager::new(self.store.as_ref()).clear() {
            error!(error = %e, "failed to delete running state");
        }
        Some(pending)
    }

    /// Recomputes elapsed from the interval start and rewrites the snapshot.
    /// Returns the fresh elapsed value.
    pub fn tick(&mut self) -> u64 {
        let now = self.clock.now_ms();
        self.last_elapsed_ms = self.session.elapsed_ms(now);
        if self.session.state.is_ticking() {
            self.persist_snapshot_at(now);
        }
        self.last_elapsed_ms
    }

    /// Ticks if the ticker says a period has passed.
    pub fn poll_tick(&mut self) -> bool {
        if !self.session.state.is_ticking() || !self.ticker.due() {
            return false;
        }
        self.tick();
        true
    }

    /// Removes a task entry from a day and returns the removed amount.
    pub fn remove_entry(&mut self, date: &str, task: &str) -> u64 {
        let removed = match self.ledger().remove(date, task) {
            Ok(removed) => removed,
            Err(e) => {
                error!(date, task, error = %e, "failed to remove entry");
                return 0;
            }
        };

        if self.daily_total.date == date {
            self.daily_total.ms = self.daily_total.ms.saturating_sub(removed);
        }
        info!(date, task, removed_ms = removed, "entry removed");
        removed
    }

    /// Drops a day's task entries and break time. Lifetime totals are kept.
    pub fn clear_day(&mut self, date: &str) -> bool {
        if let Err(e) = self.ledger().clear(date) {
            error!(date, error = %e, "failed to clear day");
            return false;
        }

        if self.daily_total.date == date {
            self.daily_total.ms = 0;
        }
        info!(date, "day cleared");
        true
    }

    /// Today's work total as tracked by the engine.
    pub fn today_total_ms(&mut self) -> u64 {
        self.sync_daily_total();
        self.daily_total.ms
    }

    pub fn view(&mut self) -> TimerView {
        let elapsed_ms = self.elapsed_ms();
        let label = match self.session.state {
            TimerState::Idle => String::new(),
            _ => self.session.task.clone(),
        };
        let today_total_ms = self.today_total_ms();
        let today = self.ledger().day(&self.daily_total.date);

        TimerView {
            state: self.session.state,
            label,
            elapsed_ms,
            elapsed: format_duration(elapsed_ms),
            today,
            today_total_ms,
            overall_total_ms: self.overall().total_ms(),
        }
    }

    fn begin_ticking(&mut self, now: i64) {
        self.ticker.arm(self.settings.tick_period);
        self.last_elapsed_ms = self.session.elapsed_ms(now);
        self.persist_snapshot_at(now);
    }

    fn persist_snapshot(&self) {
        self.persist_snapshot_at(self.clock.now_ms());
    }

    fn persist_snapshot_at(&self, now: i64) {
        if let Err(e) = RecoveryManager::new(self.store.as_ref()).snapshot(&self.session, now) {
            error!(error = %e, "failed to write running state");
        }
    }

    /// Ledger first, then lifetime totals. Both are attributed to the date
    /// of the flush.
    fn commit_task(&mut self, now: i64, task: &str, delta_ms: u64) {
        if delta_ms == 0 {
            debug!(task, "nothing to flush");
            return;
        }

        self.sync_daily_total();
        let date = self.clock.date_key(now);
        if let Err(e) = self.ledger().flush(&date, task, delta_ms) {
            error!(date = %date, task, delta_ms, error = %e, "failed to flush task time");
            return;
        }
        if let Err(e) = self.overall().merge(task, delta_ms) {
            error!(task, delta_ms, error = %e, "failed to merge lifetime total");
        }

        if self.daily_total.date == date {
            self.daily_total.ms = self.daily_total.ms.saturating_add(delta_ms);
        }
    }

    fn commit_break(&mut self, now: i64, delta_ms: u64) {
        if delta_ms == 0 {
            return;
        }

        let date = self.clock.date_key(now);
        if let Err(e) = self.ledger().flush_break(&date, delta_ms) {
            error!(date = %date, delta_ms, error = %e, "failed to flush break time");
        }
    }

    /// Re-reads the total when the calendar day has rolled over.
    fn sync_daily_total(&mut self) {
        let today = self.clock.today();
        if self.daily_total.date != today {
            let ms = self.ledger().day(&today).work_total_ms();
            self.daily_total = DailyTotal { date: today, ms };
        }
    }
}

/// Interval start moved back by the time already carried, so that
/// `now - start` covers it. Saturates instead of overflowing.
fn back_dated_start(now: i64, carried_ms: u64) -> i64 {
    now.saturating_sub(i64::try_from(carried_ms).unwrap_or(i64::MAX))
}
