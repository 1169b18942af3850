use std::collections::{BTreeMap, BTreeSet};

use crate::{
    clock::is_date_key,
    constants::STORE_KEYS,
    domain::DayLedger,
    error::StoreError,
    ledger::Ledger,
    store::KeyValueStore,
};

/// Read-only view over committed day ledgers.
pub struct HistoryIndex<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> HistoryIndex<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Every date with task or break data, newest first.
    pub fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        let dates: BTreeSet<String> = self
            .store
            .list_keys()?
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(STORE_KEYS.daily_tasks_prefix)
                    .or_else(|| key.strip_prefix(STORE_KEYS.break_time_prefix))
                    .filter(|date| is_date_key(date))
                    .map(str::to_string)
            })
            .collect();

        Ok(dates.into_iter().rev().collect())
    }

    pub fn get_day(&self, date: &str) -> DayLedger {
        Ledger::new(self.store).day(date)
    }

    /// Days between `from` and `to` inclusive, newest first. Zero-padded date
    /// keys compare chronologically as plain strings.
    pub fn range(&self, from: &str, to: &str) -> Result<Vec<DayLedger>, StoreError> {
        Ok(self
            .list_dates()?
            .into_iter()
            .filter(|date| date.as_str() >= from && date.as_str() <= to)
            .map(|date| self.get_day(&date))
            .collect())
    }

    pub fn all_days(&self) -> Result<Vec<DayLedger>, StoreError> {
        Ok(self
            .list_dates()?
            .into_iter()
            .map(|date| self.get_day(&date))
            .collect())
    }
}

/// Per-task totals over several days.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeriodSummary {
    pub entries: Vec<(String, u64)>,
    pub work_total_ms: u64,
    pub break_total_ms: u64,
    pub day_count: usize,
}

pub fn summarize(days: &[DayLedger]) -> PeriodSummary {
    let mut per_task: BTreeMap<&str, u64> = BTreeMap::new();
    let mut break_total_ms = 0u64;
    for day in days {
        for (task, ms) in &day.tasks {
            let slot = per_task.entry(task.as_str()).or_insert(0);
            *slot = slot.saturating_add(*ms);
        }
        break_total_ms = break_total_ms.saturating_add(day.break_ms);
    }

    let mut entries: Vec<(String, u64)> = per_task
        .into_iter()
        .map(|(task, ms)| (task.to_string(), ms))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    PeriodSummary {
        work_total_ms: entries.iter().map(|e| e.1).fold(0, u64::saturating_add),
        entries,
        break_total_ms,
        day_count: days.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        ledger.flush("2026-02-24", "A", 1_000).unwrap();
        ledger.flush("2026-02-25", "B", 2_000).unwrap();
        ledger.flush_break("2026-02-26", 3_000).unwrap();
        ledger.flush("2025-12-31", "C", 4_000).unwrap();
        store.set("overallTasks", "{\"A\":1000}").unwrap();
        store.set("runningState", "null").unwrap();
        store.set("daily-tasks-notadate", "{}").unwrap();
        store
    }

    #[test]
    fn test_list_dates_descending_and_deduplicated() {
        let store = seeded_store();
        Ledger::new(&store).flush_break("2026-02-25", 500).unwrap();

        let dates = HistoryIndex::new(&store).list_dates().unwrap();
        assert_eq!(
            dates,
            vec!["2026-02-26", "2026-02-25", "2026-02-24", "2025-12-31"]
        );
    }

    #[test]
    fn test_get_day_does_not_mutate() {
        let store = seeded_store();
        let history = HistoryIndex::new(&store);
        let before = store.list_keys().unwrap();

        let day = history.get_day("2026-02-25");
        assert_eq!(day.tasks.get("B"), Some(&2_000));
        let empty = history.get_day("2020-01-01");
        assert!(empty.is_empty());

        assert_eq!(store.list_keys().unwrap(), before);
    }

    #[test]
    fn test_range_is_inclusive() {
        let store = seeded_store();
        let days = HistoryIndex::new(&store)
            .range("2026-02-24", "2026-02-25")
            .unwrap();
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-02-25", "2026-02-24"]);
    }

    #[test]
    fn test_summarize_merges_days() {
        let store = seeded_store();
        Ledger::new(&store).flush("2026-02-25", "A", 500).unwrap();
        let days = HistoryIndex::new(&store).all_days().unwrap();

        let summary = summarize(&days);
        assert_eq!(summary.day_count, 4);
        assert_eq!(
            summary.entries,
            vec![
                ("C".to_string(), 4_000),
                ("B".to_string(), 2_000),
                ("A".to_string(), 1_500),
            ]
        );
        assert_eq!(summary.work_total_ms, 7_500);
        assert_eq!(summary.break_total_ms, 3_000);
    }
}
