use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    constants::{BREAK_LABEL, STORE_KEYS},
    domain::{Session, TimerState},
    error::StoreError,
    store::{KeyValueStore, save_json},
};

/// On-disk mirror of an in-flight [`Session`] under the `runningState` key.
///
/// `startTime` is the back-dated start of the current interval, `elapsedTime`
/// the time carried over from earlier intervals. `paused` and `savedAt` are
/// optional on read so older snapshots still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningStateSnapshot {
    pub task: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub task_before_break: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
}

impl RunningStateSnapshot {
    pub fn from_session(session: &Session, saved_at_ms: i64) -> Self {
        Self {
            task: session.task.clone(),
            start_time: session.started_at_ms,
            elapsed_time: session.accumulated_ms,
            is_break: session.state == TimerState::OnBreak,
            task_before_break: session.task_before_break.clone(),
            paused: session.state == TimerState::Paused,
            saved_at: Some(saved_at_ms),
        }
    }

    /// Rebuilds the session, or `None` when the fields contradict each other.
    pub fn into_session(self) -> Option<Session> {
        let state = match (self.is_break, self.paused) {
            (true, false) => TimerState::OnBreak,
            (false, true) => TimerState::Paused,
            (false, false) => TimerState::Running,
            (true, true) => return None,
        };

        if state.is_ticking() && self.start_time.is_none() {
            return None;
        }
        // Carried time must fit the signed millisecond clock.
        if i64::try_from(self.elapsed_time).is_err() {
            return None;
        }
        if state == TimerState::OnBreak && self.task_before_break.is_empty() {
            return None;
        }
        if state != TimerState::OnBreak && (self.task.is_empty() || self.task == BREAK_LABEL) {
            return None;
        }

        Some(Session {
            state,
            task: if state == TimerState::OnBreak {
                BREAK_LABEL.to_string()
            } else {
                self.task
            },
            started_at_ms: if state.is_ticking() {
                self.start_time
            } else {
                None
            },
            accumulated_ms: self.elapsed_time,
            task_before_break: self.task_before_break,
        })
    }
}

/// A snapshot read back from the store, with the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredSession {
    pub session: Session,
    pub saved_at_ms: Option<i64>,
}

pub struct RecoveryManager<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> RecoveryManager<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Persists `session`; an idle session clears the snapshot instead.
    pub fn snapshot(&self, session: &Session, now_ms: i64) -> Result<(), StoreError> {
        if session.state == TimerState::Idle {
            return self.clear();
        }
        let snapshot = RunningStateSnapshot::from_session(session, now_ms);
        save_json(self.store, STORE_KEYS.running_state, &snapshot)
    }

    /// Reads the persisted session. Anything unreadable is logged, deleted
    /// and reported as absent so a bad snapshot cannot wedge startup.
    pub fn restore(&self) -> Option<RestoredSession> {
        let raw = match self.store.get(STORE_KEYS.running_state) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read running state");
                return None;
            }
        };

        let snapshot = match serde_json::from_str::<Option<RunningStateSnapshot>>(&raw) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "discarding malformed running state");
                self.discard();
                return None;
            }
        };

        let saved_at_ms = snapshot.saved_at;
        match snapshot.into_session() {
            Some(session) => Some(RestoredSession {
                session,
                saved_at_ms,
            }),
            None => {
                warn!("discarding inconsistent running state");
                self.discard();
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(STORE_KEYS.running_state)
    }

    fn discard(&self) {
        if let Err(e) = self.clear() {
            warn!(error = %e, "could not delete running state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn running(task: &str, start: i64, carried: u64) -> Session {
        Session {
            state: TimerState::Running,
            task: task.to_string(),
            started_at_ms: Some(start),
            accumulated_ms: carried,
            task_before_break: String::new(),
        }
    }

    #[test]
    fn test_snapshot_then_restore_is_identity() {
        let store = MemoryStore::new();
        let recovery = RecoveryManager::new(&store);

        let sessions = vec![
            running("Write report", 1_000, 0),
            running("Write report", 1_000, 4_000),
            Session {
                state: TimerState::Paused,
                task: "A".to_string(),
                started_at_ms: None,
                accumulated_ms: 9_000,
                task_before_break: String::new(),
            },
            Session {
                state: TimerState::OnBreak,
                task: BREAK_LABEL.to_string(),
                started_at_ms: Some(20_000),
                accumulated_ms: 0,
                task_before_break: "A".to_string(),
            },
        ];

        for session in sessions {
            recovery.snapshot(&session, 30_000).unwrap();
            let restored = recovery.restore().expect("snapshot should restore");
            assert_eq!(restored.session, session);
            assert_eq!(restored.saved_at_ms, Some(30_000));
        }
    }

    #[test]
    fn test_snapshot_uses_store_schema() {
        let store = MemoryStore::new();
        RecoveryManager::new(&store)
            .snapshot(&running("A", 1_000, 0), 5_000)
            .unwrap();

        let raw = store.raw("runningState").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["task"], "A");
        assert_eq!(value["startTime"], 1_000);
        assert_eq!(value["elapsedTime"], 0);
        assert_eq!(value["isBreak"], false);
        assert_eq!(value["taskBeforeBreak"], "");
        assert_eq!(value["savedAt"], 5_000);
    }

    #[test]
    fn test_restores_snapshot_without_optional_fields() {
        let store = MemoryStore::new();
        store
            .set(
                "runningState",
                "{\"task\":\"BREAK\",\"startTime\":100,\"elapsedTime\":0,\"isBreak\":true,\"taskBeforeBreak\":\"A\"}",
            )
            .unwrap();

        let restored = RecoveryManager::new(&store).restore().unwrap();
        assert_eq!(restored.session.state, TimerState::OnBreak);
        assert_eq!(restored.session.task_before_break, "A");
        assert_eq!(restored.saved_at_ms, None);
    }

    #[test]
    fn test_idle_snapshot_clears_key() {
        let store = MemoryStore::new();
        let recovery = RecoveryManager::new(&store);
        recovery.snapshot(&running("A", 0, 0), 0).unwrap();
        recovery.snapshot(&Session::idle(), 0).unwrap();
        assert_eq!(store.raw("runningState"), None);
    }

    #[test]
    fn test_malformed_snapshot_is_discarded() {
        let store = MemoryStore::new();
        store.set("runningState", "{\"task\":").unwrap();

        assert!(RecoveryManager::new(&store).restore().is_none());
        assert_eq!(store.raw("runningState"), None);
    }

    #[test]
    fn test_running_snapshot_without_start_is_discarded() {
        let store = MemoryStore::new();
        store
            .set("runningState", "{\"task\":\"A\",\"elapsedTime\":500}")
            .unwrap();

        assert!(RecoveryManager::new(&store).restore().is_none());
        assert_eq!(store.raw("runningState"), None);
    }

    #[test]
    fn test_snapshot_with_oversized_elapsed_is_discarded() {
        let store = MemoryStore::new();
        store
            .set(
                "runningState",
                "{\"task\":\"A\",\"elapsedTime\":9223372036854775808,\"paused\":true}",
            )
            .unwrap();

        assert!(RecoveryManager::new(&store).restore().is_none());
        assert_eq!(store.raw("runningState"), None);
    }

    #[test]
    fn test_null_snapshot_is_absent() {
        let store = MemoryStore::new();
        store.set("runningState", "null").unwrap();
        assert!(RecoveryManager::new(&store).restore().is_none());
    }
}
