use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    constants::{DEFAULT_TASK_LABEL, TIME_SETTINGS},
    engine::EngineSettings,
    store,
};

pub const DATA_DIR_ENV: &str = "DAYTIMER_DATA_DIR";

const MIN_TICK_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub default_task: String,
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_task: DEFAULT_TASK_LABEL.to_string(),
            tick_ms: TIME_SETTINGS.tick_ms,
        }
    }
}

impl Config {
    /// Loads `config.json` from the platform config dir and applies the
    /// `DAYTIMER_DATA_DIR` override.
    pub fn load() -> Self {
        let mut config = store::get_config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();

        if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        config
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str::<Config>(&content) {
            Ok(config) => config.normalized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed config, using defaults");
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        if self.default_task.trim().is_empty() {
            self.default_task = DEFAULT_TASK_LABEL.to_string();
        }
        self.tick_ms = self.tick_ms.max(MIN_TICK_MS);
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        store::get_data_dir(self.data_dir.as_deref())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_task: self.default_task.trim().to_string(),
            tick_period: Duration::from_millis(self.tick_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"default_task\":\"Focus\"}").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.default_task, "Focus");
        assert_eq!(config.tick_ms, 1000);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_malformed_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "tick_ms = 5").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_values_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"default_task\":\"  \",\"tick_ms\":1}").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.default_task, DEFAULT_TASK_LABEL);
        assert_eq!(config.engine_settings().tick_period, Duration::from_millis(100));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/daytimer-test")),
            ..Config::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/daytimer-test"));
    }
}
