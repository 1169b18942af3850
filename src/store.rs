use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{constants::FILE_PATHS, error::StoreError};

/// Durable string-keyed store of JSON documents. Each key is written on its
/// own; there are no multi-key transactions.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Reads `key` as JSON, falling back to `T::default()` when the key is
/// missing, unreadable or malformed.
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "malformed stored value, using default");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "store read failed, using default");
            T::default()
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &json)
}

/// One `<key>.json` file per key inside a single directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        atomic_write(&path, value).map_err(|source| StoreError::Io { path, source })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Writes through a sibling `<name>.tmp` file and renames it into place.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "daytimer", "daytimer")
}

/// Resolves where the store lives: an explicit override first, then a
/// `./.daytimer` directory in the working directory, then the platform data dir.
pub fn get_data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }

    let local = Path::new(FILE_PATHS.local_data_dir);
    if local.is_dir() {
        return local.to_path_buf();
    }

    if let Some(proj_dirs) = project_dirs() {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(FILE_PATHS.local_data_dir)
    }
}

pub fn get_state_dir() -> PathBuf {
    if let Some(proj_dirs) = project_dirs() {
        if let Some(state_dir) = proj_dirs.state_dir() {
            let dir = state_dir.to_path_buf();
            fs::create_dir_all(&dir).ok();
            return dir;
        }
        let dir = proj_dirs.cache_dir().to_path_buf();
        fs::create_dir_all(&dir).ok();
        return dir;
    }
    PathBuf::from(".")
}

pub fn get_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join(FILE_PATHS.config))
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

    use super::KeyValueStore;
    use crate::error::StoreError;

    /// In-memory store for tests. Clones share the same map so a test can
    /// inspect what an engine wrote after handing it a copy.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        entries: Rc<RefCell<BTreeMap<String, String>>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn raw(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.entries.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.entries.borrow_mut().remove(key);
            Ok(())
        }

        fn list_keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.entries.borrow().keys().cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_file_store_set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("overallTasks").unwrap(), None);
        store.set("overallTasks", "{\"A\":1000}").unwrap();
        assert_eq!(
            store.get("overallTasks").unwrap().as_deref(),
            Some("{\"A\":1000}")
        );

        store.delete("overallTasks").unwrap();
        assert_eq!(store.get("overallTasks").unwrap(), None);
        store.delete("overallTasks").unwrap();
    }

    #[test]
    fn test_file_store_lists_only_json_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("daily-tasks-2026-02-25", "{}").unwrap();
        store.set("break-time-2026-02-25", "0").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(
            keys,
            vec![
                "break-time-2026-02-25".to_string(),
                "daily-tasks-2026-02-25".to_string()
            ]
        );
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.set("../escape", "1"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_load_json_defaults_on_missing_and_malformed() {
        let store = MemoryStore::new();
        let missing: BTreeMap<String, u64> = load_json(&store, "overallTasks");
        assert!(missing.is_empty());

        store.set("overallTasks", "{not json").unwrap();
        let malformed: BTreeMap<String, u64> = load_json(&store, "overallTasks");
        assert!(malformed.is_empty());
    }

    #[test]
    fn test_save_json_round_trips_through_store() {
        let store = MemoryStore::new();
        let mut totals = BTreeMap::new();
        totals.insert("Write report".to_string(), 125_000u64);

        save_json(&store, "overallTasks", &totals).unwrap();
        let loaded: BTreeMap<String, u64> = load_json(&store, "overallTasks");
        assert_eq!(loaded, totals);
    }

    #[test]
    fn test_atomic_write_keeps_tmp_named_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.tmp");
        let sibling = dir.path().join("data.json");
        fs::write(&sibling, "keep").unwrap();

        atomic_write(&target, "export").unwrap();
        atomic_write(&sibling, "replaced").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "export");
        assert_eq!(fs::read_to_string(&sibling).unwrap(), "replaced");
        assert!(!dir.path().join("data.tmp.tmp").exists());
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn test_get_data_dir_prefers_override() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_data_dir(Some(dir.path())), dir.path().to_path_buf());
    }
}
