use crate::constants;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub type SharedCache = Arc<tokio::sync::Mutex<PersistentCache>>;

/// string key/value store backed by a single json file.
/// every `set` writes the whole store back to disk.
pub struct PersistentCache {
    path: Option<PathBuf>,
    values: HashMap<String, String>,
    writes: usize,
}

impl PersistentCache {
    /// load the store from `path`. starts empty if the file
    /// is missing or not a json string map.
    pub fn open(path: PathBuf) -> Self {
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path: Some(path), values, writes: 0 }
    }

    /// store that never touches the disk
    pub fn in_memory() -> Self {
        Self { path: None, values: HashMap::new(), writes: 0 }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        if let Some(path) = &self.path {
            // serializing a string map cannot fail
            let raw = serde_json::to_string(&self.values).unwrap();
            if let Err(error) = std::fs::write(path, raw) {
                println!("CACHE: writing {} failed: {error}", path.display());
            }
        }
    }

    /// number of `set` calls since this store was created
    pub fn writes(&self) -> usize {
        self.writes
    }
}

/// default location of the cache file in the platform cache directory
pub fn default_path() -> PathBuf {
    dirs_next::cache_dir()
        .expect("path to cache directory could not be determined, which means your operating system is not supported.\n")
        .join(constants::CACHE_FILE_NAME)
}
