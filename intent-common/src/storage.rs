//! Persisted key/value client state
//!
//! A small JSON object on disk with `get_item` / `set_item` / `remove_item`
//! semantics. Every mutation is written through immediately (temp file +
//! rename) so a crash never leaves a half-written file behind.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// File name used inside the root folder
pub const LOCAL_STORAGE_FILE: &str = "local_storage.json";

/// Key/value store persisted as a JSON object
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    items: Map<String, Value>,
}

impl LocalStorage {
    /// Open the store at `<root_folder>/local_storage.json`
    pub fn in_root_folder(root_folder: &Path) -> Result<Self> {
        Self::open(root_folder.join(LOCAL_STORAGE_FILE))
    }

    /// Open (or lazily create) the store at `path`
    ///
    /// An unreadable or corrupt file is treated as empty; it is replaced on
    /// the next mutation.
    pub fn open(path: PathBuf) -> Result<Self> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(
                        "Local storage at {} is not a JSON object, starting empty",
                        path.display()
                    );
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = items.len(), "Local storage opened");
        Ok(Self { path, items })
    }

    pub fn get_item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub async fn set_item(&mut self, key: &str, value: Value) -> Result<()> {
        self.items.insert(key.to_string(), value);
        self.flush().await
    }

    /// Remove `key`; removing an absent key is not an error
    pub async fn remove_item(&mut self, key: &str) -> Result<()> {
        if self.items.remove(key).is_some() {
            self.flush().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.items)
            .map_err(|e| Error::Storage(format!("Serialize failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!(
                "Write {} failed: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}
