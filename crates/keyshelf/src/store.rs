//! Key store - CRUD over a single JSON document
//!
//! Every operation reads the whole document and every mutation rewrites it.
//! Nothing is cached between calls, so two processes writing the same file
//! race and the last writer wins. That is accepted for a single-user tool.
//!
//! Secrets are stored in plaintext. The file is created with mode 0600 on
//! unix but is not encrypted.

use chrono::Utc;
use keyshelf_core::{Config, Paths};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{KeyError, Result};
use crate::query;
use crate::record::{KeyRecord, KeyUpdate, NewKey};

/// Schema version written to disk
pub const STORE_VERSION: u64 = 1;

/// On-disk envelope
#[derive(Serialize)]
struct Document<'a> {
    version: u64,
    keys: &'a [KeyRecord],
}

/// The key store
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the location chosen by config
    pub fn open(config: &Config, paths: &Paths) -> Self {
        Self::new(config.store_file(paths))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record
    ///
    /// A missing file is an empty store. A file that cannot be parsed is
    /// reported as `CorruptStore` rather than treated as empty.
    pub async fn list(&self) -> Result<Vec<KeyRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Key store does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(KeyError::corrupt(&self.path, "file is not valid UTF-8"));
            }
            Err(e) => return Err(KeyError::storage(&self.path, e)),
        };

        let keys = self.parse(&content)?;
        debug!(path = %self.path.display(), count = keys.len(), "Loaded key store");
        Ok(keys)
    }

    /// Add a key
    ///
    /// The duplicate check and the append work on the same snapshot.
    pub async fn add(&self, new: NewKey) -> Result<KeyRecord> {
        new.validate()?;

        let mut keys = self.list().await?;
        if keys.iter().any(|k| k.is_named(&new.service, &new.name)) {
            return Err(KeyError::DuplicateKey {
                service: new.service,
                name: new.name,
            });
        }

        let record = KeyRecord::create(new);
        keys.push(record.clone());
        self.save(&keys).await?;

        info!(id = %record.id, service = %record.service, name = %record.name, "Added API key");
        Ok(record)
    }

    /// Fetch a single key by id
    pub async fn get(&self, id: &str) -> Result<KeyRecord> {
        self.list()
            .await?
            .into_iter()
            .find(|k| k.id == id)
            .ok_or_else(|| KeyError::NotFound(id.to_string()))
    }

    /// Merge `update` into the key with the given id
    ///
    /// Renaming onto a (service, name) pair held by another key fails with
    /// `DuplicateKey` and leaves the file untouched.
    pub async fn update(&self, id: &str, update: KeyUpdate) -> Result<()> {
        let mut keys = self.list().await?;
        let idx = keys
            .iter()
            .position(|k| k.id == id)
            .ok_or_else(|| KeyError::NotFound(id.to_string()))?;

        update.validate()?;

        let mut record = keys[idx].clone();
        record.apply(update);

        let collides = keys
            .iter()
            .any(|k| k.id != id && k.is_named(&record.service, &record.name));
        if collides {
            return Err(KeyError::DuplicateKey {
                service: record.service,
                name: record.name,
            });
        }

        record.updated_at = Utc::now();
        keys[idx] = record;
        self.save(&keys).await?;

        info!(id = %id, "Updated API key");
        Ok(())
    }

    /// Record that a key was revealed or copied
    ///
    /// Best effort: an unknown id is ignored and failures are only logged.
    /// Unlike `update`, `updated_at` is left alone.
    pub async fn touch_last_used(&self, id: &str) {
        match self.try_touch(id).await {
            Ok(true) => debug!(id = %id, "Updated last used timestamp"),
            Ok(false) => debug!(id = %id, "Last used not updated, key not found"),
            Err(e) => warn!(id = %id, error = %e, "Failed to update last used timestamp"),
        }
    }

    async fn try_touch(&self, id: &str) -> Result<bool> {
        let mut keys = self.list().await?;
        let Some(record) = keys.iter_mut().find(|k| k.id == id) else {
            return Ok(false);
        };

        record.last_used_at = Some(Utc::now());
        self.save(&keys).await?;
        Ok(true)
    }

    /// Delete the key with the given id
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut keys = self.list().await?;
        let before = keys.len();
        keys.retain(|k| k.id != id);

        if keys.len() == before {
            return Err(KeyError::NotFound(id.to_string()));
        }

        self.save(&keys).await?;

        info!(id = %id, "Deleted API key");
        Ok(())
    }

    /// All categories in use, sorted and deduplicated
    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(query::categories(&self.list().await?))
    }

    /// Keys tagged with `category`
    pub async fn by_category(&self, category: &str) -> Result<Vec<KeyRecord>> {
        let mut keys = self.list().await?;
        keys.retain(|k| k.has_category(category));
        Ok(keys)
    }

    /// Parse either the versioned envelope or the legacy bare array
    fn parse(&self, content: &str) -> Result<Vec<KeyRecord>> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| KeyError::corrupt(&self.path, e))?;

        let keys = match value {
            serde_json::Value::Array(items) => serde_json::Value::Array(items),
            serde_json::Value::Object(mut map) => {
                let version = map
                    .get("version")
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| KeyError::corrupt(&self.path, "missing schema version"))?;
                if version > STORE_VERSION {
                    return Err(KeyError::corrupt(
                        &self.path,
                        format!("unsupported schema version {}", version),
                    ));
                }
                map.remove("keys")
                    .ok_or_else(|| KeyError::corrupt(&self.path, "missing keys array"))?
            }
            _ => {
                return Err(KeyError::corrupt(
                    &self.path,
                    "expected an array or an object at the top level",
                ))
            }
        };

        serde_json::from_value(keys).map_err(|e| KeyError::corrupt(&self.path, e))
    }

    /// Rewrite the whole document
    async fn save(&self, keys: &[KeyRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| KeyError::storage(parent, e))?;
            }
        }

        let document = Document {
            version: STORE_VERSION,
            keys,
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| KeyError::storage(&self.path, std::io::Error::other(e)))?;

        // Write to a sibling file then rename so a crash never truncates the store
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| KeyError::storage(&tmp_path, e))?;
        let replaced = match restrict_permissions(&tmp_path).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &self.path)
                .await
                .map_err(|e| KeyError::storage(&self.path, e)),
            Err(e) => Err(e),
        };
        if let Err(e) = replaced {
            // The temp file holds every secret; never leave it behind
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                warn!(
                    path = %tmp_path.display(),
                    error = %cleanup,
                    "Failed to remove temp store file"
                );
            }
            return Err(e);
        }

        debug!(path = %self.path.display(), count = keys.len(), "Saved key store");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| KeyError::storage(path, e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
