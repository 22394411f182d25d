//! Configuration management for keyshelf

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::Paths;

/// Seconds a copied secret stays on the clipboard unless configured otherwise
pub const DEFAULT_CLIPBOARD_CLEAR_SECS: u64 = 30;

/// Global keyshelf configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Override for the key store location (defaults to ~/.keyshelf/api-keys.json)
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Seconds before a copied secret is scrubbed from the clipboard
    #[serde(default = "default_clipboard_clear_secs")]
    pub clipboard_clear_secs: u64,

    /// Category preselected by `list` when none is given
    #[serde(default)]
    pub default_category: Option<String>,
}

fn default_clipboard_clear_secs() -> u64 {
    DEFAULT_CLIPBOARD_CLEAR_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            clipboard_clear_secs: default_clipboard_clear_secs(),
            default_category: None,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load_default(paths: &Paths) -> Result<Self> {
        Self::load(&paths.config_file())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve where the key store lives
    ///
    /// Without an override, a store left at the legacy location is used
    /// until one exists at the default location.
    pub fn store_file(&self, paths: &Paths) -> PathBuf {
        if let Some(p) = &self.store_path {
            return paths.expand(p);
        }

        let default = paths.store_file();
        let legacy = paths.legacy_store_file();
        if !default.exists() && legacy.exists() {
            legacy
        } else {
            default
        }
    }

    pub fn clipboard_clear_delay(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.clipboard_clear_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"store_path": "~/vault/keys.json"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.clipboard_clear_secs, 30);

        let paths = Paths::with_root(dir.path());
        assert_eq!(config.store_file(&paths), dir.path().join("vault/keys.json"));
    }

    #[test]
    fn test_legacy_store_used_until_default_exists() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        let config = Config::default();

        assert_eq!(config.store_file(&paths), paths.store_file());

        std::fs::create_dir_all(paths.legacy_store_file().parent().unwrap()).unwrap();
        std::fs::write(paths.legacy_store_file(), "[]").unwrap();
        assert_eq!(config.store_file(&paths), paths.legacy_store_file());

        std::fs::create_dir_all(&paths.store_dir).unwrap();
        std::fs::write(paths.store_file(), "[]").unwrap();
        assert_eq!(config.store_file(&paths), paths.store_file());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            store_path: None,
            clipboard_clear_secs: 10,
            default_category: Some("work".to_string()),
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
