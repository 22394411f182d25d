//! Standard paths used by keyshelf

use std::path::{Path, PathBuf};

/// Directory under the home directory that holds the key store
pub const STORE_DIR: &str = ".keyshelf";

/// File name of the key store document
pub const STORE_FILE: &str = "api-keys.json";

/// Directory used by earlier releases of the key manager
pub const LEGACY_STORE_DIR: &str = ".raycast-api-keys";

/// Standard keyshelf paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Home directory (~)
    pub home: PathBuf,
    /// Config directory (~/.config/keyshelf)
    pub config: PathBuf,
    /// Store directory (~/.keyshelf)
    pub store_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        let config = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("keyshelf");

        let store_dir = home.join(STORE_DIR);

        Self {
            home,
            config,
            store_dir,
        }
    }

    /// Build paths rooted somewhere other than the user's home directory
    pub fn with_root(root: &Path) -> Self {
        Self {
            home: root.to_path_buf(),
            config: root.join(".config").join("keyshelf"),
            store_dir: root.join(STORE_DIR),
        }
    }

    /// Default location of the key store document
    pub fn store_file(&self) -> PathBuf {
        self.store_dir.join(STORE_FILE)
    }

    /// Where earlier releases kept the key store
    pub fn legacy_store_file(&self) -> PathBuf {
        self.home.join(LEGACY_STORE_DIR).join(STORE_FILE)
    }

    /// Location of the config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Expand a leading `~/` against the home directory
    pub fn expand(&self, path: &Path) -> PathBuf {
        match path.strip_prefix("~") {
            Ok(rest) => self.home.join(rest),
            Err(_) => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_file_under_root() {
        let paths = Paths::with_root(Path::new("/tmp/home"));
        assert_eq!(
            paths.store_file(),
            PathBuf::from("/tmp/home/.keyshelf/api-keys.json")
        );
        assert_eq!(
            paths.legacy_store_file(),
            PathBuf::from("/tmp/home/.raycast-api-keys/api-keys.json")
        );
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/home/.config/keyshelf/config.json")
        );
    }

    #[test]
    fn test_expand_tilde() {
        let paths = Paths::with_root(Path::new("/tmp/home"));
        assert_eq!(
            paths.expand(Path::new("~/keys/store.json")),
            PathBuf::from("/tmp/home/keys/store.json")
        );
        assert_eq!(
            paths.expand(Path::new("/abs/store.json")),
            PathBuf::from("/abs/store.json")
        );
    }
}
