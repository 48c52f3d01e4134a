//! Platform-specific directory management
//!
//! Provides the configuration directory holding `config.toml` and the
//! per-build records. Follows the XDG Base Directory Specification on
//! Linux and standard locations on macOS.
//!
//! `CAB_CONFIG_DIR` overrides the default location.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "CAB_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "cab";

/// Subdirectory holding one record per build
const BUILDS_SUBDIR: &str = "builds";

/// Directory provider for cab
#[derive(Debug, Clone)]
pub struct CabDirs {
    config_dir: PathBuf,
}

impl CabDirs {
    /// Checks the environment first, then falls back to the platform
    /// default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Rooted at an explicit directory; used by tests.
    #[must_use]
    pub fn at(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/cab` or `~/.config/cab`
    /// - macOS: `~/Library/Application Support/cab`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Path of the global `config.toml`
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory of per-build records
    #[must_use]
    pub fn builds_dir(&self) -> PathBuf {
        self.config_dir.join(BUILDS_SUBDIR)
    }

    /// Record path for one build name
    #[must_use]
    pub fn build_record_path(&self, name: &str) -> PathBuf {
        self.builds_dir().join(format!("{name}.toml"))
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for CabDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_new_creates_instance() {
        let dirs = CabDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_builds_dir_is_under_config_dir() {
        let dirs = CabDirs::at(PathBuf::from("/tmp/cab-test"));
        assert!(dirs.builds_dir().starts_with(dirs.config_dir()));
    }

    #[test]
    fn test_build_record_path() {
        let dirs = CabDirs::at(PathBuf::from("/tmp/cab-test"));
        assert_eq!(
            dirs.build_record_path("demo"),
            PathBuf::from("/tmp/cab-test/builds/demo.toml")
        );
    }

    #[test]
    fn test_global_config_path_is_under_config_dir() {
        let dirs = CabDirs::at(PathBuf::from("/tmp/cab-test"));
        assert!(dirs.global_config_path().starts_with(dirs.config_dir()));
        assert!(dirs.global_config_path().ends_with("config.toml"));
    }
}
