//! Configuration management
//!
//! Two kinds of state live under the config directory: the global
//! `config.toml` (install tree root, ccache, registry) and one record
//! per build under `builds/<name>.toml`. Build records identify a
//! logical build target across repeated invocations.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::ConfigError;
use crate::infra::dirs::CabDirs;

fn default_true() -> bool {
    true
}

/// Global configuration for cab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CabConfig {
    /// Root directory; each build installs into `<installs_dir>/<name>`
    pub installs_dir: Option<PathBuf>,

    /// Compiler cache settings
    #[serde(default)]
    pub ccache: CcacheConfig,

    /// Registry to push finished images to
    #[serde(default)]
    pub registry: Option<RegistryConfig>,

    /// Author label stamped into bootstrap images
    #[serde(default)]
    pub author: Option<AuthorConfig>,

    /// Artifact transfer settings
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Compiler cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CcacheConfig {
    /// Cache directory shared across builds
    pub dir: Option<PathBuf>,

    /// Maximum cache size (e.g. `10G`)
    pub size: Option<String>,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Host (and optional port) of the registry
    pub url: String,

    /// Verify TLS when pushing
    #[serde(default = "default_true")]
    pub secure: bool,
}

/// Author label configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

/// Artifact transfer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Extra excluded subtrees, on top of the built-in set
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl CabConfig {
    /// Load the global configuration; a missing file yields the default.
    pub fn load(dirs: &CabDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Whether a configuration has been saved at all.
    pub fn exists(dirs: &CabDirs) -> bool {
        dirs.global_config_path().exists()
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    pub fn save(&self, dirs: &CabDirs) -> Result<(), ConfigError> {
        self.save_to_path(&dirs.global_config_path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// The configured install root, required for building.
    pub fn installs_dir(&self) -> Result<&Path, ConfigError> {
        self.installs_dir
            .as_deref()
            .ok_or(ConfigError::NotInitialized)
    }

    /// Install tree of one build.
    pub fn install_dir_for(&self, build: &str) -> Result<PathBuf, ConfigError> {
        Ok(self.installs_dir()?.join(build))
    }

    /// Effective ccache size.
    #[must_use]
    pub fn ccache_size(&self) -> &str {
        self.ccache
            .size
            .as_deref()
            .unwrap_or(defaults::DEFAULT_CCACHE_SIZE)
    }

    /// Built-in exclusions plus configured extras.
    #[must_use]
    pub fn transfer_excludes(&self) -> Vec<PathBuf> {
        defaults::TRANSFER_EXCLUDES
            .iter()
            .map(PathBuf::from)
            .chain(self.transfer.excludes.iter().map(PathBuf::from))
            .collect()
    }
}

/// One logical build target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub vendor: String,
    pub release: String,
    pub sources: PathBuf,

    #[serde(default)]
    pub with_debug: bool,

    #[serde(default)]
    pub with_tests: bool,
}

impl BuildRecord {
    pub fn exists(dirs: &CabDirs, name: &str) -> bool {
        dirs.build_record_path(name).exists()
    }

    pub fn load(dirs: &CabDirs, name: &str) -> Result<Self, ConfigError> {
        let path = dirs.build_record_path(name);
        if !path.exists() {
            return Err(ConfigError::UnknownBuild {
                name: name.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            error: e.to_string(),
        })
    }

    /// Persist a new record; refuses to overwrite an existing build.
    pub fn create(&self, dirs: &CabDirs) -> Result<(), ConfigError> {
        if Self::exists(dirs, &self.name) {
            return Err(ConfigError::BuildExists {
                name: self.name.clone(),
            });
        }
        self.save(dirs)
    }

    pub fn save(&self, dirs: &CabDirs) -> Result<(), ConfigError> {
        let path = dirs.build_record_path(&self.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.clone(),
            error: e.to_string(),
        })?;
        fs::write(&path, content).map_err(|e| ConfigError::Write {
            path,
            error: e.to_string(),
        })
    }

    pub fn remove(dirs: &CabDirs, name: &str) -> Result<(), ConfigError> {
        let path = dirs.build_record_path(name);
        if !path.exists() {
            return Err(ConfigError::UnknownBuild {
                name: name.to_string(),
            });
        }
        fs::remove_file(&path).map_err(|e| ConfigError::Write {
            path,
            error: e.to_string(),
        })
    }

    /// Names of all recorded builds, sorted.
    pub fn list(dirs: &CabDirs) -> Result<Vec<String>, ConfigError> {
        let builds_dir = dirs.builds_dir();
        if !builds_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&builds_dir).map_err(|e| ConfigError::Read {
            path: builds_dir.clone(),
            error: e.to_string(),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, CabDirs) {
        let tmp = TempDir::new().unwrap();
        let dirs = CabDirs::at(tmp.path().to_path_buf());
        (tmp, dirs)
    }

    fn record(name: &str) -> BuildRecord {
        BuildRecord {
            name: name.to_string(),
            vendor: "acme".to_string(),
            release: "v1".to_string(),
            sources: PathBuf::from("/src/demo"),
            with_debug: false,
            with_tests: true,
        }
    }

    #[test]
    fn test_load_missing_config_returns_default() {
        let (_tmp, dirs) = dirs();
        let config = CabConfig::load(&dirs).unwrap();
        assert!(config.installs_dir.is_none());
        assert!(!CabConfig::exists(&dirs));
    }

    #[test]
    fn test_config_round_trip() {
        let (_tmp, dirs) = dirs();
        let config = CabConfig {
            installs_dir: Some(PathBuf::from("/data/installs")),
            ccache: CcacheConfig {
                dir: Some(PathBuf::from("/data/ccache")),
                size: Some("20G".to_string()),
            },
            registry: Some(RegistryConfig {
                url: "localhost:5000".to_string(),
                secure: false,
            }),
            author: None,
            transfer: TransferConfig {
                excludes: vec!["dist".to_string()],
            },
        };
        config.save(&dirs).unwrap();

        let loaded = CabConfig::load(&dirs).unwrap();
        assert_eq!(loaded.installs_dir, config.installs_dir);
        assert_eq!(loaded.ccache_size(), "20G");
        assert!(!loaded.registry.as_ref().unwrap().secure);
        assert!(loaded
            .transfer_excludes()
            .contains(&PathBuf::from("node_modules")));
        assert!(loaded.transfer_excludes().contains(&PathBuf::from("dist")));
    }

    #[test]
    fn test_installs_dir_required() {
        let config = CabConfig::default();
        assert!(matches!(
            config.installs_dir(),
            Err(ConfigError::NotInitialized)
        ));
    }

    #[test]
    fn test_build_record_round_trip() {
        let (_tmp, dirs) = dirs();
        record("demo").create(&dirs).unwrap();

        let loaded = BuildRecord::load(&dirs, "demo").unwrap();
        assert_eq!(loaded.vendor, "acme");
        assert_eq!(loaded.release, "v1");
        assert!(loaded.with_tests);
        assert!(!loaded.with_debug);
    }

    #[test]
    fn test_build_record_create_refuses_duplicate() {
        let (_tmp, dirs) = dirs();
        record("demo").create(&dirs).unwrap();
        assert!(matches!(
            record("demo").create(&dirs),
            Err(ConfigError::BuildExists { .. })
        ));
    }

    #[test]
    fn test_unknown_build_load_and_remove() {
        let (_tmp, dirs) = dirs();
        assert!(matches!(
            BuildRecord::load(&dirs, "ghost"),
            Err(ConfigError::UnknownBuild { .. })
        ));
        assert!(matches!(
            BuildRecord::remove(&dirs, "ghost"),
            Err(ConfigError::UnknownBuild { .. })
        ));
    }

    #[test]
    fn test_list_builds_sorted() {
        let (_tmp, dirs) = dirs();
        record("zeta").create(&dirs).unwrap();
        record("alpha").create(&dirs).unwrap();
        assert_eq!(BuildRecord::list(&dirs).unwrap(), vec!["alpha", "zeta"]);
    }
}
