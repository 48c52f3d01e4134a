//! CLI implementation for `cab init`
//!
//! Writes the global configuration after creating the directories it
//! points at and probing the registry, so later builds fail for real
//! reasons only.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::cli::output::{print_detail, print_success, print_warning};
use crate::core::config::{CabConfig, CcacheConfig, RegistryConfig};
use crate::infra::dirs::CabDirs;
use crate::infra::registry;

/// Arguments of `cab init`
pub struct InitOptions {
    pub installs_dir: PathBuf,
    pub ccache_dir: Option<PathBuf>,
    pub ccache_size: Option<String>,
    pub registry_url: Option<String>,
    pub insecure_registry: bool,
    pub force: bool,
}

/// Execute the init command
pub fn execute(dirs: &CabDirs, options: InitOptions) -> Result<()> {
    if CabConfig::exists(dirs) && !options.force {
        bail!("configuration already exists; use --force to overwrite");
    }

    if let Some(size) = options.ccache_size.as_deref() {
        validate_ccache_size(size)?;
    }

    fs::create_dir_all(&options.installs_dir).with_context(|| {
        format!(
            "failed to create installs directory {}",
            options.installs_dir.display()
        )
    })?;
    if let Some(ccache_dir) = options.ccache_dir.as_ref() {
        fs::create_dir_all(ccache_dir).with_context(|| {
            format!("failed to create ccache directory {}", ccache_dir.display())
        })?;
    }

    let registry = match options.registry_url {
        Some(url) => {
            if !registry::registry_alive(&url) {
                if options.force {
                    print_warning(&format!("registry at {url} is not answering; storing anyway"));
                } else {
                    bail!("registry at {url} is not answering; use --force to store it anyway");
                }
            }
            Some(RegistryConfig {
                url,
                secure: !options.insecure_registry,
            })
        }
        None => None,
    };

    let config = CabConfig {
        installs_dir: Some(options.installs_dir.clone()),
        ccache: CcacheConfig {
            dir: options.ccache_dir.clone(),
            size: options.ccache_size,
        },
        registry,
        ..CabConfig::default()
    };
    config.save(dirs)?;

    print_success("configuration saved");
    print_detail(&format!("config: {}", dirs.global_config_path().display()));
    print_detail(&format!("installs: {}", options.installs_dir.display()));
    if let Some(ccache_dir) = options.ccache_dir {
        print_detail(&format!(
            "ccache: {} (max {})",
            ccache_dir.display(),
            config.ccache_size()
        ));
    }
    if let Some(registry) = config.registry.as_ref() {
        print_detail(&format!(
            "registry: {}{}",
            registry.url,
            if registry.secure { "" } else { " (insecure)" }
        ));
    }
    Ok(())
}

/// Sizes are passed straight to ccache; catch obvious nonsense here.
fn validate_ccache_size(size: &str) -> Result<()> {
    let valid = size.is_ascii()
        && size.len() >= 2
        && size[..size.len() - 1].parse::<u64>().is_ok_and(|n| n > 0)
        && matches!(size.as_bytes()[size.len() - 1], b'G' | b'T' | b'M');
    if !valid {
        bail!("invalid ccache size '{size}'; expected a value like 10G");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ccache_size() {
        assert!(validate_ccache_size("10G").is_ok());
        assert!(validate_ccache_size("1T").is_ok());
        assert!(validate_ccache_size("500M").is_ok());
        assert!(validate_ccache_size("0G").is_err());
        assert!(validate_ccache_size("10").is_err());
        assert!(validate_ccache_size("G").is_err());
        assert!(validate_ccache_size("ten gigs").is_err());
    }
}
