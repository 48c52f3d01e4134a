//! CLI implementation for `cab shell`
//!
//! Interactive shell in the latest image of a build; stdio is inherited.

use anyhow::{bail, Result};

use crate::core::build::ensure_image_tools;
use crate::core::config::BuildRecord;
use crate::core::images::Images;
use crate::infra::dirs::CabDirs;
use crate::infra::podman::{Podman, RunOptions};

/// Execute the shell command
pub fn execute(dirs: &CabDirs, name: &str) -> Result<()> {
    let _record = BuildRecord::load(dirs, name)?;
    ensure_image_tools()?;

    let images = Images::host();
    let Some(latest) = images.find_latest(name)? else {
        bail!("build '{name}' has no 'latest' image yet; run 'cab build {name}' first");
    };

    let podman = Podman::host();
    podman.run(
        latest.id(),
        &["/bin/bash"],
        &RunOptions {
            interactive: true,
            passthrough: true,
            ..RunOptions::default()
        },
    )?;
    Ok(())
}
