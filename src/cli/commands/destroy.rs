//! CLI implementation for `cab destroy`
//!
//! Removes a build's record, and optionally its install tree and images.
//! Image removal is best-effort: every reference is attempted even when
//! one fails, and the failures are reported at the end.

use std::fs;

use anyhow::{bail, Context, Result};

use crate::cli::output::{create_spinner, print_success, print_warning};
use crate::core::build::ensure_image_tools;
use crate::core::config::{BuildRecord, CabConfig};
use crate::core::images::Images;
use crate::infra::dirs::CabDirs;

/// Execute the destroy command
pub fn execute(
    dirs: &CabDirs,
    name: &str,
    remove_install: bool,
    remove_images: bool,
    yes: bool,
) -> Result<()> {
    // Fails loudly for unknown builds.
    let _record = BuildRecord::load(dirs, name)?;

    if !yes {
        bail!("destroying '{name}' is irreversible; pass --yes to confirm");
    }

    let mut failures = 0usize;

    if remove_images {
        ensure_image_tools()?;
        let images = Images::host();
        let spinner = create_spinner(&format!("removing images of '{name}'"));
        for image in images.find_build_images(name)? {
            spinner.set_message(format!("removing image {}", image.short_id()));
            if let Err(e) = images.remove(&image) {
                print_warning(&e.to_string());
                failures += 1;
            }
        }
        spinner.finish_and_clear();
    }

    if remove_install {
        let config = CabConfig::load(dirs)?;
        let install_dir = config.install_dir_for(name)?;
        if install_dir.exists() {
            fs::remove_dir_all(&install_dir)
                .with_context(|| format!("failed to remove {}", install_dir.display()))?;
        }
    }

    BuildRecord::remove(dirs, name)?;

    if failures > 0 {
        bail!("destroyed build '{name}', but {failures} image(s) could not be fully removed");
    }
    print_success(&format!("destroyed build '{name}'"));
    Ok(())
}
