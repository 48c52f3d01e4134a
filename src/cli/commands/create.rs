//! CLI implementation for `cab create`
//!
//! Registers a build record after verifying a base image exists for the
//! vendor/release pair, optionally cloning the source tree first.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::cli::output::{print_detail, print_success};
use crate::core::build::ensure_image_tools;
use crate::core::config::BuildRecord;
use crate::core::images::Images;
use crate::infra::dirs::CabDirs;
use crate::infra::exec::HostRunner;
use crate::infra::git;

/// Arguments of `cab create`
pub struct CreateOptions {
    pub name: String,
    pub vendor: String,
    pub release: String,
    pub sourcedir: PathBuf,
    pub with_debug: bool,
    pub with_tests: bool,
    pub clone_from_repo: Option<String>,
    pub clone_from_branch: Option<String>,
}

/// Execute the create command
pub fn execute(dirs: &CabDirs, options: CreateOptions) -> Result<()> {
    if BuildRecord::exists(dirs, &options.name) {
        bail!("build '{}' already exists", options.name);
    }

    ensure_image_tools()?;

    // Refuse to register a build nothing could ever be built from.
    let images = Images::host();
    if images
        .find_release_base(&options.vendor, &options.release)?
        .is_none()
    {
        bail!(
            "no base image for vendor '{}' release '{}'; run 'cab image ensure' first",
            options.vendor,
            options.release
        );
    }

    if let Some(repository) = options.clone_from_repo.as_deref() {
        git::clone_repository(
            HostRunner,
            repository,
            options.clone_from_branch.as_deref(),
            &options.sourcedir,
        )?;
    }

    if !options.sourcedir.is_dir() {
        bail!(
            "source directory {} does not exist",
            options.sourcedir.display()
        );
    }
    let sources = options
        .sourcedir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", options.sourcedir.display()))?;

    let record = BuildRecord {
        name: options.name.clone(),
        vendor: options.vendor,
        release: options.release,
        sources,
        with_debug: options.with_debug,
        with_tests: options.with_tests,
    };
    record.create(dirs)?;

    print_success(&format!("created build '{}'", options.name));
    print_detail(&format!("vendor:  {}", record.vendor));
    print_detail(&format!("release: {}", record.release));
    print_detail(&format!("sources: {}", record.sources.display()));
    Ok(())
}
