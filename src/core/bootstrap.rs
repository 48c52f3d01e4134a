//! Bootstrap image construction
//!
//! Builds the three images every build chain rests on:
//!
//! - the **seed** image, shared by every vendor, carrying the bare
//!   tooling (git, sudo, wget, ccache);
//! - a **base** image per vendor/release, with every runtime package a
//!   finished build might need;
//! - a **builder** image per vendor/release, the compile environment
//!   with its volumes and entrypoint configured.
//!
//! `ensure` creates whichever of the three is missing and leaves the
//! rest untouched.

use std::path::Path;

use crate::config::naming;
use crate::core::config::AuthorConfig;
use crate::core::images::Images;
use crate::error::BootstrapError;
use crate::infra::buildah::WorkingContainer;
use crate::infra::exec::{Capture, CommandRunner};

const REQUIREMENTS_SCRIPT: &str = "install-requirements.sh";

pub struct Bootstrap<R> {
    runner: R,
    author: Option<AuthorConfig>,
}

impl<R: CommandRunner + Clone> Bootstrap<R> {
    pub fn new(runner: R, author: Option<AuthorConfig>) -> Self {
        Self { runner, author }
    }

    /// Build whatever is missing for a vendor/release pair.
    pub fn ensure(
        &self,
        vendor: &str,
        release: &str,
        sources: &Path,
        bin: &Path,
    ) -> Result<(), BootstrapError> {
        let images = Images::new(self.runner.clone());

        if images.find_seed()?.is_some() {
            tracing::info!("seed image exists");
        } else {
            self.build_seed()?;
        }

        if images.find_release_base(vendor, release)?.is_some() {
            tracing::info!("base image exists for {vendor}/{release}");
        } else {
            self.build_base(vendor, release, sources, bin)?;
        }

        if images.find_builder(vendor, release)?.is_some() {
            tracing::info!("builder image exists for {vendor}/{release}");
        } else {
            self.build_builder(vendor, release)?;
        }
        Ok(())
    }

    /// Build the shared seed image from the upstream OS image.
    pub fn build_seed(&self) -> Result<String, BootstrapError> {
        tracing::info!("building seed image");
        let mut container = WorkingContainer::from_image(self.runner.clone(), naming::SEED_SOURCE)?;
        self.stamp_author(&container)?;

        run_step(
            &container,
            "refresh",
            &["zypper", "--gpg-auto-import-keys", "refresh"],
            &[],
        )?;
        run_step(
            &container,
            "install-tools",
            &["zypper", "-n", "install", "git", "sudo", "wget", "ccache"],
            &[],
        )?;

        let name = format!("{}/{}", naming::SEED_REPOSITORY, naming::SEED_NAME);
        let committed = container.commit(&name, naming::SEED_TAG)?;
        tracing::info!("seed image committed as {}", committed.reference());
        Ok(committed.id)
    }

    /// Build the base image for a vendor/release: run the source tree's
    /// dependency installer plus the requirements script inside the
    /// container, then strip the scratch space.
    pub fn build_base(
        &self,
        vendor: &str,
        release: &str,
        sources: &Path,
        bin: &Path,
    ) -> Result<String, BootstrapError> {
        if !bin.join(REQUIREMENTS_SCRIPT).is_file() {
            return Err(BootstrapError::MissingInput {
                path: bin.join(REQUIREMENTS_SCRIPT),
            });
        }

        tracing::info!("building base image for {vendor}/{release}");
        let seed = format!(
            "{}/{}:{}",
            naming::SEED_REPOSITORY,
            naming::SEED_NAME,
            naming::SEED_TAG
        );
        let mut container = WorkingContainer::from_image(self.runner.clone(), &seed)?;
        self.stamp_author(&container)?;
        container.set_label("cab.vendor", vendor)?;
        container.set_label("cab.release", release)?;

        run_step(
            &container,
            "scratch-dirs",
            &["mkdir", "-p", "/build/sources", "/build/bin"],
            &[],
        )?;
        container.set_workdir("/build/sources")?;
        run_step(
            &container,
            "install-deps",
            &["/bin/bash", "./install-deps.sh"],
            &[(sources.to_path_buf(), "/build/sources".to_string())],
        )?;
        run_step(
            &container,
            "install-requirements",
            &["/bin/bash", "/build/bin/install-requirements.sh"],
            &[
                (bin.to_path_buf(), "/build/bin".to_string()),
                (sources.to_path_buf(), "/build/sources".to_string()),
            ],
        )?;
        container.set_workdir("/")?;
        run_step(&container, "scratch-cleanup", &["rm", "-fr", "/build"], &[])?;

        let name = format!("{}/{vendor}", naming::BASE_REPOSITORY);
        let committed = container.commit(&name, release)?;
        tracing::info!("base image committed as {}", committed.reference());
        Ok(committed.id)
    }

    /// Build the builder image for a vendor/release on top of its base
    /// image: an unprivileged build user, the volume layout the compile
    /// step binds into, and the entrypoint that runs the build.
    pub fn build_builder(&self, vendor: &str, release: &str) -> Result<String, BootstrapError> {
        tracing::info!("building builder image for {vendor}/{release}");
        let base = format!("{}/{vendor}:{release}", naming::BASE_REPOSITORY);
        let mut container = WorkingContainer::from_image(self.runner.clone(), &base)?;
        self.stamp_author(&container)?;

        run_step(&container, "build-root", &["mkdir", "-p", "/build"], &[])?;
        run_step(
            &container,
            "build-user",
            &["useradd", "-d", "/build", "builder"],
            &[],
        )?;
        run_step(
            &container,
            "build-root-owner",
            &["chown", "builder:users", "/build"],
            &[],
        )?;
        container.set_user("builder:users")?;
        run_step(
            &container,
            "volume-dirs",
            &[
                "mkdir",
                "-p",
                "/build/src",
                "/build/ccache",
                "/build/bin",
                "/build/out",
            ],
            &[],
        )?;
        container.set_workdir("/build")?;
        container.set_volumes(&["/build/src", "/build/ccache", "/build/bin", "/build/out"])?;
        container.set_entrypoint("/build/bin/entrypoint.sh")?;

        let name = format!("{}/{vendor}", naming::BUILDER_REPOSITORY);
        let committed = container.commit(&name, release)?;
        tracing::info!("builder image committed as {}", committed.reference());
        Ok(committed.id)
    }

    fn stamp_author(&self, container: &WorkingContainer<R>) -> Result<(), BootstrapError> {
        if let Some(author) = self.author.as_ref() {
            container.set_author(&author.name, &author.email)?;
        }
        Ok(())
    }
}

fn run_step<R: CommandRunner>(
    container: &WorkingContainer<R>,
    step: &'static str,
    cmd: &[&str],
    volumes: &[(std::path::PathBuf, String)],
) -> Result<(), BootstrapError> {
    let out = container.run(cmd, volumes, Capture::Inherit)?;
    if !out.success() {
        return Err(BootstrapError::Step {
            step,
            status: out.status,
            stderr: out.stderr_joined(),
        });
    }
    Ok(())
}
