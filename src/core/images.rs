//! Image registry queries
//!
//! Convenience finders composed over the podman listing: base/builder
//! images for a vendor/release pair, per-build images, and tag lookups.
//! Absence is a normal branch everywhere here, not an error — first-time
//! builds legitimately have no prior image.

use thiserror::Error;

use crate::config::naming;
use crate::core::image::ContainerImage;
use crate::error::PodmanError;
use crate::infra::exec::{CommandRunner, HostRunner};
use crate::infra::podman::Podman;

/// Removal outcome when at least one reference could not be deleted.
#[derive(Error, Debug)]
#[error("failed to remove {} image reference(s): {}", failed.len(), failed.join(", "))]
pub struct RemovalError {
    pub failed: Vec<String>,
}

pub struct Images<R = HostRunner> {
    podman: Podman<R>,
}

impl Images<HostRunner> {
    pub fn host() -> Self {
        Self {
            podman: Podman::host(),
        }
    }
}

impl<R: CommandRunner> Images<R> {
    pub fn new(runner: R) -> Self {
        Self {
            podman: Podman::new(runner),
        }
    }

    /// The base OS image for a vendor/release pair, if present.
    pub fn find_release_base(
        &self,
        vendor: &str,
        release: &str,
    ) -> Result<Option<ContainerImage>, PodmanError> {
        self.find_in_repository(naming::BASE_REPOSITORY, vendor, release)
    }

    /// The builder (compile environment) image for a vendor/release pair.
    pub fn find_builder(
        &self,
        vendor: &str,
        release: &str,
    ) -> Result<Option<ContainerImage>, PodmanError> {
        self.find_in_repository(naming::BUILDER_REPOSITORY, vendor, release)
    }

    /// The shared seed image every vendor image derives from.
    pub fn find_seed(&self) -> Result<Option<ContainerImage>, PodmanError> {
        self.find_in_repository(naming::SEED_REPOSITORY, naming::SEED_NAME, naming::SEED_TAG)
    }

    fn find_in_repository(
        &self,
        repository: &str,
        name: &str,
        tag: &str,
    ) -> Result<Option<ContainerImage>, PodmanError> {
        let filter = format!("{repository}/{name}:{tag}");
        let images = self.podman.images(Some(filter.as_str()))?;
        // The repository disambiguates: base and builder images collide
        // on the vendor/release pair alone.
        Ok(images.into_iter().find(|image| {
            image
                .names()
                .iter()
                .any(|n| n.matches_in(repository, name, tag))
        }))
    }

    /// All images belonging to one build name.
    pub fn find_build_images(&self, build: &str) -> Result<Vec<ContainerImage>, PodmanError> {
        let filter = naming::build_repository(build);
        let images = self.podman.images(Some(filter.as_str()))?;
        Ok(images
            .into_iter()
            .filter(|image| image.named(build))
            .collect())
    }

    /// The build image carrying `tag`, if any.
    pub fn find_build_image(
        &self,
        build: &str,
        tag: &str,
    ) -> Result<Option<ContainerImage>, PodmanError> {
        Ok(self
            .find_build_images(build)?
            .into_iter()
            .find(|image| image.has_tag(tag)))
    }

    /// The most recent finished image of a build.
    pub fn find_latest(&self, build: &str) -> Result<Option<ContainerImage>, PodmanError> {
        self.find_build_image(build, naming::LATEST_TAG)
    }

    /// The most recent raw (pre-finalize) image of a build.
    pub fn find_latest_raw(&self, build: &str) -> Result<Option<ContainerImage>, PodmanError> {
        self.find_build_image(build, naming::LATEST_RAW_TAG)
    }

    pub fn has_build_image(&self, build: &str, tag: &str) -> Result<bool, PodmanError> {
        Ok(self.find_build_image(build, tag)?.is_some())
    }

    /// Remove every reference of an image, best-effort.
    ///
    /// A failing reference does not stop the remaining ones from being
    /// attempted; the overall result still reports the failures, so a
    /// multi-tagged image is never silently left half-removed.
    pub fn remove(&self, image: &ContainerImage) -> Result<(), RemovalError> {
        tracing::info!("removing image {}", image.short_id());
        let mut failed = Vec::new();

        if image.names().is_empty() {
            // Dangling image: only addressable by hash.
            if let Err(e) = self.podman.remove_image(image.id()) {
                tracing::warn!("failed to remove {}: {e}", image.short_id());
                failed.push(image.short_id().to_string());
            }
        }
        for name in image.names() {
            let reference = name.to_string();
            tracing::debug!("removing reference {reference}");
            if let Err(e) = self.podman.remove_image(&reference) {
                tracing::warn!("failed to remove {reference}: {e}");
                failed.push(reference);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(RemovalError { failed })
        }
    }
}
