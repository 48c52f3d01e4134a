//! Incremental build pipeline
//!
//! Two working-container sessions per build, in sequence:
//!
//! 1. **Raw stage** — open a container on the newest raw image of this
//!    build (or, on a first build, the vendor/release base image),
//!    transfer the freshly installed artifact tree into its mount, and
//!    commit as `cab-builds/<name>:<ts>-raw`, re-pointing `latest-raw`.
//! 2. **Final stage** — open a second container on that raw image, run
//!    and then drop the post-install script if one was shipped, and
//!    commit as `cab-builds/<name>:<ts>`, re-pointing `latest`.
//!
//! Both commits of one invocation share a single UTC timestamp, so they
//! stay correlated while remaining independently addressable by hash.
//!
//! There is no rollback: a failure after the raw commit leaves that
//! image in place, tagged `latest-raw`, and the next invocation picks it
//! up as its starting point instead of redoing the whole transfer. The
//! floating tags are registry-wide names with no lock around them; run
//! at most one pipeline per build name at a time.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::{defaults, naming};
use crate::core::config::BuildRecord;
use crate::core::images::Images;
use crate::error::PipelineError;
use crate::infra::buildah::{CommittedImage, WorkingContainer};
use crate::infra::exec::{Capture, CommandRunner};
use crate::infra::transfer;

/// The two images produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub timestamp: String,
    pub raw: CommittedImage,
    pub image: CommittedImage,
}

pub struct BuildPipeline<R> {
    runner: R,
    name: String,
    vendor: String,
    release: String,
    install_dir: PathBuf,
    excludes: Vec<PathBuf>,
}

impl<R: CommandRunner + Clone> BuildPipeline<R> {
    pub fn new(
        runner: R,
        record: &BuildRecord,
        install_dir: PathBuf,
        excludes: Vec<PathBuf>,
    ) -> Self {
        Self {
            runner,
            name: record.name.clone(),
            vendor: record.vendor.clone(),
            release: record.release.clone(),
            install_dir,
            excludes,
        }
    }

    /// Run both stages with a fresh timestamp.
    pub fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        let timestamp = Utc::now().format(naming::TIMESTAMP_FORMAT).to_string();
        self.run_at(&timestamp)
    }

    /// Run both stages committing under `timestamp`.
    pub fn run_at(&self, timestamp: &str) -> Result<PipelineOutcome, PipelineError> {
        let raw = self.raw_stage(timestamp)?;
        let image = self.finalize_stage(&raw, timestamp)?;
        tracing::info!(
            "build '{}' committed as {} ({})",
            self.name,
            image.reference(),
            image.id
        );
        Ok(PipelineOutcome {
            timestamp: timestamp.to_string(),
            raw,
            image,
        })
    }

    /// Image the raw stage starts from, consulted fresh on every run:
    /// the floating `latest-raw` tag when present, the release base
    /// image on a first build.
    fn resolve_raw_source(&self) -> Result<String, PipelineError> {
        let images = Images::new(self.runner.clone());

        if let Some(prior) = images.find_latest_raw(&self.name)? {
            tracing::info!(
                "incremental build from raw image {}",
                prior.short_id()
            );
            return Ok(prior.id().to_string());
        }

        if let Some(base) = images.find_release_base(&self.vendor, &self.release)? {
            tracing::info!(
                "first build from base image {} ({}/{})",
                base.short_id(),
                self.vendor,
                self.release
            );
            return Ok(base.id().to_string());
        }

        Err(PipelineError::NoAvailableImage {
            vendor: self.vendor.clone(),
            release: self.release.clone(),
        })
    }

    fn raw_stage(&self, timestamp: &str) -> Result<CommittedImage, PipelineError> {
        let source = self.resolve_raw_source()?;

        let mut container = WorkingContainer::from_image(self.runner.clone(), &source)?;
        let mount = container.mount()?;

        let stats = transfer::sync_tree(&self.install_dir, &mount, &self.excludes)?;
        tracing::info!(
            "transferred {} files ({} up to date)",
            stats.files_copied,
            stats.files_skipped
        );

        container.unmount()?;
        let repository = naming::build_repository(&self.name);
        let committed = container.commit(&repository, &naming::raw_tag(timestamp))?;
        container.tag(naming::LATEST_RAW_TAG)?;
        tracing::info!("raw image committed as {}", committed.reference());
        Ok(committed)
    }

    fn finalize_stage(
        &self,
        raw: &CommittedImage,
        timestamp: &str,
    ) -> Result<CommittedImage, PipelineError> {
        let mut container = WorkingContainer::from_image(self.runner.clone(), &raw.id)?;
        let mount = container.mount()?;

        let script = mount.join(defaults::POST_INSTALL_SCRIPT);
        if script.exists() {
            tracing::info!("running {}", defaults::POST_INSTALL_SCRIPT);
            let in_container = format!("/{}", defaults::POST_INSTALL_SCRIPT);
            let out = container.run(&["/bin/bash", in_container.as_str()], &[], Capture::Piped)?;
            if !out.success() {
                return Err(PipelineError::PostInstall {
                    status: out.status,
                    stderr: out.stderr_joined(),
                });
            }
            // Only ever needed once per image; it must not ship.
            fs::remove_file(&script).map_err(|e| PipelineError::Cleanup {
                path: script.clone(),
                error: e.to_string(),
            })?;
        }

        container.unmount()?;
        let repository = naming::build_repository(&self.name);
        let committed = container.commit(&repository, timestamp)?;
        container.tag(naming::LATEST_TAG)?;
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeImageTool;
    use tempfile::TempDir;

    const TS1: &str = "20260807T120000Z";
    const TS2: &str = "20260807T130000Z";

    fn record() -> BuildRecord {
        BuildRecord {
            name: "demo".to_string(),
            vendor: "acme".to_string(),
            release: "v1".to_string(),
            sources: PathBuf::from("/src/demo"),
            with_debug: false,
            with_tests: false,
        }
    }

    fn install_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("usr/bin")).unwrap();
        fs::write(tmp.path().join("usr/bin/demo"), "elf").unwrap();
        tmp
    }

    fn pipeline<'a>(tool: &'a FakeImageTool, install: &TempDir) -> BuildPipeline<&'a FakeImageTool> {
        BuildPipeline::new(tool, &record(), install.path().to_path_buf(), Vec::new())
    }

    #[test]
    fn test_first_build_uses_base_image_and_tags_both_stages() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        let install = install_tree();

        let outcome = pipeline(&tool, &install).run_at(TS1).unwrap();

        assert_eq!(outcome.timestamp, TS1);
        assert_eq!(outcome.raw.reference(), "cab-builds/demo:20260807T120000Z-raw");
        assert_eq!(outcome.image.reference(), "cab-builds/demo:20260807T120000Z");
        assert_ne!(outcome.raw.id, outcome.image.id);

        // First container was created from the base image's hash, the
        // second from the raw commit.
        let froms = tool.from_sources();
        assert_eq!(froms, vec!["abc123".to_string(), outcome.raw.id.clone()]);

        assert!(tool.has_reference("localhost/cab-builds/demo:latest-raw"));
        assert!(tool.has_reference("localhost/cab-builds/demo:latest"));
        assert_eq!(
            tool.reference_target("localhost/cab-builds/demo:latest-raw"),
            Some(outcome.raw.id.clone())
        );
        assert_eq!(
            tool.reference_target("localhost/cab-builds/demo:latest"),
            Some(outcome.image.id.clone())
        );
    }

    #[test]
    fn test_artifacts_are_transferred_into_the_mount() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        let install = install_tree();

        let outcome = pipeline(&tool, &install).run_at(TS1).unwrap();

        let image_fs = tool.image_fs(&outcome.raw.id).unwrap();
        assert_eq!(
            fs::read_to_string(image_fs.join("usr/bin/demo")).unwrap(),
            "elf"
        );
    }

    #[test]
    fn test_second_run_chains_off_latest_raw() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        let install = install_tree();

        let first = pipeline(&tool, &install).run_at(TS1).unwrap();
        let second = pipeline(&tool, &install).run_at(TS2).unwrap();

        // The raw stage of the second run starts from the first run's
        // raw image, not from the base image again.
        let froms = tool.from_sources();
        assert_eq!(froms[2], first.raw.id);
        assert_ne!(froms[2], "abc123");

        // Both floating tags now point at the second run's images.
        assert_eq!(
            tool.reference_target("localhost/cab-builds/demo:latest-raw"),
            Some(second.raw.id.clone())
        );
        assert_eq!(
            tool.reference_target("localhost/cab-builds/demo:latest"),
            Some(second.image.id.clone())
        );
    }

    #[test]
    fn test_no_base_image_is_fatal() {
        let tool = FakeImageTool::new();
        let install = install_tree();

        let err = pipeline(&tool, &install).run_at(TS1).unwrap_err();
        assert!(matches!(err, PipelineError::NoAvailableImage { .. }));
        // Nothing was committed.
        assert!(tool.from_sources().is_empty());
    }

    #[test]
    fn test_post_install_runs_once_and_never_ships() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        let install = install_tree();
        fs::write(install.path().join("post-install.sh"), "#!/bin/sh\n").unwrap();

        let outcome = pipeline(&tool, &install).run_at(TS1).unwrap();

        assert!(tool
            .commands()
            .iter()
            .any(|cmd| cmd.contains("/bin/bash /post-install.sh")));
        // Deleted from the mounted tree before the final commit.
        let image_fs = tool.image_fs(&outcome.image.id).unwrap();
        assert!(!image_fs.join("post-install.sh").exists());
    }

    #[test]
    fn test_absent_post_install_is_not_an_error() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        let install = install_tree();

        pipeline(&tool, &install).run_at(TS1).unwrap();
        assert!(!tool.commands().iter().any(|cmd| cmd.contains("post-install")));
    }

    #[test]
    fn test_failed_post_install_leaves_raw_image_as_recovery_point() {
        let tool = FakeImageTool::new();
        tool.add_image("abc123", &["localhost/cab/base/acme:v1"]);
        tool.fail_run_containing("post-install.sh");
        let install = install_tree();
        fs::write(install.path().join("post-install.sh"), "#!/bin/sh\n").unwrap();

        let err = pipeline(&tool, &install).run_at(TS1).unwrap_err();
        assert!(matches!(err, PipelineError::PostInstall { .. }));

        // The raw image stays committed and promoted to latest-raw, so
        // the next attempt can reuse it; no final image exists.
        assert!(tool.has_reference("localhost/cab-builds/demo:latest-raw"));
        assert!(!tool.has_reference("localhost/cab-builds/demo:latest"));
    }
}
