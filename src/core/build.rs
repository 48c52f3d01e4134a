//! Build orchestration
//!
//! One invocation sequences: compile (the builder container produces a
//! fresh install tree) → incremental image pipeline → push of the new
//! `latest` image to the configured registry. Compile and image phases
//! can be toggled off independently for debugging and partial runs.

use std::fs;
use std::path::Path;

use crate::config::{defaults, naming};
use crate::core::config::{BuildRecord, CabConfig, RegistryConfig};
use crate::core::images::Images;
use crate::core::pipeline::{BuildPipeline, PipelineOutcome};
use crate::error::OrchestrationError;
use crate::infra::exec::CommandRunner;
use crate::infra::podman::{Podman, RunOptions};

/// Per-invocation toggles
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Skip the compile phase; image the existing install tree as-is
    pub skip_compile: bool,

    /// Skip the image pipeline; compile only
    pub skip_image: bool,

    /// Push the resulting `latest` image when a registry is configured
    pub push: bool,

    /// Remove the source tree's build directory before compiling
    pub fresh_build: bool,

    /// Remove the install tree before compiling
    pub nuke_install: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            skip_compile: false,
            skip_image: false,
            push: true,
            fresh_build: false,
            nuke_install: false,
        }
    }
}

/// Fail early if the image tool is absent; that is a different problem
/// than a missing base image and gets a different message.
pub fn ensure_image_tools() -> Result<(), OrchestrationError> {
    for tool in ["buildah", "podman"] {
        which::which(tool).map_err(|_| OrchestrationError::MissingTool {
            tool: tool.to_string(),
        })?;
    }
    Ok(())
}

pub struct Orchestrator<R> {
    runner: R,
    config: CabConfig,
}

impl<R: CommandRunner + Clone> Orchestrator<R> {
    pub fn new(runner: R, config: CabConfig) -> Self {
        Self { runner, config }
    }

    /// Run one build invocation end to end.
    pub fn run(
        &self,
        record: &BuildRecord,
        options: &BuildOptions,
    ) -> Result<Option<PipelineOutcome>, OrchestrationError> {
        let install_dir = self.config.install_dir_for(&record.name)?;

        if options.fresh_build {
            remove_tree(&record.sources.join("build"))?;
        }
        if options.nuke_install {
            remove_tree(&install_dir)?;
        }

        if options.skip_compile {
            tracing::info!("compile phase skipped");
        } else {
            self.compile(record, &install_dir)?;
        }

        let outcome = if options.skip_image {
            tracing::info!("image phase skipped");
            None
        } else {
            let pipeline = BuildPipeline::new(
                self.runner.clone(),
                record,
                install_dir,
                self.config.transfer_excludes(),
            );
            Some(pipeline.run()?)
        };

        if options.push && outcome.is_some() {
            if let Some(registry) = self.config.registry.as_ref() {
                self.push(record, registry)?;
            }
        }

        Ok(outcome)
    }

    /// Compile by running the builder image with the sources, the install
    /// tree, and (when configured) the ccache directory bound in. The
    /// builder's entrypoint does the actual work.
    fn compile(&self, record: &BuildRecord, install_dir: &Path) -> Result<(), OrchestrationError> {
        let images = Images::new(self.runner.clone());
        let builder = images
            .find_builder(&record.vendor, &record.release)?
            .ok_or_else(|| OrchestrationError::MissingBuilderImage {
                vendor: record.vendor.clone(),
                release: record.release.clone(),
            })?;

        fs::create_dir_all(install_dir).map_err(|e| OrchestrationError::Prepare {
            path: install_dir.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut run = RunOptions {
            volumes: vec![
                (
                    record.sources.clone(),
                    defaults::BUILDER_SOURCES_MOUNT.to_string(),
                ),
                (
                    install_dir.to_path_buf(),
                    defaults::BUILDER_OUTPUT_MOUNT.to_string(),
                ),
            ],
            env: Vec::new(),
            interactive: false,
            passthrough: true,
        };

        if record.with_debug {
            run.env.push(("CAB_WITH_DEBUG".to_string(), "1".to_string()));
        }
        if record.with_tests {
            run.env.push(("CAB_WITH_TESTS".to_string(), "1".to_string()));
        }

        if let Some(ccache_dir) = self.config.ccache.dir.as_ref() {
            fs::create_dir_all(ccache_dir).map_err(|e| OrchestrationError::Prepare {
                path: ccache_dir.clone(),
                error: e.to_string(),
            })?;
            run.volumes.push((
                ccache_dir.clone(),
                defaults::BUILDER_CCACHE_MOUNT.to_string(),
            ));
            run.env.push((
                "CCACHE_DIR".to_string(),
                defaults::BUILDER_CCACHE_MOUNT.to_string(),
            ));
            run.env.push((
                "CCACHE_MAXSIZE".to_string(),
                self.config.ccache_size().to_string(),
            ));
        }

        tracing::info!(
            "compiling '{}' in builder image {}",
            record.name,
            builder.short_id()
        );
        let podman = Podman::new(self.runner.clone());
        let out = podman.run(builder.id(), &[], &run)?;
        if !out.success() {
            return Err(OrchestrationError::CompileFailed { status: out.status });
        }
        Ok(())
    }

    /// Push the build's `latest` image to the configured registry.
    fn push(
        &self,
        record: &BuildRecord,
        registry: &RegistryConfig,
    ) -> Result<(), OrchestrationError> {
        let images = Images::new(self.runner.clone());
        let latest =
            images
                .find_latest(&record.name)?
                .ok_or_else(|| OrchestrationError::NothingToPush {
                    name: record.name.clone(),
                })?;
        let source = latest
            .latest_name()
            .map(ToString::to_string)
            .unwrap_or_else(|| latest.id().to_string());
        let destination = format!(
            "{}/{}/{}:{}",
            registry.url,
            naming::BUILDS_REPOSITORY,
            record.name,
            naming::LATEST_TAG
        );

        tracing::info!("pushing {source} to {destination}");
        let podman = Podman::new(self.runner.clone());
        podman.push(&source, &destination, registry.secure)?;
        Ok(())
    }
}

fn remove_tree(path: &Path) -> Result<(), OrchestrationError> {
    if !path.exists() {
        return Ok(());
    }
    tracing::info!("removing {}", path.display());
    fs::remove_dir_all(path).map_err(|e| OrchestrationError::Prepare {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CcacheConfig;
    use crate::test_utils::FakeImageTool;
    use tempfile::TempDir;

    fn record(sources: &Path) -> BuildRecord {
        BuildRecord {
            name: "demo".to_string(),
            vendor: "acme".to_string(),
            release: "v1".to_string(),
            sources: sources.to_path_buf(),
            with_debug: true,
            with_tests: false,
        }
    }

    fn config(installs: &Path) -> CabConfig {
        CabConfig {
            installs_dir: Some(installs.to_path_buf()),
            ..CabConfig::default()
        }
    }

    fn seeded_tool() -> FakeImageTool {
        let tool = FakeImageTool::new();
        tool.add_image("base1", &["localhost/cab/base/acme:v1"]);
        tool.add_image("bld1", &["localhost/cab/builder/acme:v1"]);
        tool
    }

    #[test]
    fn test_compile_runs_builder_with_binds() {
        let tool = seeded_tool();
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();

        let orchestrator = Orchestrator::new(&tool, config(installs.path()));
        let options = BuildOptions {
            skip_image: true,
            ..BuildOptions::default()
        };
        orchestrator
            .run(&record(sources.path()), &options)
            .unwrap();

        let compile = tool
            .commands()
            .into_iter()
            .find(|cmd| cmd.contains("run --rm"))
            .expect("compile must run the builder image");
        assert!(compile.contains(":/build/src"));
        assert!(compile.contains(":/build/out"));
        assert!(compile.contains("CAB_WITH_DEBUG=1"));
        assert!(compile.contains("bld1"));
        // The install tree was created for the bind mount.
        assert!(installs.path().join("demo").is_dir());
    }

    #[test]
    fn test_compile_mounts_ccache_when_configured() {
        let tool = seeded_tool();
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();
        let ccache = TempDir::new().unwrap();

        let mut config = config(installs.path());
        config.ccache = CcacheConfig {
            dir: Some(ccache.path().join("cache")),
            size: Some("20G".to_string()),
        };

        let orchestrator = Orchestrator::new(&tool, config);
        let options = BuildOptions {
            skip_image: true,
            ..BuildOptions::default()
        };
        orchestrator
            .run(&record(sources.path()), &options)
            .unwrap();

        let compile = tool
            .commands()
            .into_iter()
            .find(|cmd| cmd.contains("run --rm"))
            .unwrap();
        assert!(compile.contains(":/build/ccache"));
        assert!(compile.contains("CCACHE_MAXSIZE=20G"));
        assert!(ccache.path().join("cache").is_dir());
    }

    #[test]
    fn test_missing_builder_image_is_distinct_error() {
        let tool = FakeImageTool::new();
        tool.add_image("base1", &["localhost/cab/base/acme:v1"]);
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();

        let orchestrator = Orchestrator::new(&tool, config(installs.path()));
        let err = orchestrator
            .run(&record(sources.path()), &BuildOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::MissingBuilderImage { .. }
        ));
    }

    #[test]
    fn test_compile_failure_aborts_before_imaging() {
        let tool = seeded_tool();
        tool.fail_run_containing("bld1");
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();

        let orchestrator = Orchestrator::new(&tool, config(installs.path()));
        let err = orchestrator
            .run(&record(sources.path()), &BuildOptions::default())
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::CompileFailed { .. }));
        // No working container was ever created.
        assert!(tool.from_sources().is_empty());
    }

    #[test]
    fn test_skip_compile_goes_straight_to_pipeline() {
        let tool = seeded_tool();
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();
        fs::create_dir_all(installs.path().join("demo")).unwrap();
        fs::write(installs.path().join("demo/artifact"), "elf").unwrap();

        let orchestrator = Orchestrator::new(&tool, config(installs.path()));
        let options = BuildOptions {
            skip_compile: true,
            push: false,
            ..BuildOptions::default()
        };
        let outcome = orchestrator
            .run(&record(sources.path()), &options)
            .unwrap()
            .unwrap();

        assert!(!tool.commands().iter().any(|cmd| cmd.contains("run --rm")));
        assert!(tool.has_reference("localhost/cab-builds/demo:latest"));
        assert_eq!(tool.from_sources()[0], "base1");
        assert!(!outcome.timestamp.is_empty());
    }

    #[test]
    fn test_nuke_install_clears_previous_tree() {
        let tool = seeded_tool();
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();
        let stale = installs.path().join("demo/stale");
        fs::create_dir_all(&stale).unwrap();

        let orchestrator = Orchestrator::new(&tool, config(installs.path()));
        let options = BuildOptions {
            skip_compile: true,
            skip_image: true,
            nuke_install: true,
            ..BuildOptions::default()
        };
        orchestrator
            .run(&record(sources.path()), &options)
            .unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_push_targets_configured_registry() {
        let tool = seeded_tool();
        let sources = TempDir::new().unwrap();
        let installs = TempDir::new().unwrap();
        fs::create_dir_all(installs.path().join("demo")).unwrap();

        let mut config = config(installs.path());
        config.registry = Some(RegistryConfig {
            url: "registry.local:5000".to_string(),
            secure: false,
        });

        let orchestrator = Orchestrator::new(&tool, config);
        let options = BuildOptions {
            skip_compile: true,
            ..BuildOptions::default()
        };
        orchestrator
            .run(&record(sources.path()), &options)
            .unwrap();

        let push = tool
            .commands()
            .into_iter()
            .find(|cmd| cmd.contains("push"))
            .expect("push must run");
        assert!(push.contains("--tls-verify=false"));
        assert!(push.contains("registry.local:5000/cab-builds/demo:latest"));
    }
}
