//! Podman wrapper
//!
//! Thin client over the `podman` binary: image listings (JSON), removal,
//! container runs, and registry pushes. Listing records are converted
//! into [`ContainerImage`] values here; names that do not parse under the
//! four-segment grammar are dropped silently because the registry
//! namespace legitimately contains unrelated images.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::image::{parse_created_at, ContainerImage};
use crate::core::image_name::ImageName;
use crate::error::PodmanError;
use crate::infra::exec::{Capture, CmdOutput, CommandRunner, HostRunner};

/// One record of `podman images --format json`.
#[derive(Debug, Deserialize)]
struct ImageRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Option<Vec<String>>,
    #[serde(rename = "Size")]
    size: u64,
    #[serde(rename = "CreatedAt")]
    created_at: String,
}

/// Options for `podman run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Host path → container path bind mounts.
    pub volumes: Vec<(PathBuf, String)>,
    /// Environment variables exported into the container.
    pub env: Vec<(String, String)>,
    /// Allocate a TTY and keep stdin open.
    pub interactive: bool,
    /// Inherit our stdio instead of capturing.
    pub passthrough: bool,
}

pub struct Podman<R = HostRunner> {
    runner: R,
}

impl Podman<HostRunner> {
    pub fn host() -> Self {
        Self { runner: HostRunner }
    }
}

impl<R: CommandRunner> Podman<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn invoke(
        &self,
        operation: &'static str,
        args: Vec<String>,
        capture: Capture,
    ) -> Result<CmdOutput, PodmanError> {
        tracing::debug!("podman {}: {}", operation, args.join(" "));
        Ok(self.runner.run("podman", &args, capture)?)
    }

    /// List images, optionally filtered by a name prefix, merging records
    /// that share a hash id into one image with the union of references.
    pub fn images(&self, filter: Option<&str>) -> Result<Vec<ContainerImage>, PodmanError> {
        let mut args = vec![
            "images".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        if let Some(filter) = filter {
            args.push(filter.to_string());
        }

        let out = self.invoke("images", args, Capture::Piped)?;
        if !out.success() {
            return Err(PodmanError::Command {
                operation: "images",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }

        let records: Vec<ImageRecord> =
            serde_json::from_str(&out.stdout_joined()).map_err(|e| PodmanError::Listing {
                error: e.to_string(),
            })?;

        let mut images: Vec<ContainerImage> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for record in records {
            let names: Vec<ImageName> = record
                .names
                .unwrap_or_default()
                .iter()
                .filter_map(|raw| ImageName::parse(raw))
                .collect();

            // A hash reachable through several matching tags may come
            // back as several records; they are one image.
            if let Some(&index) = by_id.get(&record.id) {
                images[index].merge_names(names);
                continue;
            }

            let created = parse_created_at(&record.created_at).ok_or_else(|| {
                PodmanError::Listing {
                    error: format!("bad CreatedAt '{}'", record.created_at),
                }
            })?;
            by_id.insert(record.id.clone(), images.len());
            images.push(ContainerImage::new(record.id, names, record.size, created));
        }
        Ok(images)
    }

    /// Remove one reference. Non-zero exit is an error; multi-reference
    /// removal policy lives with the caller.
    pub fn remove_image(&self, reference: &str) -> Result<(), PodmanError> {
        let out = self.invoke(
            "rmi",
            vec!["rmi".to_string(), reference.to_string()],
            Capture::Piped,
        )?;
        if !out.success() {
            return Err(PodmanError::Command {
                operation: "rmi",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        Ok(())
    }

    /// Run a command in a fresh container from `image`.
    pub fn run(
        &self,
        image: &str,
        cmd: &[&str],
        options: &RunOptions,
    ) -> Result<CmdOutput, PodmanError> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if options.interactive {
            args.push("-it".to_string());
        }
        for (host, container) in &options.volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host.display(), container));
        }
        for (key, value) in &options.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(image.to_string());
        args.extend(cmd.iter().map(|part| (*part).to_string()));

        let capture = if options.passthrough {
            Capture::Inherit
        } else {
            Capture::Piped
        };
        self.invoke("run", args, capture)
    }

    /// Push a local image to a remote destination.
    pub fn push(
        &self,
        source: &str,
        destination: &str,
        tls_verify: bool,
    ) -> Result<(), PodmanError> {
        let mut args = vec!["push".to_string()];
        if !tls_verify {
            args.push("--tls-verify=false".to_string());
        }
        args.push(source.to_string());
        args.push(destination.to_string());

        let out = self.invoke("push", args, Capture::Inherit)?;
        if !out.success() {
            return Err(PodmanError::Command {
                operation: "push",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        Ok(())
    }
}
