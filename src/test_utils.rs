//! Test utilities
//!
//! [`FakeImageTool`] is a stateful, in-process stand-in for buildah and
//! podman behind the [`CommandRunner`] seam. It keeps a registry of
//! images and working containers, hands out real temporary directories
//! as mount points, and records every invocation so tests can assert on
//! call sequences.
//!
//! Filesystem semantics are simplified but honest enough for the
//! pipeline: a container created `from` an image shares that image's
//! backing directory, and `commit` snapshots the container's directory
//! as the new image's filesystem.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::error::ExecError;
use crate::infra::exec::{Capture, CmdOutput, CommandRunner};

const CREATED_AT: &str = "2026-08-07T10:00:00Z";

#[derive(Debug, Clone)]
struct FakeImage {
    id: String,
    names: Vec<String>,
    fs_dir: PathBuf,
}

#[derive(Debug, Clone)]
struct FakeContainer {
    fs_dir: PathBuf,
}

#[derive(Default)]
struct ToolState {
    images: Vec<FakeImage>,
    containers: HashMap<String, FakeContainer>,
    counter: u32,
    log: Vec<String>,
    from_sources: Vec<String>,
    fail_run_patterns: Vec<String>,
    refused_rmi: Vec<String>,
}

pub struct FakeImageTool {
    state: RefCell<ToolState>,
    root: TempDir,
}

impl FakeImageTool {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(ToolState::default()),
            root: TempDir::new().expect("fake tool root"),
        }
    }

    /// Register a pre-existing image, e.g. a vendor base image.
    pub fn add_image(&self, id: &str, names: &[&str]) {
        let fs_dir = self.new_dir(&format!("img-{id}"));
        self.state.borrow_mut().images.push(FakeImage {
            id: id.to_string(),
            names: names.iter().map(|n| (*n).to_string()).collect(),
            fs_dir,
        });
    }

    /// Make every `rmi` of this reference fail.
    pub fn refuse_rmi(&self, reference: &str) {
        self.state
            .borrow_mut()
            .refused_rmi
            .push(reference.to_string());
    }

    /// Make any `run` whose arguments contain `pattern` exit non-zero.
    pub fn fail_run_containing(&self, pattern: &str) {
        self.state
            .borrow_mut()
            .fail_run_patterns
            .push(pattern.to_string());
    }

    /// Every invocation so far, one `program arg arg ...` line each.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    /// Sources passed to `buildah from`, in order.
    pub fn from_sources(&self) -> Vec<String> {
        self.state.borrow().from_sources.clone()
    }

    /// Whether any image currently carries this full reference.
    pub fn has_reference(&self, reference: &str) -> bool {
        self.state
            .borrow()
            .images
            .iter()
            .any(|image| image.names.iter().any(|n| n == reference))
    }

    /// Hash id of the image a reference currently points at.
    pub fn reference_target(&self, reference: &str) -> Option<String> {
        self.state
            .borrow()
            .images
            .iter()
            .find(|image| image.names.iter().any(|n| n == reference))
            .map(|image| image.id.clone())
    }

    /// Backing directory of an image's filesystem.
    pub fn image_fs(&self, id: &str) -> Option<PathBuf> {
        self.state
            .borrow()
            .images
            .iter()
            .find(|image| image.id == id)
            .map(|image| image.fs_dir.clone())
    }

    fn new_dir(&self, name: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        fs::create_dir_all(&dir).expect("fake fs dir");
        dir
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.borrow_mut();
        state.counter += 1;
        format!("{prefix}{:06}", state.counter)
    }

    fn buildah(&self, args: &[String]) -> CmdOutput {
        // Everything arrives as `buildah unshare buildah <subcmd> ...`.
        let subcmd = args.get(2).map(String::as_str).unwrap_or_default();
        let rest = &args[3.min(args.len())..];
        match subcmd {
            "from" => {
                let source = rest[0].clone();
                self.state.borrow_mut().from_sources.push(source.clone());
                let fs_dir = self
                    .resolve_image(&source)
                    .map(|image| image.fs_dir)
                    .unwrap_or_else(|| {
                        // Unknown source: the real tool would pull it.
                        let id = self.next_id("pulled");
                        let fs_dir = self.new_dir(&format!("img-{id}"));
                        self.state.borrow_mut().images.push(FakeImage {
                            id,
                            names: vec![format!("localhost/{source}")],
                            fs_dir: fs_dir.clone(),
                        });
                        fs_dir
                    });
                let container = self.next_id("wc");
                self.state
                    .borrow_mut()
                    .containers
                    .insert(container.clone(), FakeContainer { fs_dir });
                ok_with(vec![container])
            }
            "mount" => {
                let container = self.state.borrow().containers.get(&rest[0]).cloned();
                match container {
                    Some(container) => ok_with(vec![container.fs_dir.display().to_string()]),
                    None => failed(125, "no such container"),
                }
            }
            "unmount" => ok(),
            "run" => {
                if self.run_should_fail(args) {
                    failed(1, "scripted failure")
                } else {
                    ok()
                }
            }
            "config" => ok(),
            "commit" => {
                let container = self.state.borrow().containers.get(&rest[0]).cloned();
                let Some(container) = container else {
                    return failed(125, "no such container");
                };
                let id = self.next_id("sha");
                self.assign_reference(&id, &format!("localhost/{}", rest[1]), Some(container.fs_dir));
                ok_with(vec![id])
            }
            "tag" => {
                if self.image_fs(&rest[0]).is_none() {
                    return failed(125, "unknown image id");
                }
                self.assign_reference(&rest[0], &format!("localhost/{}", rest[1]), None);
                ok()
            }
            _ => failed(125, "unknown buildah command"),
        }
    }

    fn podman(&self, args: &[String]) -> CmdOutput {
        let subcmd = args.first().map(String::as_str).unwrap_or_default();
        match subcmd {
            "images" => {
                let filter = args.get(3).cloned();
                let records: Vec<serde_json::Value> = self
                    .state
                    .borrow()
                    .images
                    .iter()
                    .filter(|image| match filter.as_deref() {
                        Some(filter) => image.names.iter().any(|n| n.contains(filter)),
                        None => true,
                    })
                    .map(|image| {
                        serde_json::json!({
                            "Id": image.id,
                            "Names": image.names,
                            "Size": 1024u64,
                            "CreatedAt": CREATED_AT,
                        })
                    })
                    .collect();
                ok_with(vec![serde_json::Value::Array(records).to_string()])
            }
            "rmi" => {
                let reference = args[1].clone();
                if self.state.borrow().refused_rmi.contains(&reference) {
                    return failed(2, "image is in use");
                }
                let mut state = self.state.borrow_mut();
                if let Some(index) = state.images.iter().position(|i| i.id == reference) {
                    state.images.remove(index);
                    return ok();
                }
                let hit = state.images.iter().enumerate().find_map(|(index, image)| {
                    image
                        .names
                        .iter()
                        .position(|n| *n == reference)
                        .map(|at| (index, at))
                });
                match hit {
                    Some((index, at)) => {
                        state.images[index].names.remove(at);
                        if state.images[index].names.is_empty() {
                            state.images.remove(index);
                        }
                        ok()
                    }
                    None => failed(1, "image not known"),
                }
            }
            "run" => {
                if self.run_should_fail(args) {
                    failed(1, "scripted failure")
                } else {
                    ok()
                }
            }
            "push" => ok(),
            _ => failed(125, "unknown podman command"),
        }
    }

    fn resolve_image(&self, source: &str) -> Option<FakeImage> {
        let qualified = format!("localhost/{source}");
        self.state
            .borrow()
            .images
            .iter()
            .find(|image| {
                image.id == source
                    || image.names.iter().any(|n| *n == source || *n == qualified)
            })
            .cloned()
    }

    /// Point `reference` at image `id`, unhooking it from wherever it
    /// pointed before; floating tags move this way.
    fn assign_reference(&self, id: &str, reference: &str, fs_dir: Option<PathBuf>) {
        let mut state = self.state.borrow_mut();
        for image in &mut state.images {
            image.names.retain(|n| n != reference);
        }
        if let Some(image) = state.images.iter_mut().find(|image| image.id == id) {
            image.names.push(reference.to_string());
        } else {
            state.images.push(FakeImage {
                id: id.to_string(),
                names: vec![reference.to_string()],
                fs_dir: fs_dir.expect("new image needs a filesystem"),
            });
        }
    }

    fn run_should_fail(&self, args: &[String]) -> bool {
        let joined = args.join(" ");
        self.state
            .borrow()
            .fail_run_patterns
            .iter()
            .any(|pattern| joined.contains(pattern))
    }
}

impl Default for FakeImageTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for FakeImageTool {
    fn run(
        &self,
        program: &str,
        args: &[String],
        _capture: Capture,
    ) -> Result<CmdOutput, ExecError> {
        self.state
            .borrow_mut()
            .log
            .push(format!("{program} {}", args.join(" ")));
        Ok(match program {
            "buildah" => self.buildah(args),
            "podman" => self.podman(args),
            "git" => ok(),
            _ => failed(127, "unknown program"),
        })
    }
}

fn ok() -> CmdOutput {
    CmdOutput::default()
}

fn ok_with(stdout: Vec<String>) -> CmdOutput {
    CmdOutput {
        status: 0,
        stdout,
        stderr: Vec::new(),
    }
}

fn failed(status: i32, stderr: &str) -> CmdOutput {
    CmdOutput {
        status,
        stdout: Vec::new(),
        stderr: vec![stderr.to_string()],
    }
}
