//! Working-container sessions
//!
//! A [`WorkingContainer`] wraps one ephemeral buildah working container.
//! The underlying tool requires mount before filesystem access and
//! forbids configuration after commit (committed images are immutable),
//! so every operation is guarded by a typed state: issuing a call the
//! tool would reject fails here first, as a state violation.
//!
//! A session commits at most once. Building a further image means opening
//! a new session from the committed result. Discarding an uncommitted
//! session leaves the working container behind; no cleanup is attempted.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ExecError;
use crate::infra::exec::{Capture, CmdOutput, CommandRunner};

/// Session lifecycle. `Created → Mounted → Unmounted → Committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Mounted,
    Unmounted,
    Committed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            SessionState::Created => "created",
            SessionState::Mounted => "mounted",
            SessionState::Unmounted => "unmounted",
            SessionState::Committed => "committed",
        };
        write!(f, "{state}")
    }
}

/// Working-container errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// buildah exited non-zero
    #[error("buildah {operation} failed ({status}): {stderr}")]
    Tool {
        operation: &'static str,
        status: i32,
        stderr: String,
    },

    /// buildah succeeded but did not report the expected value
    #[error("buildah {operation} returned no output")]
    EmptyOutput { operation: &'static str },

    /// Operation issued in a state the tool would reject
    #[error("'{operation}' is not legal on a {state} session")]
    StateViolation {
        operation: &'static str,
        state: SessionState,
    },

    /// The reported mount point is unusable
    #[error("mount point '{path}' is not a directory")]
    MountPath { path: PathBuf },

    /// Launch failure
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// An image produced by [`WorkingContainer::commit`].
#[derive(Debug, Clone)]
pub struct CommittedImage {
    pub id: String,
    pub name: String,
    pub tag: String,
}

impl CommittedImage {
    /// `name:tag` form, as embedded in tool commands.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

pub struct WorkingContainer<R> {
    runner: R,
    source: String,
    container: String,
    state: SessionState,
    mount_path: Option<PathBuf>,
    committed: Option<CommittedImage>,
}

impl<R: CommandRunner> WorkingContainer<R> {
    /// Create a working container from a resolvable image reference or
    /// hash. On failure the session never becomes usable.
    pub fn from_image(runner: R, source: &str) -> Result<Self, SessionError> {
        tracing::debug!("buildah: creating working container from {source}");
        let out = invoke(
            &runner,
            vec!["from".to_string(), source.to_string()],
            Capture::Piped,
        )?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "from",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        let container = out
            .first_line()
            .filter(|line| !line.is_empty())
            .ok_or(SessionError::EmptyOutput { operation: "from" })?
            .to_string();

        Ok(Self {
            runner,
            source: source.to_string(),
            container,
            state: SessionState::Created,
            mount_path: None,
            committed: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn container_id(&self) -> &str {
        &self.container
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub fn committed(&self) -> Option<&CommittedImage> {
        self.committed.as_ref()
    }

    pub fn mount_path(&self) -> Option<&Path> {
        self.mount_path.as_deref()
    }

    fn guard(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.is_committed() {
            return Err(SessionError::StateViolation {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Mount the container filesystem, returning the host-side path.
    pub fn mount(&mut self) -> Result<PathBuf, SessionError> {
        self.guard("mount")?;
        tracing::debug!("buildah: mounting {}", self.container);
        let out = self.run_tool("mount", &[&self.container])?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "mount",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        let path = PathBuf::from(
            out.first_line()
                .filter(|line| !line.is_empty())
                .ok_or(SessionError::EmptyOutput { operation: "mount" })?,
        );
        if !path.is_dir() {
            return Err(SessionError::MountPath { path });
        }
        self.mount_path = Some(path.clone());
        self.state = SessionState::Mounted;
        Ok(path)
    }

    /// Unmount the container filesystem. Idempotent when never mounted.
    pub fn unmount(&mut self) -> Result<(), SessionError> {
        self.guard("unmount")?;
        if self.mount_path.is_none() {
            return Ok(());
        }
        tracing::debug!("buildah: unmounting {}", self.container);
        let out = self.run_tool("unmount", &[&self.container])?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "unmount",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        self.mount_path = None;
        self.state = SessionState::Unmounted;
        Ok(())
    }

    /// Run a command inside the container, optionally with bind mounts.
    ///
    /// A non-zero exit is reported through the returned [`CmdOutput`];
    /// whether that is fatal is the caller's call.
    pub fn run(
        &self,
        cmd: &[&str],
        volumes: &[(PathBuf, String)],
        capture: Capture,
    ) -> Result<CmdOutput, SessionError> {
        self.guard("run")?;
        tracing::debug!("buildah: run in {}: {}", self.container, cmd.join(" "));
        let mut args: Vec<String> = vec!["run".to_string()];
        for (host, container) in volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host.display(), container));
        }
        args.push(self.container.clone());
        args.push("--".to_string());
        args.extend(cmd.iter().map(|part| (*part).to_string()));

        invoke(&self.runner, args, capture)
    }

    /// Apply a configuration change to the working container.
    pub fn configure(&self, options: &[&str]) -> Result<(), SessionError> {
        self.guard("config")?;
        tracing::debug!("buildah: config {} {:?}", self.container, options);
        let mut args: Vec<String> = vec!["config".to_string()];
        args.extend(options.iter().map(|part| (*part).to_string()));
        args.push(self.container.clone());
        let out = invoke(&self.runner, args, Capture::Piped)?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "config",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        Ok(())
    }

    pub fn set_label(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.configure(&["--label", &format!("{key}={value}")])
    }

    pub fn set_author(&self, name: &str, email: &str) -> Result<(), SessionError> {
        self.set_label("author", &format!("{name} <{email}>"))
    }

    pub fn set_workdir(&self, workdir: &str) -> Result<(), SessionError> {
        self.configure(&["--workingdir", workdir])
    }

    pub fn set_entrypoint(&self, entrypoint: &str) -> Result<(), SessionError> {
        self.configure(&["--entrypoint", entrypoint])
    }

    pub fn set_volumes(&self, volumes: &[&str]) -> Result<(), SessionError> {
        self.configure(&["--volume", &volumes.join(",")])
    }

    pub fn set_user(&self, user: &str) -> Result<(), SessionError> {
        self.configure(&["--user", user])
    }

    /// Commit the container as `name:tag`. One-shot: a session commits at
    /// most once, and must be unmounted first.
    pub fn commit(&mut self, name: &str, tag: &str) -> Result<CommittedImage, SessionError> {
        if self.is_committed() || self.state == SessionState::Mounted {
            return Err(SessionError::StateViolation {
                operation: "commit",
                state: self.state,
            });
        }
        let reference = format!("{name}:{tag}");
        tracing::debug!("buildah: committing {} as {reference}", self.container);
        let out = self.run_tool("commit", &[&self.container, &reference])?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "commit",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        let id = out
            .first_line()
            .filter(|line| !line.is_empty())
            .ok_or(SessionError::EmptyOutput { operation: "commit" })?
            .to_string();

        let committed = CommittedImage {
            id,
            name: name.to_string(),
            tag: tag.to_string(),
        };
        self.committed = Some(committed.clone());
        self.state = SessionState::Committed;
        Ok(committed)
    }

    /// Point an additional tag at the committed image. Committing is a
    /// prerequisite.
    pub fn tag(&self, tag: &str) -> Result<(), SessionError> {
        let Some(committed) = self.committed.as_ref() else {
            return Err(SessionError::StateViolation {
                operation: "tag",
                state: self.state,
            });
        };
        let reference = format!("{}:{tag}", committed.name);
        tracing::debug!("buildah: tagging {} as {reference}", committed.id);
        let out = self.run_tool("tag", &[&committed.id, &reference])?;
        if !out.success() {
            return Err(SessionError::Tool {
                operation: "tag",
                status: out.status,
                stderr: out.stderr_joined(),
            });
        }
        Ok(())
    }

    fn run_tool(&self, subcmd: &str, args: &[&str]) -> Result<CmdOutput, SessionError> {
        let mut full: Vec<String> = vec![subcmd.to_string()];
        full.extend(args.iter().map(|part| (*part).to_string()));
        invoke(&self.runner, full, Capture::Piped)
    }
}

/// Rootless mounts require re-execution inside the user namespace, hence
/// `buildah unshare buildah <subcmd>`.
fn invoke<R: CommandRunner>(
    runner: &R,
    args: Vec<String>,
    capture: Capture,
) -> Result<CmdOutput, SessionError> {
    let mut full: Vec<String> = vec!["unshare".to_string(), "buildah".to_string()];
    full.extend(args);
    Ok(runner.run("buildah", &full, capture)?)
}
