//! Error types for cab
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::buildah::SessionError;

/// Subprocess launch errors
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be started at all
    #[error("failed to launch '{program}': {error}")]
    Launch { program: String, error: String },
}

/// Errors from the podman side of the image tool
#[derive(Error, Debug)]
pub enum PodmanError {
    /// A podman invocation exited non-zero
    #[error("podman {operation} failed ({status}): {stderr}")]
    Command {
        operation: &'static str,
        status: i32,
        stderr: String,
    },

    /// The listing output violated the expected record shape
    #[error("unreadable image listing: {error}")]
    Listing { error: String },

    /// Launch failure
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Artifact transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// The source tree is missing or not a directory
    #[error("transfer source '{path}' is not a directory")]
    SourceMissing { path: PathBuf },

    /// IO error while copying
    #[error("transfer failed at '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Directory walk failed
    #[error("failed to walk source tree: {error}")]
    Walk { error: String },
}

/// Git bootstrap errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Clone destination already exists
    #[error("refusing to clone into existing path '{path}'")]
    DestinationExists { path: PathBuf },

    /// git exited non-zero
    #[error("git clone failed with status {status}")]
    CloneFailed { status: i32 },

    /// Launch failure
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a config file
    #[error("failed to read '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse a config file
    #[error("failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to write a config file
    #[error("failed to write '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// No global configuration saved yet
    #[error("cab is not configured yet; run 'cab init' first")]
    NotInitialized,

    /// Referenced build has no record
    #[error("unknown build '{name}'")]
    UnknownBuild { name: String },

    /// A record with that name already exists
    #[error("build '{name}' already exists")]
    BuildExists { name: String },
}

/// Incremental pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither a prior raw image nor a release base image exists
    #[error("no available image for vendor '{vendor}' release '{release}'")]
    NoAvailableImage { vendor: String, release: String },

    /// The post-install script exited non-zero
    #[error("post-install script failed ({status}): {stderr}")]
    PostInstall { status: i32, stderr: String },

    /// Could not drop the post-install script from the mounted tree
    #[error("failed to remove '{path}' from image: {error}")]
    Cleanup { path: PathBuf, error: String },

    /// Working-container operation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Artifact transfer failed
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Image lookup failed
    #[error(transparent)]
    Query(#[from] PodmanError),
}

/// Build orchestration errors
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// buildah or podman is not installed
    #[error("required tool '{tool}' not found in PATH")]
    MissingTool { tool: String },

    /// No builder image exists for this vendor/release pair
    #[error("no builder image for vendor '{vendor}' release '{release}'; run 'cab image ensure' first")]
    MissingBuilderImage { vendor: String, release: String },

    /// The compile container exited non-zero
    #[error("compile step failed with status {status}")]
    CompileFailed { status: i32 },

    /// The build has no latest image to push
    #[error("build '{name}' has no 'latest' image to push")]
    NothingToPush { name: String },

    /// Filesystem preparation failed
    #[error("failed to prepare '{path}': {error}")]
    Prepare { path: PathBuf, error: String },

    /// Pipeline failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Image lookup failure
    #[error(transparent)]
    Query(#[from] PodmanError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Bootstrap image construction errors
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A provisioning command inside the container exited non-zero
    #[error("bootstrap step '{step}' failed ({status}): {stderr}")]
    Step {
        step: &'static str,
        status: i32,
        stderr: String,
    },

    /// A required input path is missing
    #[error("bootstrap input '{path}' does not exist")]
    MissingInput { path: PathBuf },

    /// Working-container operation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Image lookup failed
    #[error(transparent)]
    Query(#[from] PodmanError),
}
