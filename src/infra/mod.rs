//! Infrastructure layer
//!
//! Handles all I/O operations: subprocesses, the image tool, filesystem
//! transfer, and platform directories. This module is the only place
//! where side effects occur.

pub mod buildah;
pub mod dirs;
pub mod exec;
pub mod git;
pub mod podman;
pub mod registry;
pub mod transfer;
