//! Core build logic
//!
//! Image naming and resolution, the incremental build pipeline, and
//! build orchestration. Subprocess and filesystem plumbing lives in
//! [`crate::infra`].
//!
//! # Submodules
//!
//! - [`image_name`] - Four-segment image reference grammar
//! - [`image`] - Resolved images (hash id plus references)
//! - [`images`] - Registry query finders and removal
//! - [`pipeline`] - Two-stage (raw → final) incremental image builds
//! - [`build`] - Compile → image → push orchestration
//! - [`bootstrap`] - Seed/base/builder image construction
//! - [`config`] - Global configuration and per-build records

pub mod bootstrap;
pub mod build;
pub mod config;
pub mod image;
pub mod image_name;
pub mod images;
pub mod pipeline;
