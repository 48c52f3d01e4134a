//! Default configuration values

/// Default ccache cache size, passed to the compile container
pub const DEFAULT_CCACHE_SIZE: &str = "10G";

/// Script executed (then removed) at the image root during finalization
pub const POST_INSTALL_SCRIPT: &str = "post-install.sh";

/// Subdirectories never transferred into the image.
///
/// These are large, regenerable dependency trees (vendored front-end
/// packages); shipping them would dwarf the actual build artifacts.
pub const TRANSFER_EXCLUDES: &[&str] = &["node_modules", ".npm"];

/// Registry probe timeout, seconds
pub const REGISTRY_PROBE_TIMEOUT: u64 = 30;

/// Bind-mount targets inside builder containers
pub const BUILDER_SOURCES_MOUNT: &str = "/build/src";
pub const BUILDER_CCACHE_MOUNT: &str = "/build/ccache";
pub const BUILDER_OUTPUT_MOUNT: &str = "/build/out";
