//! Image naming conventions
//!
//! Every image cab produces or consumes lives in one of a few fixed
//! repositories, so lookups can filter on a repository prefix and then
//! match name/tag pairs exactly.

/// Repository for per-vendor/release base images (`cab/base/<vendor>:<release>`)
pub const BASE_REPOSITORY: &str = "cab/base";

/// Repository for per-vendor/release builder images (`cab/builder/<vendor>:<release>`)
pub const BUILDER_REPOSITORY: &str = "cab/builder";

/// Repository for the shared seed image
pub const SEED_REPOSITORY: &str = "cab/seed";

/// Repository for per-build images (`cab-builds/<name>:<tag>`)
pub const BUILDS_REPOSITORY: &str = "cab-builds";

/// Seed image name and tag; all vendor images start from this one
pub const SEED_NAME: &str = "suse";
pub const SEED_TAG: &str = "leap-15.2";

/// Upstream image the seed is provisioned from
pub const SEED_SOURCE: &str = "opensuse/leap:15.2";

/// Floating tag pointing at the most recent finished image of a build
pub const LATEST_TAG: &str = "latest";

/// Floating tag pointing at the most recent raw (pre-finalize) image
pub const LATEST_RAW_TAG: &str = "latest-raw";

/// Suffix distinguishing a raw commit from its finished counterpart
pub const RAW_SUFFIX: &str = "-raw";

/// Sortable UTC timestamp shared by both commits of one build run
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Repository (with filter-friendly prefix) for one build's images
pub fn build_repository(build: &str) -> String {
    format!("{BUILDS_REPOSITORY}/{build}")
}

/// Tag carried by the raw commit of one pipeline run
pub fn raw_tag(timestamp: &str) -> String {
    format!("{timestamp}{RAW_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_repository() {
        assert_eq!(build_repository("demo"), "cab-builds/demo");
    }

    #[test]
    fn test_raw_tag() {
        assert_eq!(raw_tag("20260807T120000Z"), "20260807T120000Z-raw");
    }
}
