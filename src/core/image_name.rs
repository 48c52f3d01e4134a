//! Fully-qualified image references
//!
//! An image reference has exactly four segments:
//! `<remote>/<repository>/<name>:<tag>`, where the repository itself may
//! contain slashes. Registries shared with other tooling legitimately
//! carry names that do not fit this shape, so parsing is a filter, not a
//! validation: anything else is reported as "no match" and skipped.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A parsed four-segment image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName {
    pub remote: String,
    pub repository: String,
    pub name: String,
    pub tag: String,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([-._\w]+)/(.*)/([-\w]+):([-._\w]+)$").expect("image name pattern")
    })
}

impl ImageName {
    pub fn new(
        remote: impl Into<String>,
        repository: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            remote: remote.into(),
            repository: repository.into(),
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse a reference, returning `None` for anything that does not
    /// match the four-segment grammar. Callers routinely feed this names
    /// belonging to other tools and must treat a mismatch as ignorable.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let captures = name_pattern().captures(text)?;
        Some(Self {
            remote: captures[1].to_string(),
            repository: captures[2].to_string(),
            name: captures[3].to_string(),
            tag: captures[4].to_string(),
        })
    }

    /// Exact name/tag match.
    pub fn matches(&self, name: &str, tag: &str) -> bool {
        self.name == name && self.tag == tag
    }

    /// Name/tag match with the repository as disambiguator; base and
    /// per-build images can collide on vendor/release strings alone.
    pub fn matches_in(&self, repository: &str, name: &str, tag: &str) -> bool {
        self.repository == repository && self.matches(name, tag)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.remote, self.repository, self.name, self.tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_four_segments() {
        let name = ImageName::parse("localhost/cab-builds/demo:latest").unwrap();
        assert_eq!(name.remote, "localhost");
        assert_eq!(name.repository, "cab-builds");
        assert_eq!(name.name, "demo");
        assert_eq!(name.tag, "latest");
    }

    #[test]
    fn test_parse_nested_repository() {
        let name = ImageName::parse("registry.io/cab/base/acme:v1").unwrap();
        assert_eq!(name.remote, "registry.io");
        assert_eq!(name.repository, "cab/base");
        assert_eq!(name.name, "acme");
        assert_eq!(name.tag, "v1");
    }

    #[test]
    fn test_parse_foreign_names_silently_skip() {
        // Registries shared with other tools carry all of these.
        assert_eq!(ImageName::parse(""), None);
        assert_eq!(ImageName::parse("alpine"), None);
        assert_eq!(ImageName::parse("alpine:latest"), None);
        assert_eq!(ImageName::parse("docker.io/library:latest"), None);
        assert_eq!(ImageName::parse("a/b/c"), None);
        assert_eq!(ImageName::parse("a/b/c:d:e"), None);
        assert_eq!(ImageName::parse("<none>/<none>/<none>:x"), None);
    }

    #[test]
    fn test_matches_in_disambiguates_repository() {
        let base = ImageName::parse("localhost/cab/base/acme:v1").unwrap();
        assert!(base.matches("acme", "v1"));
        assert!(base.matches_in("cab/base", "acme", "v1"));
        assert!(!base.matches_in("cab/builder", "acme", "v1"));
    }

    #[test]
    fn test_display_round_trip() {
        let text = "localhost/cab-builds/demo:20260807T120000Z-raw";
        let name = ImageName::parse(text).unwrap();
        assert_eq!(name.to_string(), text);
    }

    proptest! {
        #[test]
        fn prop_format_parse_round_trip(
            remote in "[a-zA-Z0-9][a-zA-Z0-9._-]{0,11}",
            repository in "[a-zA-Z0-9._-]{1,8}(/[a-zA-Z0-9._-]{1,8}){0,2}",
            name in "[a-zA-Z0-9_-]{1,12}",
            tag in "[a-zA-Z0-9][a-zA-Z0-9._-]{0,15}",
        ) {
            let text = format!("{remote}/{repository}/{name}:{tag}");
            let parsed = ImageName::parse(&text).expect("valid reference must parse");
            prop_assert_eq!(parsed.to_string(), text);
        }

        #[test]
        fn prop_parse_never_panics(text in "\\PC{0,64}") {
            let _ = ImageName::parse(&text);
        }
    }
}
