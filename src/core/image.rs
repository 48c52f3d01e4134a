//! Resolved container images
//!
//! One `ContainerImage` is one physical image: a content-addressed hash
//! plus however many references (zero included) currently point at it.
//! Instances come from the image tool's listing and are never mutated
//! locally; a fresh listing supersedes them.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::core::image_name::ImageName;

#[derive(Debug, Clone)]
pub struct ContainerImage {
    id: String,
    names: Vec<ImageName>,
    size: u64,
    created: DateTime<Utc>,
}

impl ContainerImage {
    pub fn new(
        id: impl Into<String>,
        names: Vec<ImageName>,
        size: u64,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            names,
            size,
            created,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First 12 hex digits, the form the tool prints.
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(12);
        &self.id[..end]
    }

    pub fn names(&self) -> &[ImageName] {
        &self.names
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.names.iter().any(|n| n.tag == tag)
    }

    /// The reference carrying `tag`, if any.
    pub fn name_with_tag(&self, tag: &str) -> Option<&ImageName> {
        self.names.iter().find(|n| n.tag == tag)
    }

    pub fn latest_name(&self) -> Option<&ImageName> {
        self.name_with_tag(crate::config::naming::LATEST_TAG)
    }

    /// Whether any reference uses `name` as its name segment.
    pub fn named(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.name == name)
    }

    /// Fold additional references into this image, dropping duplicates.
    /// Listings can emit one record per tag for a single hash.
    pub fn merge_names(&mut self, names: Vec<ImageName>) {
        for name in names {
            if !self.names.contains(&name) {
                self.names.push(name);
            }
        }
    }
}

impl fmt::Display for ContainerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())?;
        for name in &self.names {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

fn created_at_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})").expect("created-at pattern")
    })
}

/// Parse a listing `CreatedAt` value.
///
/// Sub-second precision varies between tool versions, so the timestamp is
/// truncated to whole seconds before parsing.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let captures = created_at_pattern().captures(raw)?;
    NaiveDateTime::parse_from_str(&captures[1], "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
