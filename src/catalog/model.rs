//! Structured descriptors produced by discovery.
//!
//! The registry hands out these types instead of raw paths so callers select
//! units by topic and name; the on-disk location stays opaque and is only
//! surfaced through `Display` for diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque locator for a unit's content.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UnitLocation(PathBuf);

impl UnitLocation {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Serialize for UnitLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One discovered unit: its topic, file name, and where to load it from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UnitDescriptor {
    pub topic: String,
    pub name: String,
    pub location: UnitLocation,
}

impl UnitDescriptor {
    /// The unit name without its extension, used in titles.
    pub fn stem(&self) -> &str {
        self.location
            .path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// Full topic→units structure for one hub session.
///
/// Topics iterate in lexicographic order and each unit list keeps the
/// registry's listing order, so positional selections stay reproducible.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Catalog {
    topics: BTreeMap<String, Vec<UnitDescriptor>>,
}

impl Catalog {
    pub(crate) fn insert(&mut self, topic: String, units: Vec<UnitDescriptor>) {
        self.topics.insert(topic, units);
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn units(&self, topic: &str) -> Option<&[UnitDescriptor]> {
        self.topics.get(topic).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[UnitDescriptor])> {
        self.topics
            .iter()
            .map(|(topic, units)| (topic.as_str(), units.as_slice()))
    }

    /// Total number of units across every topic.
    pub fn unit_count(&self) -> usize {
        self.topics.values().map(Vec::len).sum()
    }
}
