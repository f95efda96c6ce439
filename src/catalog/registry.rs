//! Topic and unit discovery.
//!
//! Listing is purely enumerative: directories under the root are topics,
//! matching files inside a topic are units, and nothing is read or executed
//! along the way. Results are sorted so repeated scans of an unchanged tree
//! produce identical catalogs.

use crate::catalog::model::{Catalog, UnitDescriptor, UnitLocation};
use crate::error::{HubError, NotFoundTarget};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_UNIT_EXTENSION: &str = "json";
pub const DEFAULT_RESERVED_PREFIX: &str = "_";

/// File-naming convention that marks a unit inside a topic directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnitConvention {
    pub extension: String,
    pub reserved_prefix: String,
}

impl Default for UnitConvention {
    fn default() -> Self {
        Self {
            extension: DEFAULT_UNIT_EXTENSION.to_string(),
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
        }
    }
}

impl UnitConvention {
    /// Whether `file_name` names a runnable unit under this convention.
    pub fn accepts(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return false;
        }
        if !self.reserved_prefix.is_empty() && file_name.starts_with(&self.reserved_prefix) {
            return false;
        }
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

/// Registry bound to one apps root.
#[derive(Clone, Debug)]
pub struct Registry {
    root: PathBuf,
    convention: UnitConvention,
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            convention: UnitConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: UnitConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn topics(&self) -> Result<Vec<String>, HubError> {
        list_topics(&self.root)
    }

    pub fn units(&self, topic: &str) -> Result<Vec<UnitDescriptor>, HubError> {
        list_units_with(&self.root, topic, &self.convention)
    }

    /// Scan every topic and its units.
    pub fn catalog(&self) -> Result<Catalog, HubError> {
        let mut catalog = Catalog::default();
        for topic in self.topics()? {
            let units = self.units(&topic)?;
            catalog.insert(topic, units);
        }
        debug!(
            root = %self.root.display(),
            units = catalog.unit_count(),
            "scanned catalog"
        );
        Ok(catalog)
    }
}

/// List the topic directories directly under `root`, sorted by name.
///
/// Hidden (`.`) and internal (`__`) directories are skipped. An existing
/// root without topics yields an empty list.
pub fn list_topics(root: &Path) -> Result<Vec<String>, HubError> {
    if !root.is_dir() {
        return Err(HubError::not_found(
            NotFoundTarget::Root,
            root.display().to_string(),
        ));
    }

    let entries = fs::read_dir(root).map_err(|err| {
        HubError::not_found_io(NotFoundTarget::Root, root.display().to_string(), err)
    })?;

    let mut topics = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            HubError::not_found_io(NotFoundTarget::Root, root.display().to_string(), err)
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_topic_name(name) {
            continue;
        }
        topics.push(name.to_string());
    }
    topics.sort();
    Ok(topics)
}

/// List the units of `topic` using the default [`UnitConvention`].
pub fn list_units(root: &Path, topic: &str) -> Result<Vec<UnitDescriptor>, HubError> {
    list_units_with(root, topic, &UnitConvention::default())
}

pub fn list_units_with(
    root: &Path,
    topic: &str,
    convention: &UnitConvention,
) -> Result<Vec<UnitDescriptor>, HubError> {
    let topic_dir = topic_dir(root, topic)?;
    let entries = fs::read_dir(&topic_dir).map_err(|err| {
        HubError::not_found_io(NotFoundTarget::Topic, topic_dir.display().to_string(), err)
    })?;

    let mut units: BTreeMap<String, UnitDescriptor> = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            HubError::not_found_io(NotFoundTarget::Topic, topic_dir.display().to_string(), err)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !convention.accepts(name) {
            continue;
        }
        units.insert(
            name.to_string(),
            UnitDescriptor {
                topic: topic.to_string(),
                name: name.to_string(),
                location: UnitLocation::new(path.clone()),
            },
        );
    }

    Ok(units.into_values().collect())
}

/// Hidden (`.`) and internal (`__`) directory names are never topics.
fn is_topic_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.starts_with("__")
}

/// Resolve `topic` to a directory directly under `root`.
///
/// Only names [`list_topics`] could return match; separators, `.` and `..`
/// never do, so selection cannot walk out of the root.
fn topic_dir(root: &Path, topic: &str) -> Result<PathBuf, HubError> {
    let listable = is_topic_name(topic) && !topic.contains('/') && !topic.contains('\\');
    let candidate = root.join(topic);
    if !listable || !candidate.is_dir() {
        return Err(HubError::not_found(
            NotFoundTarget::Topic,
            candidate.display().to_string(),
        ));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn convention_rejects_reserved_and_foreign_files() {
        let convention = UnitConvention::default();
        assert!(convention.accepts("report.json"));
        assert!(!convention.accepts("_hidden.json"));
        assert!(!convention.accepts("__init__.json"));
        assert!(!convention.accepts(".draft.json"));
        assert!(!convention.accepts("students.csv"));
        assert!(!convention.accepts("json"));
    }

    #[test]
    fn list_topics_skips_files_and_internal_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("B")).unwrap();
        fs::create_dir(root.join("A")).unwrap();
        fs::create_dir(root.join("__pycache__")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        touch(&root.join("readme.json"));

        assert_eq!(list_topics(root).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn list_topics_on_missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = list_topics(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let file = temp.path().join("file.json");
        touch(&file);
        assert_eq!(list_topics(&file).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn list_units_rejects_escaping_topic_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("apps");
        fs::create_dir_all(root.join("A")).unwrap();
        for topic in ["..", ".", "", "A/..", "../apps"] {
            let err = list_units(&root, topic).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "topic {topic:?}");
        }
    }

    #[test]
    fn unlisted_topics_cannot_be_opened() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for hidden in [".git", "__pycache__"] {
            fs::create_dir(root.join(hidden)).unwrap();
            touch(&root.join(hidden).join("x.json"));
            let err = list_units(root, hidden).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "topic {hidden:?}");
        }
        assert!(list_topics(root).unwrap().is_empty());
    }

    #[test]
    fn registry_with_custom_convention() {
        let temp = TempDir::new().unwrap();
        let topic = temp.path().join("T");
        fs::create_dir(&topic).unwrap();
        touch(&topic.join("one.unit"));
        touch(&topic.join("two.json"));
        touch(&topic.join("~skip.unit"));

        let registry = Registry::new(temp.path()).with_convention(UnitConvention {
            extension: "unit".into(),
            reserved_prefix: "~".into(),
        });
        let names: Vec<String> = registry
            .units("T")
            .unwrap()
            .into_iter()
            .map(|unit| unit.name)
            .collect();
        assert_eq!(names, vec!["one.unit"]);
    }
}
