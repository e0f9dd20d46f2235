//! Hierarchy definitions and the values a leaf path assigns to them.

use crate::error::{ResolveError, ResolveResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// One named level of a hierarchy.
///
/// `name` is the path-segment role used for lookup; `alias` is the key the
/// level's value is exposed under in the resolved document. `None` drops the
/// value from the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub name: String,
    pub alias: Option<String>,
}

impl Level {
    /// A level exposed under its own name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: Some(name.clone()),
            name,
        }
    }

    /// A level exposed under `alias`. An empty alias drops the level.
    pub fn aliased(name: impl Into<String>, alias: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            alias: alias.map(Into::into).filter(|a: &String| !a.is_empty()),
        }
    }

    /// True when the output key differs from the level name.
    pub fn is_renamed(&self) -> bool {
        self.alias.as_deref() != Some(self.name.as_str())
    }
}

/// Ordered list of levels describing one directory nesting scheme.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hierarchy {
    levels: Vec<Level>,
}

impl Hierarchy {
    /// Build a hierarchy, rejecting duplicate or empty level names.
    pub fn new(levels: Vec<Level>) -> ResolveResult<Self> {
        let mut seen = HashSet::new();
        for level in &levels {
            if level.name.is_empty() {
                return Err(ResolveError::InvalidHierarchy(
                    "level names must not be empty".to_string(),
                ));
            }
            if !seen.insert(level.name.as_str()) {
                return Err(ResolveError::InvalidHierarchy(format!(
                    "duplicate level name '{}'",
                    level.name
                )));
            }
        }
        Ok(Self { levels })
    }

    /// Convenience constructor for hierarchies without aliases.
    pub fn from_names<I, S>(names: I) -> ResolveResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Level::new).collect())
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|l| l.name.as_str())
    }
}

/// Glob sub-pattern overrides per level name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub const DEFAULT_DIRECTORY: &'static str = "**";
    pub const DEFAULT_TERMINAL: &'static str = "*";

    pub fn new(filters: BTreeMap<String, String>) -> Self {
        Self(filters)
    }

    /// Pattern for a level, falling back to `**` (directory) or `*` (terminal).
    pub fn pattern_for(&self, name: &str, terminal: bool) -> &str {
        match self.0.get(name) {
            Some(pattern) => pattern,
            None if terminal => Self::DEFAULT_TERMINAL,
            None => Self::DEFAULT_DIRECTORY,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.0.insert(name.into(), pattern.into());
    }
}

impl FromIterator<(String, String)> for Filters {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Level name to concrete path segment, in hierarchy order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HierarchyValues(Vec<(String, String)>);

impl HierarchyValues {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values as a document, the lowest-precedence merge source.
    pub fn to_document(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Rename or drop level keys according to each level's alias.
///
/// Levels whose name key is already absent are skipped, so applying this to
/// a document already in alias form changes nothing.
pub fn apply_aliases(hierarchy: &Hierarchy, document: &mut Value) {
    let Value::Object(map) = document else {
        return;
    };

    for level in hierarchy.levels().iter().filter(|l| l.is_renamed()) {
        let Some(value) = map.shift_remove(&level.name) else {
            continue;
        };
        if let Some(alias) = &level.alias {
            map.insert(alias.clone(), value);
        }
    }
}
