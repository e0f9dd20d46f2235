//! Override candidate enumeration.
//!
//! For a leaf with hierarchy values `v1..vn`, every position may hold either
//! its concrete value or the wildcard token `@`. Trailing wildcards are
//! elided from the key, so `dev/@/@` becomes the key `dev` and `@/@/api`
//! stays `@/@/api`. Wildcards left in the middle of a key are literal
//! directories named `@`; they are never expanded.
//!
//! An elided key is looked up under every spelling of its tail: the key
//! `dev` above matches `dev.yaml`, `dev/@.yaml` and `dev/@/@.yaml`.
//!
//! Files found are ordered by segment count, then by relative path. Later
//! entries take precedence.
//!
//! This is O(2^n) in the hierarchy depth. Depths are expected to stay small;
//! [`MAX_DEPTH`] bounds them.

use super::level::HierarchyValues;
use super::path::{YAML_EXTENSION, document_path, relative_segments};
use crate::error::{ResolveError, ResolveResult};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Path segment meaning "any value at this level".
pub const WILDCARD: &str = "@";

/// Deepest hierarchy the enumerator accepts.
pub const MAX_DEPTH: usize = 16;

/// One position of a candidate key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Value(String),
    Wildcard,
}

impl Segment {
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Value(v) => v,
            Segment::Wildcard => WILDCARD,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard)
    }
}

/// A candidate override location with trailing wildcards removed.
///
/// Ordered by depth first, then by rendered path. Shallow keys sort first and
/// so lose to deeper, more specific ones; equal depths tie-break
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    segments: Vec<Segment>,
    /// Trailing wildcards removed from the choice combination.
    elided: usize,
}

impl CandidateKey {
    /// Build the key for one choice combination.
    ///
    /// Bit `i` of `mask` selects the concrete value for position `i`; a clear
    /// bit selects the wildcard. Returns `None` for the all-wildcard mask.
    pub fn from_mask(values: &[&str], mask: u32) -> Option<Self> {
        let mut segments: Vec<Segment> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if mask & (1 << i) != 0 {
                    Segment::Value((*v).to_string())
                } else {
                    Segment::Wildcard
                }
            })
            .collect();

        let mut elided = 0;
        while segments.last().is_some_and(Segment::is_wildcard) {
            segments.pop();
            elided += 1;
        }

        if segments.is_empty() {
            None
        } else {
            Some(Self { segments, elided })
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// `seg1/.../segN.yaml`, relative to the config directory.
    pub fn relative_path(&self) -> String {
        let parts: Vec<&str> = self.segments.iter().map(Segment::as_str).collect();
        format!("{}{}", parts.join("/"), YAML_EXTENSION)
    }

    /// The candidate's location under `base`.
    pub fn path(&self, base: &Path) -> PathBuf {
        let parts: Vec<&str> = self.segments.iter().map(Segment::as_str).collect();
        document_path(base, &parts)
    }

    /// Every file location that spells this key, shortest first.
    ///
    /// The first entry is [`CandidateKey::path`]; each further entry keeps one
    /// more of the elided wildcards as an explicit `@` segment.
    pub fn spellings(&self, base: &Path) -> Vec<PathBuf> {
        let mut parts: Vec<&str> = self.segments.iter().map(Segment::as_str).collect();
        let mut paths = vec![document_path(base, &parts)];
        for _ in 0..self.elided {
            parts.push(WILDCARD);
            paths.push(document_path(base, &parts));
        }
        paths
    }
}

impl Ord for CandidateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| self.relative_path().cmp(&other.relative_path()))
            .then_with(|| self.elided.cmp(&other.elided))
    }
}

impl PartialOrd for CandidateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative_path())
    }
}

/// Every candidate key for `values`, sorted in precedence order.
///
/// Yields `2^n - 1` keys: the all-wildcard combination targets nothing.
pub fn enumerate_keys(values: &HierarchyValues) -> ResolveResult<Vec<CandidateKey>> {
    let depth = values.len();
    if depth > MAX_DEPTH {
        return Err(ResolveError::InvalidHierarchy(format!(
            "hierarchy depth {depth} exceeds the supported maximum of {MAX_DEPTH}"
        )));
    }

    let values: Vec<&str> = values.values().collect();
    let mut keys: Vec<CandidateKey> = (1..(1u32 << depth))
        .filter_map(|mask| CandidateKey::from_mask(&values, mask))
        .collect();
    keys.sort();
    Ok(keys)
}

/// Filters candidate keys down to files that exist under a config directory.
///
/// Directory existence is cached, so keys sharing a missing directory prefix
/// cost one `stat` between them.
pub struct CandidateEnumerator<'a> {
    config_dir: &'a Path,
    directories: HashMap<PathBuf, bool>,
}

impl<'a> CandidateEnumerator<'a> {
    pub fn new(config_dir: &'a Path) -> Self {
        Self {
            config_dir,
            directories: HashMap::new(),
        }
    }

    /// Existing override files for `values`, lowest precedence first.
    pub fn existing(&mut self, values: &HierarchyValues) -> ResolveResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        for key in enumerate_keys(values)? {
            for path in key.spellings(self.config_dir) {
                let in_existing_dir = path
                    .parent()
                    .is_some_and(|dir| self.directory_exists(dir));
                if in_existing_dir && path.is_file() {
                    found.push(path);
                }
            }
        }
        found.sort_by_cached_key(|path| precedence(path, self.config_dir));
        found.dedup();
        Ok(found)
    }

    fn directory_exists(&mut self, dir: &Path) -> bool {
        if let Some(exists) = self.directories.get(dir) {
            return *exists;
        }
        // A missing parent means every child is missing too.
        let exists = match dir.parent() {
            Some(parent) if dir != self.config_dir && !self.directory_exists(parent) => false,
            _ => dir.is_dir(),
        };
        self.directories.insert(dir.to_path_buf(), exists);
        exists
    }
}

/// Sort key for a found file: segment count, then `/`-joined relative path.
fn precedence(path: &Path, config_dir: &Path) -> (usize, String) {
    let segments = relative_segments(path, config_dir);
    (segments.len(), segments.join("/"))
}

/// Existing override files for `values` under `config_dir`, in precedence order.
pub fn existing_candidates(
    config_dir: &Path,
    values: &HierarchyValues,
) -> ResolveResult<Vec<PathBuf>> {
    CandidateEnumerator::new(config_dir).existing(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn values(pairs: &[(&str, &str)]) -> HierarchyValues {
        HierarchyValues::new(
            pairs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}\n").unwrap();
    }

    #[test]
    fn test_trailing_wildcards_elided() {
        let key = CandidateKey::from_mask(&["dev", "eu", "api"], 0b001).unwrap();
        assert_eq!(key.relative_path(), "dev.yaml");
        assert_eq!(
            key.spellings(Path::new("c")),
            vec![
                PathBuf::from("c/dev.yaml"),
                PathBuf::from("c/dev/@.yaml"),
                PathBuf::from("c/dev/@/@.yaml"),
            ]
        );

        let key = CandidateKey::from_mask(&["dev", "eu", "api"], 0b100).unwrap();
        assert_eq!(key.relative_path(), "@/@/api.yaml");

        assert!(CandidateKey::from_mask(&["dev", "eu", "api"], 0).is_none());
    }

    #[test]
    fn test_key_count_and_shape() {
        for depth in 1..=6 {
            let pairs: Vec<(String, String)> = (0..depth)
                .map(|i| (format!("l{i}"), format!("v{i}")))
                .collect();
            let keys = enumerate_keys(&HierarchyValues::new(pairs)).unwrap();
            assert_eq!(keys.len(), (1 << depth) - 1);
            for key in &keys {
                assert!(!key.segments().last().unwrap().is_wildcard());
            }
        }
    }

    #[test]
    fn test_keys_ordered_by_depth_then_path() {
        let keys = enumerate_keys(&values(&[("env", "dev"), ("service", "api")])).unwrap();
        let paths: Vec<String> = keys.iter().map(CandidateKey::relative_path).collect();
        assert_eq!(paths, vec!["dev.yaml", "@/api.yaml", "dev/api.yaml"]);

        for pair in keys.windows(2) {
            assert!(pair[0].depth() <= pair[1].depth());
            if pair[0].depth() == pair[1].depth() {
                assert!(pair[0].relative_path() < pair[1].relative_path());
            }
        }
    }

    #[test]
    fn test_existing_candidates_sorted() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev.yaml");
        touch(&config, "dev/@.yaml");
        touch(&config, "@/eu.yaml");
        touch(&config, "dev/eu.yaml");
        touch(&config, "dev/eu/api.yaml");
        touch(&config, "prod/eu.yaml");

        let found = existing_candidates(
            &config,
            &values(&[("env", "dev"), ("region", "eu"), ("service", "api")]),
        )
        .unwrap();
        let rel: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(&config).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rel,
            vec![
                "dev.yaml",
                "@/eu.yaml",
                "dev/@.yaml",
                "dev/eu.yaml",
                "dev/eu/api.yaml"
            ]
        );
    }

    #[test]
    fn test_explicit_wildcard_spelling_sorts_by_its_own_depth() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev/@/@.yaml");
        touch(&config, "@/eu.yaml");

        let found = existing_candidates(
            &config,
            &values(&[("env", "dev"), ("region", "eu"), ("service", "api")]),
        )
        .unwrap();
        assert_eq!(
            found,
            vec![
                config.join("@/eu.yaml"),
                config.join("dev/@/@.yaml")
            ]
        );

        let depths: Vec<usize> = found
            .iter()
            .map(|p| relative_segments(p, &config).len())
            .collect();
        assert!(depths.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_middle_wildcard_is_literal_directory() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev/@/api.yaml");
        touch(&config, "prod/@/api.yaml");

        let found = existing_candidates(
            &config,
            &values(&[("env", "dev"), ("region", "eu"), ("service", "api")]),
        )
        .unwrap();
        assert_eq!(found, vec![config.join("dev/@/api.yaml")]);
    }

    #[test]
    fn test_wildcard_leaf_spelling_sorted_with_its_depth() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev.yaml");
        touch(&config, "dev/@.yaml");
        touch(&config, "@/api.yaml");
        touch(&config, "dev/api.yaml");

        let found =
            existing_candidates(&config, &values(&[("env", "dev"), ("service", "api")])).unwrap();
        assert_eq!(
            found,
            vec![
                config.join("dev.yaml"),
                config.join("@/api.yaml"),
                config.join("dev/@.yaml"),
                config.join("dev/api.yaml"),
            ]
        );
    }

    #[test]
    fn test_depth_limit() {
        let pairs: Vec<(String, String)> = (0..=MAX_DEPTH)
            .map(|i| (format!("l{i}"), format!("v{i}")))
            .collect();
        assert!(enumerate_keys(&HierarchyValues::new(pairs)).is_err());
    }
}
