//! Conversion between leaf paths and hierarchy values.
//!
//! Each hierarchy level owns exactly one path segment below `config/`. A
//! level's glob pattern is matched against that one segment only, so `**`
//! behaves like `*` and never crosses directories.

use super::level::{Filters, Hierarchy, HierarchyValues};
use crate::error::{ResolveError, ResolveResult};
use globset::{Glob, GlobMatcher};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extension of every configuration document.
pub const YAML_EXTENSION: &str = ".yaml";

/// Build the glob pattern that discovers leaves for `hierarchy`.
///
/// Non-terminal levels default to `**`, the terminal level to `*`; only the
/// terminal segment carries the `.yaml` suffix.
pub fn build_glob_pattern(config_dir: &Path, hierarchy: &Hierarchy, filters: &Filters) -> String {
    level_patterns(hierarchy, filters)
        .into_iter()
        .fold(config_dir.to_path_buf(), |path, (_, pattern)| {
            path.join(pattern)
        })
        .to_string_lossy()
        .into_owned()
}

/// `(level name, segment pattern)` for every level, terminal suffix included.
fn level_patterns(hierarchy: &Hierarchy, filters: &Filters) -> Vec<(String, String)> {
    let last = hierarchy.depth().saturating_sub(1);
    hierarchy
        .levels()
        .iter()
        .enumerate()
        .map(|(i, level)| {
            let terminal = i == last;
            let mut pattern = filters.pattern_for(&level.name, terminal).to_string();
            if terminal {
                pattern.push_str(YAML_EXTENSION);
            }
            (level.name.clone(), pattern)
        })
        .collect()
}

/// Per-level segment matcher.
struct SegmentMatcher {
    matcher: GlobMatcher,
    allows_hidden: bool,
}

impl SegmentMatcher {
    fn new(level: &str, pattern: &str) -> ResolveResult<Self> {
        let glob = Glob::new(pattern).map_err(|source| ResolveError::Pattern {
            level: level.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
            allows_hidden: pattern.starts_with('.'),
        })
    }

    fn is_match(&self, segment: &str) -> bool {
        if segment.starts_with('.') && !self.allows_hidden {
            return false;
        }
        self.matcher.is_match(segment)
    }
}

/// Find every file under `config_dir` matching the hierarchy's pattern.
///
/// Returns absolute-or-as-given paths in sorted order. A missing config
/// directory yields no leaves.
pub fn discover_leaves(
    config_dir: &Path,
    hierarchy: &Hierarchy,
    filters: &Filters,
) -> ResolveResult<Vec<PathBuf>> {
    if hierarchy.is_empty() || !config_dir.is_dir() {
        return Ok(Vec::new());
    }

    let matchers = level_patterns(hierarchy, filters)
        .iter()
        .map(|(level, pattern)| SegmentMatcher::new(level, pattern))
        .collect::<ResolveResult<Vec<_>>>()?;
    let depth = matchers.len();

    let walker = WalkDir::new(config_dir)
        .follow_links(true)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let d = entry.depth();
            d == 0 || matchers[d - 1].is_match(&entry.file_name().to_string_lossy())
        });

    let mut leaves = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| ResolveError::Discovery {
            root: config_dir.to_path_buf(),
            source,
        })?;
        if entry.depth() == depth && entry.file_type().is_file() {
            leaves.push(entry.into_path());
        }
    }
    Ok(leaves)
}

/// Path segments of `leaf` below `config_dir`, extension preserved.
///
/// Leaves that are not under `config_dir` are taken as already relative.
pub fn relative_segments(leaf: &Path, config_dir: &Path) -> Vec<String> {
    leaf.strip_prefix(config_dir)
        .unwrap_or(leaf)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Output key for a leaf: its path below `config_dir`, `/`-separated.
pub fn output_name(leaf: &Path, config_dir: &Path) -> String {
    relative_segments(leaf, config_dir).join("/")
}

/// Zip a leaf's path segments against the hierarchy's level names.
///
/// The final segment loses its extension. A segment count different from
/// the hierarchy depth is a [`ResolveError::HierarchyShape`].
pub fn decode_leaf_path(
    leaf: &Path,
    config_dir: &Path,
    hierarchy: &Hierarchy,
) -> ResolveResult<HierarchyValues> {
    let mut segments = relative_segments(leaf, config_dir);
    if segments.len() != hierarchy.depth() {
        return Err(ResolveError::HierarchyShape {
            leaf: leaf.to_path_buf(),
            expected: hierarchy.depth(),
            found: segments.len(),
        });
    }

    if let Some(last) = segments.last_mut() {
        let stem = Path::new(last.as_str())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        if let Some(stem) = stem {
            *last = stem;
        }
    }

    Ok(HierarchyValues::new(
        hierarchy
            .names()
            .map(str::to_string)
            .zip(segments)
            .collect(),
    ))
}

/// `base/seg1/.../segN.yaml`: the directory segments then the file stem.
pub fn document_path<S: AsRef<str>>(base: &Path, segments: &[S]) -> PathBuf {
    let mut path = base.to_path_buf();
    if let Some((stem, dirs)) = segments.split_last() {
        for dir in dirs {
            path.push(dir.as_ref());
        }
        path.push(format!("{}{}", stem.as_ref(), YAML_EXTENSION));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "a: 1\n").unwrap();
    }

    #[test]
    fn test_glob_pattern_defaults() {
        let hierarchy = Hierarchy::from_names(["env", "region", "service"]).unwrap();
        let pattern = build_glob_pattern(Path::new("/r/config"), &hierarchy, &Filters::default());
        assert_eq!(pattern, "/r/config/**/**/*.yaml");
    }

    #[test]
    fn test_glob_pattern_component_count() {
        for depth in 1..=5 {
            let names: Vec<String> = (0..depth).map(|i| format!("l{i}")).collect();
            let hierarchy = Hierarchy::from_names(names).unwrap();
            let pattern = build_glob_pattern(Path::new("config"), &hierarchy, &Filters::default());
            let parts: Vec<&str> = pattern.split('/').skip(1).collect();
            assert_eq!(parts.len(), depth);
            assert_eq!(parts[depth - 1], "*.yaml");
            assert!(parts[..depth - 1].iter().all(|p| *p == "**"));
        }
    }

    #[test]
    fn test_glob_pattern_filters() {
        let hierarchy = Hierarchy::from_names(["env", "service"]).unwrap();
        let filters: Filters = [
            ("env".to_string(), "prod".to_string()),
            ("service".to_string(), "api*".to_string()),
        ]
        .into_iter()
        .collect();
        let pattern = build_glob_pattern(Path::new("config"), &hierarchy, &filters);
        assert_eq!(pattern, "config/prod/api*.yaml");
    }

    #[test]
    fn test_discover_exact_depth() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev/api.yaml");
        touch(&config, "dev/web.yaml");
        touch(&config, "dev.yaml");
        touch(&config, "dev/eu/api.yaml");
        touch(&config, "dev/notes.txt");
        touch(&config, "dev/.hidden.yaml");

        let hierarchy = Hierarchy::from_names(["env", "service"]).unwrap();
        let leaves = discover_leaves(&config, &hierarchy, &Filters::default()).unwrap();
        let names: Vec<String> = leaves.iter().map(|l| output_name(l, &config)).collect();
        assert_eq!(names, vec!["dev/api.yaml", "dev/web.yaml"]);
    }

    #[test]
    fn test_discover_with_filter() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev/api.yaml");
        touch(&config, "prod/api.yaml");
        touch(&config, "staging/api.yaml");

        let hierarchy = Hierarchy::from_names(["env", "service"]).unwrap();
        let filters: Filters = [("env".to_string(), "{dev,prod}".to_string())]
            .into_iter()
            .collect();
        let leaves = discover_leaves(&config, &hierarchy, &filters).unwrap();
        let names: Vec<String> = leaves.iter().map(|l| output_name(l, &config)).collect();
        assert_eq!(names, vec!["dev/api.yaml", "prod/api.yaml"]);
    }

    #[test]
    fn test_discover_with_middle_filter() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        touch(&config, "dev/eu/api.yaml");
        touch(&config, "dev/us/api.yaml");
        touch(&config, "prod/eu/api.yaml");
        touch(&config, "prod/eu/web.yaml");
        touch(&config, "qa/eu/api.yaml");

        let hierarchy = Hierarchy::from_names(["env", "region", "service"]).unwrap();
        let filters: Filters = [
            ("env".to_string(), "{dev,prod}".to_string()),
            ("region".to_string(), "eu".to_string()),
        ]
        .into_iter()
        .collect();
        let leaves = discover_leaves(&config, &hierarchy, &filters).unwrap();
        let names: Vec<String> = leaves.iter().map(|l| output_name(l, &config)).collect();
        assert_eq!(
            names,
            vec![
                "dev/eu/api.yaml",
                "prod/eu/api.yaml",
                "prod/eu/web.yaml"
            ]
        );

        let region_only: Filters = [("region".to_string(), "us".to_string())]
            .into_iter()
            .collect();
        let leaves = discover_leaves(&config, &hierarchy, &region_only).unwrap();
        let names: Vec<String> = leaves.iter().map(|l| output_name(l, &config)).collect();
        assert_eq!(names, vec!["dev/us/api.yaml"]);
    }

    #[test]
    fn test_discover_missing_config_dir() {
        let temp = TempDir::new().unwrap();
        let hierarchy = Hierarchy::from_names(["env"]).unwrap();
        let leaves =
            discover_leaves(&temp.path().join("config"), &hierarchy, &Filters::default()).unwrap();
        assert!(leaves.is_empty());
    }

    #[test]
    fn test_decode_leaf_path() {
        let hierarchy = Hierarchy::from_names(["env", "region", "service"]).unwrap();
        let values = decode_leaf_path(
            Path::new("/r/config/dev/us-east/api.v2.yaml"),
            Path::new("/r/config"),
            &hierarchy,
        )
        .unwrap();
        assert_eq!(
            values.iter().collect::<Vec<_>>(),
            vec![("env", "dev"), ("region", "us-east"), ("service", "api.v2")]
        );
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let hierarchy = Hierarchy::from_names(["env", "service"]).unwrap();
        let err = decode_leaf_path(
            Path::new("/r/config/dev/eu/api.yaml"),
            Path::new("/r/config"),
            &hierarchy,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::HierarchyShape {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_document_path() {
        let path = document_path(Path::new("/r/config"), &["dev", "@", "api"]);
        assert_eq!(path, PathBuf::from("/r/config/dev/@/api.yaml"));
    }
}
