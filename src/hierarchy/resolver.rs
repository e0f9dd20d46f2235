//! Whole-tree resolution across every declared hierarchy.

use super::candidates::WILDCARD;
use super::level::{Filters, Hierarchy};
use super::loader::{Layout, LoadOptions, Loader};
use super::path::{build_glob_pattern, decode_leaf_path, discover_leaves, output_name};
use crate::error::ResolveResult;
use crate::logging::Logger;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved documents keyed by leaf path relative to `config/`.
pub type ResolvedConfigs = BTreeMap<String, Value>;

/// Resolves every leaf of every hierarchy under one root.
///
/// Runs are all-or-nothing: the first failing leaf aborts the run.
pub struct Resolver {
    layout: Layout,
    hierarchies: Vec<Hierarchy>,
    filters: Filters,
    options: LoadOptions,
    logger: Logger,
}

impl Resolver {
    pub fn new(
        root: impl Into<PathBuf>,
        hierarchies: Vec<Hierarchy>,
        filters: Filters,
        options: LoadOptions,
        logger: &Logger,
    ) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            layout: Layout::new(root),
            hierarchies,
            filters,
            options,
            logger: logger.child("resolver"),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Leaves belonging to `hierarchy`, minus any path using the wildcard token.
    pub fn discover(&self, hierarchy: &Hierarchy) -> ResolveResult<Vec<PathBuf>> {
        if hierarchy.is_empty() {
            self.logger.warning("Skipping hierarchy with no levels");
            return Ok(Vec::new());
        }

        let config_dir = &self.layout.config_dir;
        let pattern = build_glob_pattern(config_dir, hierarchy, &self.filters);
        self.logger.debug(&format!("Glob pattern: {pattern}"));

        let leaves = discover_leaves(config_dir, hierarchy, &self.filters)?
            .into_iter()
            .filter(|leaf| !uses_wildcard(leaf, config_dir))
            .collect();
        Ok(leaves)
    }

    /// Resolve every leaf. Later hierarchies overwrite earlier ones on
    /// colliding output names.
    pub fn resolve(&self) -> ResolveResult<ResolvedConfigs> {
        let mut loader = Loader::new(&self.layout, self.options, &self.logger);
        let mut resolved = ResolvedConfigs::new();

        for hierarchy in &self.hierarchies {
            for leaf in self.discover(hierarchy)? {
                self.logger.debug(&format!("Config file: {}", leaf.display()));

                let values = decode_leaf_path(&leaf, &self.layout.config_dir, hierarchy)?;
                let config = loader.load(&leaf, hierarchy, &values)?;
                let name = output_name(&leaf, &self.layout.config_dir);
                if resolved.insert(name.clone(), config).is_some() {
                    self.logger
                        .debug(&format!("{name} replaced by a later hierarchy"));
                }
            }
        }

        Ok(resolved)
    }
}

fn uses_wildcard(leaf: &Path, config_dir: &Path) -> bool {
    output_name(leaf, config_dir).contains(WILDCARD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_wildcard_paths_are_not_leaves() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "config/dev/api.yaml", "a: 1\n");
        write(temp.path(), "config/dev/@.yaml", "a: 2\n");
        write(temp.path(), "config/@/api.yaml", "a: 3\n");

        let hierarchy = Hierarchy::from_names(["env", "service"]).unwrap();
        let resolver = Resolver::new(
            temp.path(),
            vec![hierarchy.clone()],
            Filters::default(),
            LoadOptions::default(),
            &Logger::new(),
        );
        let leaves = resolver.discover(&hierarchy).unwrap();
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].ends_with("dev/api.yaml"));
    }

    #[test]
    fn test_root_containing_wildcard_still_resolves() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("team@site");
        write(&root, "config/dev/api.yaml", "a: 1\n");

        let resolver = Resolver::new(
            &root,
            vec![Hierarchy::from_names(["env", "service"]).unwrap()],
            Filters::default(),
            LoadOptions::default(),
            &Logger::new(),
        );
        let resolved = resolver.resolve().unwrap();
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["dev/api.yaml"]);
    }

    #[test]
    fn test_empty_hierarchy_discovers_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "config/dev.yaml", "a: 1\n");

        let resolver = Resolver::new(
            temp.path(),
            vec![Hierarchy::default()],
            Filters::default(),
            LoadOptions::default(),
            &Logger::new(),
        );
        assert!(resolver.resolve().unwrap().is_empty());
    }
}
