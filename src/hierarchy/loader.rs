//! Per-leaf document loading.
//!
//! A leaf's configuration is the merge of, lowest precedence first:
//!
//! 1. its hierarchy values as an in-memory document
//! 2. `default/<level>/<value>.yaml` for each level, in hierarchy order
//! 3. override candidates under `config/`, in candidate order
//! 4. the leaf file itself
//!
//! The merged document is then interpolated against itself and finally has
//! its level keys renamed or dropped per the hierarchy's aliases.

use super::candidates::CandidateEnumerator;
use super::level::{Hierarchy, HierarchyValues, apply_aliases};
use super::path::document_path;
use crate::error::{ResolveError, ResolveResult};
use crate::logging::{LogLevel, Logger};
use crate::merge::{MergeStrategy, merge_documents};
use crate::template::{UndefinedPolicy, interpolate};
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory names below the root.
pub const CONFIG_DIR: &str = "config";
pub const DEFAULT_DIR: &str = "default";

/// The three directories a resolution run reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub default_dir: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.join(CONFIG_DIR),
            default_dir: root.join(DEFAULT_DIR),
            root,
        }
    }
}

/// One entry of a leaf's merge chain.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// An in-memory document.
    Inline { label: String, value: Value },
    /// A YAML file that must exist when loaded.
    File(PathBuf),
}

impl DocumentSource {
    pub fn label(&self) -> String {
        match self {
            DocumentSource::Inline { label, .. } => label.clone(),
            DocumentSource::File(path) => path.display().to_string(),
        }
    }

    /// Read and parse the source. Empty files yield `null`.
    pub fn load(&self) -> ResolveResult<Value> {
        match self {
            DocumentSource::Inline { value, .. } => Ok(value.clone()),
            DocumentSource::File(path) => read_yaml(path),
        }
    }
}

/// Read a YAML file into a document.
pub fn read_yaml(path: &Path) -> ResolveResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ResolveError::MissingSource {
            path: path.to_path_buf(),
        },
        _ => ResolveError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_yaml(&content, &path.display().to_string())
}

/// Parse YAML text into a document. `origin` names it in errors.
///
/// Text holding nothing but comments and document markers is `null`.
pub fn parse_yaml(content: &str, origin: &str) -> ResolveResult<Value> {
    let blank = content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---" || line == "...");
    if blank {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(content).map_err(|source| ResolveError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Ordered merge sources for one leaf, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceChain {
    sources: Vec<DocumentSource>,
}

impl SourceChain {
    /// Assemble the chain for `leaf`.
    ///
    /// The fully concrete candidate is the leaf itself; it is loaded once,
    /// last, rather than at its candidate position.
    pub fn build(
        layout: &Layout,
        candidates: &mut CandidateEnumerator<'_>,
        values: &HierarchyValues,
        leaf: &Path,
    ) -> ResolveResult<Self> {
        let mut sources = vec![DocumentSource::Inline {
            label: "<hierarchy values>".to_string(),
            value: values.to_document(),
        }];

        for (name, value) in values.iter() {
            let default_file = document_path(&layout.default_dir, &[name, value]);
            if default_file.is_file() {
                sources.push(DocumentSource::File(default_file));
            }
        }

        sources.extend(
            candidates
                .existing(values)?
                .into_iter()
                .filter(|candidate| candidate != leaf)
                .map(DocumentSource::File),
        );

        sources.push(DocumentSource::File(leaf.to_path_buf()));
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[DocumentSource] {
        &self.sources
    }

    /// File sources only, in order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().filter_map(|s| match s {
            DocumentSource::File(path) => Some(path.as_path()),
            DocumentSource::Inline { .. } => None,
        })
    }

    /// Load every source. Fails on the first missing or malformed one.
    pub fn load_documents(&self) -> ResolveResult<Vec<Value>> {
        self.sources.iter().map(DocumentSource::load).collect()
    }
}

/// Knobs that shape a leaf's final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub strategy: MergeStrategy,
    pub undefined: UndefinedPolicy,
}

/// Resolves single leaves against a [`Layout`].
pub struct Loader<'a> {
    layout: &'a Layout,
    options: LoadOptions,
    candidates: CandidateEnumerator<'a>,
    logger: Logger,
}

impl<'a> Loader<'a> {
    pub fn new(layout: &'a Layout, options: LoadOptions, logger: &Logger) -> Self {
        Self {
            layout,
            options,
            candidates: CandidateEnumerator::new(&layout.config_dir),
            logger: logger.child("loader"),
        }
    }

    /// Produce the resolved document for one leaf.
    pub fn load(
        &mut self,
        leaf: &Path,
        hierarchy: &Hierarchy,
        values: &HierarchyValues,
    ) -> ResolveResult<Value> {
        let leaf_label = leaf.display().to_string();
        self.logger
            .log_with_data(LogLevel::Debug, "Hierarchy", &values.to_document());

        let chain = SourceChain::build(self.layout, &mut self.candidates, values, leaf)?;
        let labels: Vec<String> = chain
            .sources()
            .iter()
            .skip(1)
            .map(DocumentSource::label)
            .collect();
        self.logger
            .log_with_data(LogLevel::Debug, "YAML files to be loaded", &json!(labels));

        let documents = chain.load_documents()?;
        let outcome = merge_documents(&documents, self.options.strategy)?;
        if let Some(conflict) = &outcome.fallback {
            self.logger.debug(&format!(
                "Unable to deep merge {leaf_label} ({conflict}), falling back to simple merge"
            ));
        }

        let mut config = interpolate(&outcome.value, self.options.undefined).map_err(|source| {
            ResolveError::Interpolation {
                leaf: leaf_label.clone(),
                source,
            }
        })?;

        apply_aliases(hierarchy, &mut config);
        Ok(config)
    }
}
