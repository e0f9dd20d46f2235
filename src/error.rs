//! Structured error types for hierarchy resolution.

use std::path::PathBuf;

/// Errors raised while resolving a configuration tree.
///
/// Every variant except a recovered [`MergeError`] aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A leaf path has a different number of segments than the hierarchy has levels.
    #[error(
        "leaf {} has {found} path segment(s) but the hierarchy has {expected} level(s)",
        leaf.display()
    )]
    HierarchyShape {
        leaf: PathBuf,
        expected: usize,
        found: usize,
    },

    /// A source that was expected on disk is gone.
    #[error("required source is missing: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("interpolation failed for {leaf}: {source}")]
    Interpolation {
        leaf: String,
        #[source]
        source: InterpolationError,
    },

    #[error("failed to walk {}: {source}", root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid pattern '{pattern}' for level '{level}': {source}")]
    Pattern {
        level: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),
}

/// Structural conflict raised by the deep merge strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("cannot merge {overlay} into {base} at '{path}'")]
    Conflict {
        path: String,
        base: &'static str,
        overlay: &'static str,
    },
}

/// Failures while rendering `{{ ... }}` expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    #[error("'{expression}' is undefined (referenced from '{location}')")]
    Undefined {
        expression: String,
        location: String,
    },

    #[error("circular reference: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("unsupported expression '{expression}' at '{location}'")]
    Syntax {
        expression: String,
        location: String,
    },
}

/// Errors raised while writing resolved documents.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {name} as YAML: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize {name} as JSON: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for resolution operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
