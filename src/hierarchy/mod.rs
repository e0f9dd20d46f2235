//! Hierarchical configuration resolution.
//!
//! A root directory holds two trees:
//!
//! - `config/<level1>/.../<levelN>.yaml` - leaves, plus partial overrides at
//!   any shallower depth (using `@` for "any value at this level")
//! - `default/<level>/<value>.yaml` - per-level defaults
//!
//! Each leaf resolves to one merged document; see [`loader`] for the merge
//! order and [`candidates`] for how overrides are found.

pub mod candidates;
mod level;
pub mod loader;
pub mod path;
mod resolver;

pub use candidates::{CandidateEnumerator, CandidateKey, Segment, WILDCARD, existing_candidates};
pub use level::{Filters, Hierarchy, HierarchyValues, Level, apply_aliases};
pub use loader::{DocumentSource, Layout, LoadOptions, Loader, SourceChain};
pub use path::{build_glob_pattern, decode_leaf_path, discover_leaves, output_name};
pub use resolver::{ResolvedConfigs, Resolver};
