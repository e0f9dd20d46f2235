//! Stratum: layered hierarchical configuration.
//!
//! Resolves a directory tree of YAML fragments into one merged document per
//! leaf. The library exposes the resolution engine for testing and embedding;
//! the binary adds the command line and output handling.

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod merge;
pub mod template;

pub use error::{ResolveError, ResolveResult};
pub use hierarchy::{ResolvedConfigs, Resolver};
