//! Run configuration.
//!
//! A run is configured from two tiers, merged field by field:
//! 1. **File** - `--config PATH`, or `stratum.yaml` in the root directory
//! 2. **Command line** - flags, which win over the file
//!
//! ## Merge Strategy
//! - `hierarchy`, `root`, `out`: replaced when given on the command line
//! - `filters`: merged per level name
//! - boolean flags: enabled if either tier enables them

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use types::*;
