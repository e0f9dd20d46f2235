//! Run configuration types.

use crate::emit::Destination;
use crate::hierarchy::{Filters, Hierarchy, Level, LoadOptions};
use crate::merge::MergeStrategy;
use crate::template::UndefinedPolicy;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default config file name, looked up in the root directory.
pub const DEFAULT_CONFIG_FILE: &str = "stratum.yaml";

/// A hierarchy level as written in a config file.
///
/// Either a bare name, or a single-entry map `{name: alias}` where a null or
/// empty alias drops the level from output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    Name(String),
    Aliased(BTreeMap<String, Option<String>>),
}

impl LevelSpec {
    /// Parse the CLI form: `name`, `name=alias` or `name=` (dropped).
    pub fn parse_cli(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, alias)) => {
                let alias = (!alias.is_empty()).then(|| alias.to_string());
                LevelSpec::Aliased(BTreeMap::from([(name.to_string(), alias)]))
            }
            None => LevelSpec::Name(arg.to_string()),
        }
    }

    pub fn to_level(&self) -> Result<Level> {
        match self {
            LevelSpec::Name(name) => Ok(Level::new(name.clone())),
            LevelSpec::Aliased(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, alias)), None) => Ok(Level::aliased(name.clone(), alias.clone())),
                    _ => Err(anyhow!(
                        "hierarchy levels must be a name or a single-entry map, got {} entries",
                        map.len()
                    )),
                }
            }
        }
    }
}

/// Accepts either a list of hierarchies or a single flat hierarchy.
#[derive(Deserialize)]
#[serde(untagged)]
enum HierarchyList {
    Many(Vec<Vec<LevelSpec>>),
    One(Vec<LevelSpec>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<Vec<LevelSpec>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<HierarchyList>::deserialize(deserializer)? {
        Some(HierarchyList::Many(many)) => many,
        Some(HierarchyList::One(one)) => vec![one],
        None => Vec::new(),
    })
}

/// Everything one resolution run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory containing `config/` and `default/`.
    pub root: Option<PathBuf>,

    /// Hierarchies, in declaration order.
    #[serde(deserialize_with = "one_or_many")]
    pub hierarchy: Vec<Vec<LevelSpec>>,

    /// Output directory. `None` prints to the console.
    pub out: Option<PathBuf>,

    /// Also emit JSON next to each YAML document.
    pub with_json: bool,

    /// Leave unresolved templates in place and log at debug level.
    pub debug: bool,

    /// Try a deep merge first, falling back to a simple one on conflicts.
    pub attempt_deep_merge: bool,

    /// Level name to glob sub-pattern.
    pub filters: BTreeMap<String, String>,
}

impl RunConfig {
    /// The declared hierarchies; a single empty one if none are declared.
    pub fn hierarchies(&self) -> Result<Vec<Hierarchy>> {
        if self.hierarchy.is_empty() {
            return Ok(vec![Hierarchy::default()]);
        }
        self.hierarchy
            .iter()
            .map(|levels| {
                let levels = levels
                    .iter()
                    .map(LevelSpec::to_level)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Hierarchy::new(levels)?)
            })
            .collect()
    }

    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn filters(&self) -> Filters {
        Filters::new(self.filters.clone())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strategy: if self.attempt_deep_merge {
                MergeStrategy::DeepWithFallback
            } else {
                MergeStrategy::Simple
            },
            undefined: if self.debug {
                UndefinedPolicy::Preserve
            } else {
                UndefinedPolicy::Strict
            },
        }
    }

    pub fn destination(&self) -> Destination {
        Destination::from_out(self.out.clone())
    }
}
