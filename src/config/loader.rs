//! Run configuration loader.
//!
//! Two tiers feed a run: the YAML config file, then command-line overrides.

use super::types::{DEFAULT_CONFIG_FILE, LevelSpec, RunConfig};
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Values supplied on the command line. Unset fields defer to the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub hierarchy: Vec<Vec<LevelSpec>>,
    pub out: Option<PathBuf>,
    pub with_json: bool,
    pub debug: bool,
    pub attempt_deep_merge: bool,
    pub filters: BTreeMap<String, String>,
}

/// Loads the config file and applies command-line overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: RunConfig,
    /// Path to the config file that was read, if any
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let (path, required) = match &overrides.config {
            Some(path) => (path.clone(), true),
            None => {
                let root = overrides.root.clone().unwrap_or_else(|| PathBuf::from("."));
                (root.join(DEFAULT_CONFIG_FILE), false)
            }
        };

        let file = Self::read_file(&path, required)?;
        let config_path = file.is_some().then(|| path.clone());
        let config = Self::apply_overrides(file.unwrap_or_default(), &path, overrides);

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Read a config file. A missing optional file yields `None`.
    pub fn read_file(path: &Path, required: bool) -> Result<Option<RunConfig>> {
        if !path.exists() {
            if required {
                bail!("Config file not found: {}", path.display());
            }
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Some(RunConfig::default()));
        }
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Some(config))
    }

    fn apply_overrides(
        mut config: RunConfig,
        path: &Path,
        overrides: ConfigOverrides,
    ) -> RunConfig {
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        config.root = match (overrides.root, &overrides.config, config.root) {
            (Some(root), _, _) => Some(root),
            (None, Some(_), _) => Some(base_dir),
            (None, None, Some(root)) if root.is_relative() => Some(base_dir.join(root)),
            (None, None, root) => root,
        };

        if !overrides.hierarchy.is_empty() {
            config.hierarchy = overrides.hierarchy;
        }
        if overrides.out.is_some() {
            config.out = overrides.out;
        }
        config.with_json |= overrides.with_json;
        config.debug |= overrides.debug;
        config.attempt_deep_merge |= overrides.attempt_deep_merge;
        config.filters.extend(overrides.filters);
        config
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> RunConfig {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
