//! Output of resolved documents, to the console or a mirrored directory tree.

use crate::error::EmitError;
use crate::hierarchy::ResolvedConfigs;
use crate::logging::Logger;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where resolved documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Print every document.
    Console,
    /// Write each document to `<dir>/<output name>`.
    Directory(PathBuf),
}

impl Destination {
    pub fn from_out(out: Option<PathBuf>) -> Self {
        out.map_or(Destination::Console, Destination::Directory)
    }
}

/// Serializes resolved documents as YAML, optionally alongside JSON.
pub struct Emitter {
    with_json: bool,
    logger: Logger,
}

impl Emitter {
    pub fn new(with_json: bool, logger: &Logger) -> Self {
        Self {
            with_json,
            logger: logger.child("emitter"),
        }
    }

    /// Emit everything in `configs`. Returns the files written, if any.
    ///
    /// An empty set is logged as an error but is not a failure.
    pub fn emit(
        &self,
        configs: &ResolvedConfigs,
        destination: &Destination,
    ) -> Result<Vec<PathBuf>, EmitError> {
        if configs.is_empty() {
            self.logger.error("No configurations found");
            return Ok(Vec::new());
        }

        match destination {
            Destination::Console => {
                let stdout = std::io::stdout();
                self.write_console(configs, &mut stdout.lock())?;
                Ok(Vec::new())
            }
            Destination::Directory(dir) => self.write_tree(configs, dir),
        }
    }

    /// Print `<name>:`, the YAML document and optionally its JSON form.
    pub fn write_console<W: Write>(
        &self,
        configs: &ResolvedConfigs,
        out: &mut W,
    ) -> Result<(), EmitError> {
        let io_err = |source| EmitError::Write {
            path: PathBuf::from("<stdout>"),
            source,
        };
        for (name, config) in configs {
            let yaml = render_yaml(name, config)?;
            writeln!(out, "{name}:\n{yaml}").map_err(io_err)?;
            if self.with_json {
                writeln!(out, "{}\n", render_json(name, config)?).map_err(io_err)?;
            }
        }
        Ok(())
    }

    /// Mirror every output name under `dir`.
    pub fn write_tree(
        &self,
        configs: &ResolvedConfigs,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, EmitError> {
        let mut written = Vec::new();
        for (name, config) in configs {
            let path = dir.join(name);
            write_file(&path, &render_yaml(name, config)?)?;
            self.logger.info(&path.display().to_string());
            written.push(path.clone());

            if self.with_json {
                let json_path = json_sibling(&path);
                write_file(&json_path, &render_json(name, config)?)?;
                self.logger.info(&json_path.display().to_string());
                written.push(json_path);
            }
        }
        Ok(written)
    }
}

/// YAML text with a leading document marker.
pub fn render_yaml(name: &str, config: &Value) -> Result<String, EmitError> {
    let body = serde_yaml::to_string(config).map_err(|source| EmitError::Yaml {
        name: name.to_string(),
        source,
    })?;
    Ok(format!("---\n{body}"))
}

pub fn render_json(name: &str, config: &Value) -> Result<String, EmitError> {
    serde_json::to_string(config).map_err(|source| EmitError::Json {
        name: name.to_string(),
        source,
    })
}

/// `a/b.yaml` becomes `a/b.json`; other names get `.json` appended.
pub fn json_sibling(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(".yaml") {
        Some(stem) => PathBuf::from(format!("{stem}.json")),
        None => PathBuf::from(format!("{text}.json")),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), EmitError> {
    let err = |source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(err)?;
    }
    std::fs::write(path, content).map_err(err)
}
