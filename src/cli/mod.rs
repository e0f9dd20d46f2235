//! CLI definitions for stratum.
//!
//! Declared options are parsed with clap's derive macros. Any other long
//! option is a level filter: `--env dev` or `--env=dev` restricts the `env`
//! level to values matching the glob `dev`.

use crate::config::{ConfigOverrides, LevelSpec};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Layered hierarchical configuration resolver
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Any other --<level> <glob> option filters that hierarchy level."
)]
pub struct Cli {
    /// Run config file (default: <root>/stratum.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory containing config/ and default/ (default: .)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Hierarchy levels, in order. Repeat for several hierarchies.
    /// `name=alias` renames a level in output, `name=` drops it.
    #[arg(short = 'i', long, num_args = 1.., action = ArgAction::Append, value_name = "LEVEL")]
    pub hierarchy: Vec<String>,

    /// Output directory (default: print to the console)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write JSON alongside YAML
    #[arg(short = 'j', long)]
    pub with_json: bool,

    /// Keep unresolved templates and log at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Attempt a deep merge, falling back to a simple merge on conflicts
    #[arg(short = 'm', long)]
    pub deep_merge: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

/// A parsed command line: declared options, grouped hierarchies and filters.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    /// One entry per `--hierarchy` occurrence.
    pub hierarchies: Vec<Vec<LevelSpec>>,
    pub filters: BTreeMap<String, String>,
}

impl Invocation {
    pub fn parse() -> Result<Self, clap::Error> {
        Self::try_parse_from(std::env::args())
    }

    /// Parse `args`, the first of which is the program name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let (args, filters) = split_filter_args(args)?;

        let matches = Cli::command().try_get_matches_from(args)?;
        let cli = Cli::from_arg_matches(&matches)?;
        let hierarchies = matches
            .get_occurrences::<String>("hierarchy")
            .map(|occurrences| {
                occurrences
                    .map(|levels| levels.map(|level| LevelSpec::parse_cli(level)).collect())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            cli,
            hierarchies,
            filters,
        })
    }

    /// Command-line values for the config loader.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config: self.cli.config.clone(),
            root: self.cli.root.clone(),
            hierarchy: self.hierarchies.clone(),
            out: self.cli.out.clone(),
            with_json: self.cli.with_json,
            debug: self.cli.debug,
            attempt_deep_merge: self.cli.deep_merge,
            filters: self.filters.clone(),
        }
    }
}

/// Pull undeclared `--name value` / `--name=value` pairs out of `args`.
///
/// Everything after a bare `--` is passed through untouched.
pub fn split_filter_args(
    args: Vec<String>,
) -> Result<(Vec<String>, BTreeMap<String, String>), clap::Error> {
    let command = Cli::command();
    let mut known: Vec<&str> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long())
        .collect();
    known.extend(["help", "version"]);

    let mut kept = Vec::with_capacity(args.len());
    let mut filters = BTreeMap::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            kept.push(arg);
            kept.extend(args.by_ref());
            break;
        }
        let Some(option) = arg.strip_prefix("--") else {
            kept.push(arg);
            continue;
        };
        let (name, inline) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (option, None),
        };
        if known.contains(&name) {
            kept.push(arg);
            continue;
        }

        let value = match inline.or_else(|| args.next()) {
            Some(value) => value,
            None => {
                return Err(clap::Error::raw(
                    ErrorKind::InvalidValue,
                    format!("filter '--{name}' requires a value\n"),
                ));
            }
        };
        filters.insert(name.to_string(), value);
    }

    Ok((kept, filters))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Invocation {
        let args = std::iter::once("stratum").chain(args.iter().copied());
        Invocation::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_unknown_options_become_filters() {
        let invocation = parse(&["--env", "dev", "--service=api*", "-j"]);
        assert!(invocation.cli.with_json);
        assert_eq!(invocation.filters["env"], "dev");
        assert_eq!(invocation.filters["service"], "api*");
    }

    #[test]
    fn test_hierarchies_grouped_per_occurrence() {
        let invocation = parse(&[
            "-i",
            "env",
            "region=location",
            "-i",
            "env",
            "service",
            "--env",
            "prod",
        ]);
        assert_eq!(
            invocation.hierarchies,
            vec![
                vec![
                    LevelSpec::parse_cli("env"),
                    LevelSpec::parse_cli("region=location"),
                ],
                vec![
                    LevelSpec::parse_cli("env"),
                    LevelSpec::parse_cli("service"),
                ],
            ]
        );
        assert_eq!(invocation.filters["env"], "prod");
    }

    #[test]
    fn test_declared_options() {
        let invocation = parse(&["--root", "/srv", "-o", "out", "--deep-merge", "--debug"]);
        let overrides = invocation.overrides();
        assert_eq!(overrides.root, Some(PathBuf::from("/srv")));
        assert_eq!(overrides.out, Some(PathBuf::from("out")));
        assert!(overrides.attempt_deep_merge);
        assert!(overrides.debug);
        assert!(overrides.hierarchy.is_empty());
        assert!(overrides.filters.is_empty());
    }

    #[test]
    fn test_filter_without_value_is_an_error() {
        let result = Invocation::try_parse_from(["stratum", "--env"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_declared_option_with_equals_is_kept() {
        let args = vec!["stratum".into(), "--root=/srv".into(), "--x=1".into()];
        let (kept, filters) = split_filter_args(args).unwrap();
        assert_eq!(kept, vec!["stratum", "--root=/srv"]);
        assert_eq!(filters["x"], "1");
    }
}
