//! stratum
//!
//! Resolves a layered configuration tree into one merged document per leaf.

use anyhow::Result;
use std::fs::OpenOptions;
use stratum::cli::Invocation;
use stratum::config::{ConfigLoader, RunConfig};
use stratum::emit::Emitter;
use stratum::hierarchy::Resolver;
use stratum::logging::{LogLevel, Logger};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging based on the --log option.
fn init_tracing(log: &str, level: Level) -> Result<()> {
    match log {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn run(config: &RunConfig, logger: &Logger) -> Result<()> {
    logger.log_with_data(
        LogLevel::Debug,
        "Effective configuration",
        &serde_json::to_value(config)?,
    );

    let resolver = Resolver::new(
        config.root_dir(),
        config.hierarchies()?,
        config.filters(),
        config.load_options(),
        logger,
    );
    let resolved = resolver.resolve()?;

    Emitter::new(config.with_json, logger).emit(&resolved, &config.destination())?;
    Ok(())
}

fn main() {
    let invocation = Invocation::parse().unwrap_or_else(|e| e.exit());

    // The config file can turn on debug, so load it before the subscriber.
    let loaded = ConfigLoader::load(invocation.overrides());
    let debug = invocation.cli.verbose || loaded.as_ref().is_ok_and(|l| l.config().debug);

    let level = if debug { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_tracing(&invocation.cli.log, level) {
        eprintln!("Failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    let logger = Logger::with_level(if debug { LogLevel::Debug } else { LogLevel::Info })
        .with_name("stratum");

    let result = loaded.and_then(|loader| run(loader.config(), &logger));
    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
