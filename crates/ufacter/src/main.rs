//! ufacter
//!
//! Runs the selected fact reporters concurrently and prints the collected
//! facts as one document on stdout. Logs go to stderr.

use std::io::{BufWriter, Write};
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ufacter_core::CustomFacts;
use ufacter_exec::LocalExecutor;
use ufacter_facts::HostPaths;
use ufacter_format::formatter_for;

mod cli;
mod config;

use cli::Cli;
use config::Config;

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (file_config, source) = match &cli.config {
        Some(path) => (Config::load(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    let config = cli.apply(file_config)?;

    init_tracing(&config.log_level, config.log_json);
    match &source {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no config file found, using defaults"),
    }

    let engine = config.collection.engine()?;
    let custom = match &config.collection.custom_facts {
        Some(path) => Some(CustomFacts::load(path).await?),
        None => None,
    };

    let modules = config.selected_modules();
    let paths = HostPaths::from_env();
    debug!(?modules, ?paths, "starting collection");
    let reporters = ufacter_facts::build(&modules, Arc::new(LocalExecutor::new()), &paths);

    let (namespace, summary) = engine
        .run(
            reporters,
            custom.as_ref(),
            config.collection.custom_facts_order,
        )
        .await?;

    debug!(
        leaves = namespace.leaf_count(),
        format = %config.format,
        "rendering"
    );
    if summary.dropped_total() > 0 {
        debug!(dropped = ?summary.dropped, "facts left out");
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    formatter_for(config.format).render(&namespace, &mut out)?;
    out.flush()?;

    Ok(())
}
