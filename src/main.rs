//! dnspulse - DNS benchmarking tool
//!
//! Opens N parallel connections against a resolver and issues queries
//! until the configured budget is exhausted, enforcing a global rate
//! limit and reporting throughput and error statistics as it goes.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod bench;
mod client;
mod config;
mod utils;

use bench::BenchRunner;
use client::UpstreamFactory;
use config::{CliArgs, RunConfig};

fn setup_logging(args: &CliArgs) -> Result<()> {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false);

    match &args.log_output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let subscriber = builder.with_ansi(false).with_writer(Arc::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
        None => {
            let subscriber = builder.finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
    }

    Ok(())
}

fn run(args: CliArgs) -> Result<()> {
    setup_logging(&args)?;

    let config = RunConfig::from_cli(&args)?;
    info!("Run dnspulse with the following configuration:\n{}", config);

    let factory = UpstreamFactory::new(&config);
    let runner = BenchRunner::new(config);
    let summary = runner.run(factory)?;

    summary.log();
    Ok(())
}

fn main() {
    let args = CliArgs::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
