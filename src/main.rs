// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use dfagent_core::Analyzer;
use dfagent_model::ModelProvider;
use dfagent_sandbox::HttpSandbox;
use dfagent_storage::HttpStore;

#[derive(Parser, Debug)]
#[command(
    name = "dfagent",
    about = "Answer natural-language questions about tabular data by running analysis code in a sandbox",
    version,
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// The question to answer
    #[arg(value_name = "QUESTION")]
    question: Option<String>,

    /// Data source in NAME=URI form, e.g. sales=s3://bucket/sales.csv.
    /// May be repeated.
    #[arg(long = "table", short = 't', value_name = "NAME=URI")]
    tables: Vec<String>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration and exit
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = dfagent_config::load(cli.config.as_deref())?;

    if let Some(Commands::ShowConfig) = &cli.command {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(question) = cli.question.as_deref() else {
        bail!("no question given; see --help");
    };
    let sources = parse_sources(&cli.tables)?;

    let model: Arc<dyn ModelProvider> = Arc::from(dfagent_model::from_config(&config.model)?);
    let sandbox = Arc::new(HttpSandbox::from_config(&config)?);
    let store = Arc::new(HttpStore::new(config.storage.base_url.clone()));

    let analyzer = Analyzer::new(Arc::new(config), model, sandbox, store);
    let result = analyzer.invoke(question, &sources, None).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.answered() {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse repeated `--table NAME=URI` flags into (name, uri) pairs.
fn parse_sources(tables: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    tables
        .iter()
        .map(|spec| {
            spec.split_once('=')
                .map(|(name, uri)| (name.to_string(), uri.to_string()))
                .filter(|(name, uri)| !name.is_empty() && !uri.is_empty())
                .with_context(|| format!("invalid --table '{spec}'; expected NAME=URI"))
        })
        .collect()
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
