use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mo::config::Config;
use mo::server::{BrowserPolicy, DEFAULT_GROUP};

mod commands;

#[derive(Parser)]
#[command(
    name = "mo",
    version,
    about = "Markdown viewer that shows files in a browser tab with live reload",
    long_about = "Markdown viewer that shows files in a browser tab with live reload.\n\n\
                  A single server runs per port. Running mo while a server is already \
                  listening adds the files to that server and exits. Files are organised \
                  in groups (--target); each group has its own page at /<group>. Saved \
                  changes are pushed to open tabs immediately."
)]
struct Cli {
    /// Markdown files to open
    files: Vec<PathBuf>,

    /// Group to add the files to
    #[arg(short = 't', long = "target", default_value = DEFAULT_GROUP)]
    target: String,

    /// Port to serve on or join
    #[arg(short, long)]
    port: Option<u16>,

    /// Always open a browser tab
    #[arg(long, conflicts_with = "no_open")]
    open: bool,

    /// Never open a browser tab
    #[arg(long)]
    no_open: bool,

    /// Path to a TOML config file (or MO_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.level, &config.logging.format, cli.verbose)?;

    let params = commands::OpenParams {
        files: cli.files,
        group: cli.target,
        browser: BrowserPolicy::from_flags(cli.open, cli.no_open),
    };

    commands::open(config, params).await?;
    Ok(())
}

fn setup_tracing(level: &str, format: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("mo={level},warn")))?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
