//! Capstan CLI
//!
//! Reads one pipeline script (from a file or stdin), executes it in a
//! fresh runner, and exits non-zero with a single terminal error when the
//! pipeline fails.

use std::fs;
use std::io::Read;

use anyhow::{Context, Result};
use capstan_runner::PipelineRunner;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FILE_STDIN: &str = "-";

#[derive(Parser)]
#[command(name = "capstan")]
#[command(about = "Run CI/CD pipelines defined as Lua scripts", long_about = None)]
struct Cli {
    /// Pipeline script to execute, '-' to read from stdin
    #[arg(short = 'f', long = "file", default_value = "-")]
    file: String,

    /// Keep temporary directories after the run for inspection
    #[arg(long, env = "CAPSTAN_RETAIN_RESOURCES")]
    retain_resources: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capstan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let source = if cli.file == FILE_STDIN {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read pipeline script from stdin")?;
        buf
    } else {
        fs::read_to_string(&cli.file)
            .with_context(|| format!("failed to read pipeline script {}", cli.file))?
    };

    let mut runner = PipelineRunner::new().context("failed to set up pipeline runner")?;
    runner.retain_resources(cli.retain_resources);
    runner.execute(&source).context("pipeline failed")?;

    info!("pipeline completed");
    Ok(())
}
