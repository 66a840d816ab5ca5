//! CLI for the rollq rolling HTTP executor.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rollq_core::config;
use std::path::PathBuf;

use commands::{run_fetch, run_sweep, FetchArgs};

/// Top-level CLI for rollq.
#[derive(Debug, Parser)]
#[command(name = "rollq")]
#[command(about = "rollq: run many HTTP requests through a rolling window", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch URLs through the rolling window, printing each completion as it lands.
    Fetch {
        /// URLs to request.
        urls: Vec<String>,

        /// File with one URL per line (blank lines and `#` comments skipped).
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Transfers in flight at once (default from config).
        #[arg(long, short = 'w', value_name = "N")]
        window: Option<usize>,

        /// HTTP method sent for every URL.
        #[arg(long, short = 'X', default_value = "GET", value_name = "M")]
        method: String,

        /// Extra header line, e.g. "Accept: application/json". Repeatable.
        #[arg(long = "header", short = 'H', value_name = "HEADER")]
        headers: Vec<String>,

        /// Raw request body sent with every URL.
        #[arg(long, short = 'd', value_name = "STR")]
        data: Option<String>,

        /// Run one by one instead of failing when the window is below 2.
        #[arg(long)]
        lenient: bool,

        /// Print one JSON object per response instead of a summary line.
        #[arg(long)]
        json: bool,
    },

    /// Remove spooled responses left behind by processes that no longer run.
    Sweep,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                urls,
                input,
                window,
                method,
                headers,
                data,
                lenient,
                json,
            } => {
                let args = FetchArgs {
                    urls,
                    input,
                    window,
                    method,
                    headers,
                    data,
                    lenient,
                    json,
                };
                run_fetch(&cfg, args)?;
            }
            CliCommand::Sweep => run_sweep(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
