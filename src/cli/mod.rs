pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rk")]
#[command(about = "Restack CLI - reassign hunks and lines into a rewritten history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the restackable commit range with its file changes
    Commits {
        /// Base ref the stack sits on (auto-detected when omitted)
        #[arg(long)]
        base: Option<String>,

        /// Head ref of the stack
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// List individual selectable lines with their unit ids
        #[arg(long)]
        lines: bool,

        /// Emit the raw API payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a restack request from a JSON file
    Apply {
        /// Path to the request file (line-granularity restack request)
        request: PathBuf,

        /// Delete the backup branch without prompting once the restack succeeds
        #[arg(long, short)]
        yes: bool,
    },

    /// Show repository status and the detected restack range
    Status,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::Commits {
                base,
                head,
                lines,
                json,
            } => commands::commits::run(base, head, lines, json).await,
            Commands::Apply { request, yes } => commands::apply::run(request, yes).await,
            Commands::Status => commands::status::run().await,
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time();

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}
