mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "barrelkit")]
#[command(about = "Keeps per-directory index files re-exporting every sibling module")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./barrelkit.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory to manage; repeat for several. Overrides `dir`.
    #[arg(long = "dir", global = true)]
    dirs: Vec<PathBuf>,

    /// Regex of paths to leave alone. Overrides `ignored`.
    #[arg(long, global = true)]
    ignored: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short, long, action, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate every index file once
    Collect {
        #[arg(long, action)]
        json: bool,
    },
    /// Regenerate, then keep index files current until Ctrl+C
    Watch {
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// Use the polling backend
        #[arg(long, action)]
        poll: bool,
    },
    /// Print the exports found in each file
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, action)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // Stdout carries command output, including --json reports.
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let overrides = commands::ConfigOverrides {
        config_path: cli.config,
        dirs: cli.dirs,
        ignored: cli.ignored,
    };

    match cli.command {
        Commands::Collect { json } => commands::cmd_collect(&overrides, json)?,
        Commands::Watch { debounce_ms, poll } => commands::cmd_watch(&overrides, debounce_ms, poll)?,
        Commands::Check { files, json } => commands::cmd_check(files, json)?,
    }

    Ok(())
}
