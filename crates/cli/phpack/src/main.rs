//! phpack command-line entry point

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "CLI tool needs to print to stdout/stderr"
)]

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use phpack::commands::{self, Workspace};
use phpack::manifest::Manifest;
use pk_driver::BuildError;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "phpack", version, about = "Bundles PHP libraries and projects into single files")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Path to the directory containing the manifest
    #[clap(long, short = 'C', global = true)]
    project_dir: Option<PathBuf>,

    /// Manifest file, relative to the project directory
    #[clap(long, global = true, default_value = Manifest::FILE_NAME)]
    manifest: PathBuf,

    /// Log more (-v for info, -vv for debug); `PHPACK_LOG` takes precedence
    #[clap(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Build units and their dependencies
    Build {
        /// Units to build; all units when omitted
        units: Vec<String>,
    },

    /// Bundle every unit in memory without writing outputs
    Check,

    /// List declared units
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast::<BuildError>() {
                Ok(build) => eprintln!("{:?}", miette::Report::new(build)),
                Err(other) => eprintln!("{} {other:#}", "error:".red().bold()),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("Failed to determine the current directory")?,
    };
    let workspace = Workspace::load(&project_dir, &cli.manifest)?;

    match &cli.command {
        Command::Build { units } => {
            commands::build(&workspace, units)?;
        }
        Command::Check => {
            commands::check(&workspace)?;
        }
        Command::List => commands::list(&workspace),
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("PHPACK_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
