use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Skiff - build-and-deploy orchestrator for an edge-rendered code playground
#[derive(Parser, Debug)]
#[command(name = "skiff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format for CI
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which part of the project a `build` covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildSelection {
    /// The synchronous renderer function
    Primary,
    /// The edge interceptor
    Edge,
    /// The static frontend bundle
    Frontend,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile and stage artifacts without deploying
    Build {
        /// Build only one output instead of all three
        #[arg(long, value_enum)]
        only: Option<BuildSelection>,
    },

    /// Validate and print the routing topology
    Plan,

    /// Build everything and deploy it behind the distribution
    Deploy {
        /// Build and print the deploy plan without remote calls
        #[arg(long)]
        dry_run: bool,

        /// Deploy previously staged artifacts without rebuilding
        #[arg(long, conflicts_with = "dry_run")]
        skip_build: bool,
    },

    /// Remove the staging directory
    Clean,
}
