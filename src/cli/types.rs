//! CLI type definitions
//!
//! Clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "burnish")]
#[command(about = "Burnish - iterative artifact refinement loop", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of .burnish/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a refinement run
    Run(RunArgs),

    /// Show the report for a finished run
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project directory to refine (overrides configuration)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Target score at which the run stops (overrides configuration)
    #[arg(short, long)]
    pub target_score: Option<f64>,

    /// Maximum number of cycles (overrides configuration)
    #[arg(short, long)]
    pub max_cycles: Option<u32>,

    /// Resume the most recent run's memory instead of starting fresh
    #[arg(long)]
    pub resume: bool,

    /// Collaborator driver backing the analyze/implement/reflect stages
    #[arg(long, value_enum, default_value = "mock")]
    pub driver: Driver,
}

/// Which collaborator implementations back the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Driver {
    /// Scripted collaborators; exercises the full loop without editing files
    Mock,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Run ID to report on (defaults to the most recent run)
    pub run_id: Option<Uuid>,
}
