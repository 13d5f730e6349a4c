use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Convert requirements.txt projects to uv-managed pyproject.toml
#[derive(Parser, Debug, Clone)]
#[command(name = "r2u")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the Python project (defaults to current directory)
    #[arg(value_name = "PROJECT_DIR")]
    pub path: Option<PathBuf>,

    /// Main requirements file (default: auto-detect)
    #[arg(short, long, value_name = "FILE")]
    pub requirements: Option<PathBuf>,

    /// Dev requirements file
    #[arg(long, value_name = "FILE")]
    pub dev: Option<PathBuf>,

    /// Test requirements file
    #[arg(long, value_name = "FILE")]
    pub test: Option<PathBuf>,

    /// Preview the generated pyproject.toml without writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Replace an existing pyproject.toml (a backup is kept) instead of merging
    #[arg(long)]
    pub overwrite: bool,

    /// Project name (overrides auto-detection)
    #[arg(long)]
    pub name: Option<String>,

    /// Project version (overrides auto-detection)
    #[arg(long, value_name = "VERSION")]
    pub project_version: Option<String>,

    /// Python version constraint, e.g. ">=3.10"
    #[arg(long, value_name = "SPEC")]
    pub python: Option<String>,

    /// Skip validation of the written pyproject.toml
    #[arg(long)]
    pub no_validate: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Get the project path, defaulting to current directory
    pub fn project_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Log filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
