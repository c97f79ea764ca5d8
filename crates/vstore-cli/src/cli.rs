use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vstore",
    about = "VStore: versioned templates and objects",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a template descriptor (JSON) without storing it
    CheckTemplate(CheckTemplateArgs),
    /// Run a JSON script of store operations against in-memory backends
    Apply(ApplyArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct CheckTemplateArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub script: PathBuf,
    /// Run the remaining steps after a failed one
    #[arg(long)]
    pub keep_going: bool,
}
