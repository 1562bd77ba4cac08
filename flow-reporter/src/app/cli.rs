//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flow Reporter - Turn recorded flows into markdown reports and social images
#[derive(Parser, Debug)]
#[command(name = "flow-report")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the report and social image for a flow
    Generate {
        /// Input flow file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bypass the response cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Do not generate the social image
        #[arg(long)]
        skip_image: bool,
    },

    /// Print the structured digest of a flow without calling any service
    Inspect {
        /// Input flow file
        path: PathBuf,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
