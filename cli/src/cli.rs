use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "takedown")]
#[command(about = "Manage files attached to takedown notices", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server, without the `/api` suffix
    #[arg(long, global = true, env = "TAKEDOWN_API_BASE_URL")]
    pub api_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "TAKEDOWN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Print the resulting notice and files as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Show timing/latency information
    #[arg(long, global = true)]
    pub timing: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload files and attach them to a new draft notice
    Upload {
        /// Files to attach, in notice order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete stored files by id
    Delete {
        /// Server file ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Look up metadata for stored files
    Fetch {
        /// Server file ids; repeated ids are fetched once
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
