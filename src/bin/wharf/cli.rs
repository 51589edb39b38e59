//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Wharf - compose package sources into one repository view
#[derive(Parser)]
#[command(name = "wharf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the packages the project references
    List(ListArgs),

    /// Install a package and reference it from the project
    Add(AddArgs),

    /// Remove a package reference and the stored package
    Remove(RemoveArgs),

    /// Restore referenced packages missing from the store
    Restore(RestoreArgs),

    /// Manage package sources
    Source(SourceArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// List every package of every enabled source instead
    #[arg(long)]
    pub all: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Package id
    pub id: String,

    /// Exact version (defaults to the highest available)
    #[arg(long)]
    pub version: Option<String>,

    /// Source to install from (defaults to the highest-priority source)
    #[arg(long)]
    pub source: Option<String>,

    /// Resolve dependencies from the chosen source only
    #[arg(long)]
    pub no_fallback: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Package id
    pub id: String,

    /// Version to remove, when several are referenced
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(Args)]
pub struct RestoreArgs {
    /// Authoritative source (defaults to the highest-priority source)
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Args)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand)]
pub enum SourceCommands {
    /// List configured sources
    List,

    /// Add a source
    Add {
        /// Source name
        name: String,

        /// Folder path or URL
        url: String,

        /// Priority (lower is consulted first)
        #[arg(long)]
        priority: Option<i32>,

        /// Edit the global config instead of the workspace config
        #[arg(long)]
        global: bool,
    },

    /// Remove a source
    Remove {
        /// Source name
        name: String,

        /// Edit the global config instead of the workspace config
        #[arg(long)]
        global: bool,
    },

    /// Enable a source
    Enable {
        /// Source name
        name: String,

        /// Edit the global config instead of the workspace config
        #[arg(long)]
        global: bool,
    },

    /// Disable a source
    Disable {
        /// Source name
        name: String,

        /// Edit the global config instead of the workspace config
        #[arg(long)]
        global: bool,
    },
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
