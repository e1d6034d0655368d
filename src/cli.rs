//! Command-line argument definitions.

use clap::{Parser, Subcommand};

use crate::catalog::Category;

/// Top-level CLI entry point for the package bootstrapper.
#[derive(Parser, Debug)]
#[command(
    name = "rigup",
    about = "Personal environment bootstrapper: software, dotfiles, shell integration",
    version = option_env!("RIGUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Override the packages root directory
    #[arg(long, global = true)]
    pub packages_root: Option<std::path::PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available packages grouped by category
    List(ListOpts),
    /// Show package details and install status
    Info(InfoOpts),
    /// Search packages by text, category or tags
    Search(SearchOpts),
    /// Install packages: software, config files, shell integration
    Install(InstallOpts),
    /// Remove packages: shell integration, config files, software
    Remove(RemoveOpts),
    /// Generate shell completions
    Completion(CompletionOpts),
}

impl Command {
    /// Short command name, used for the per-command log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Info(_) => "info",
            Self::Search(_) => "search",
            Self::Install(_) => "install",
            Self::Remove(_) => "remove",
            Self::Completion(_) => "completion",
        }
    }
}

/// Options for the `list` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ListOpts {
    /// Only show this category
    #[arg(long)]
    pub category: Option<Category>,

    /// Include packages not supported on this platform
    #[arg(long)]
    pub all_platforms: bool,
}

/// Options for the `info` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InfoOpts {
    /// Package id
    pub id: String,
}

/// Options for the `search` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SearchOpts {
    /// Free text matched against name, summary, description and tags
    pub query: Option<String>,

    /// Restrict to one category
    #[arg(long)]
    pub category: Option<Category>,

    /// Require one of these tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,

    /// Platform to filter for: an OS family slug such as `debian` or
    /// `macos`, or `all` to disable the filter (default: current platform)
    #[arg(long)]
    pub platform: Option<String>,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Package ids to install
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Options for the `remove` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RemoveOpts {
    /// Package ids to remove
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Options for the `completion` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
