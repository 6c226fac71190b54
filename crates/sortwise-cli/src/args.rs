use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sortwise")]
#[command(about = "Rule-based file organizer with one-step undo")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base directory (default: ~/.sortwise)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum GroupBy {
    /// Group by destination folder
    #[default]
    Folder,
    /// Group by file category
    Category,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show where each file would go, without touching anything
    Preview {
        /// Folder to organize
        dir: PathBuf,

        /// Descend into subfolders (overrides config)
        #[arg(short, long)]
        recursive: bool,

        /// Grouping of the preview
        #[arg(short, long, value_enum, default_value_t = GroupBy::Folder)]
        group_by: GroupBy,

        /// Also list files no rule matched
        #[arg(long)]
        all: bool,
    },

    /// Apply the rules to a folder
    Organize {
        /// Folder to organize
        dir: PathBuf,

        /// Descend into subfolders (overrides config)
        #[arg(short, long)]
        recursive: bool,

        /// Same as `preview`
        #[arg(long)]
        dry_run: bool,
    },

    /// Reverse the last organize run
    Undo {
        /// Show what would be undone without doing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Inspect categories
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Organize a folder, then keep organizing it as files arrive
    Watch {
        /// Folder to watch
        dir: PathBuf,

        /// Descend into subfolders (overrides config)
        #[arg(short, long)]
        recursive: bool,

        /// Quiet period in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,
    /// Show one rule as it appears in the rules file
    Show {
        /// Rule id (see `rules list`)
        id: String,
    },
    /// Check rules for problems
    Validate,
    /// Write a sample rules file (if missing)
    Init,
    /// Show rules file path
    Path,
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories with their extensions and destinations
    List,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g., organize.recursive)
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key (e.g., watch.debounce_ms)
        key: String,
        /// Value to set
        value: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
    /// Initialize config file with default template
    Init,
}
