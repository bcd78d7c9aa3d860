use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pushsync")]
#[command(version)]
#[command(about = "Declarative Pushover group membership and messages", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: <config dir>/pushsync.toml)
    #[arg(short, long, global = true, env = "PUSHSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(TargetArgs),

    /// Converge Pushover to the configuration
    Apply(ApplyArgs),

    /// Re-read tracked entities and update state
    Refresh(TargetArgs),

    /// Remove every tracked entity
    Destroy(DestroyArgs),

    /// List notification sounds
    Sounds,

    /// Validate a user or group key
    Validate {
        /// User or group key
        user: String,

        /// Validate for one device only
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Show the delivery state of an emergency message
    Receipt {
        /// Receipt token
        receipt: String,

        /// Stop retries instead
        #[arg(long)]
        cancel: bool,
    },

    /// Inspect delivery groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconcile
// ============================================================================

#[derive(Parser)]
pub struct TargetArgs {
    /// Only entities matching `type` or `type.name`
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only entities matching `type` or `type.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs (default: [provider].jobs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Cancel remaining entities after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Stop starting remote calls after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Only entities matching `type` or `type.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Show a group's name and members
    Show {
        /// Group key
        group: String,
    },

    /// Rename a group
    Rename {
        /// Group key
        group: String,

        /// New display name
        name: String,
    },
}
