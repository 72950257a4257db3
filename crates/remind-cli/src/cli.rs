use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "remind")]
#[command(about = "Manage reminders and keep your watch and TV in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the sync settings JSON file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new reminder
    #[command(alias = "new")]
    Add {
        /// Reminder title
        title: Vec<String>,
        /// Free text description
        #[arg(short, long)]
        description: Option<String>,
        /// When to alert: RFC 3339, "YYYY-MM-DD HH:MM" (local) or Unix ms
        #[arg(long, value_name = "WHEN")]
        at: Option<String>,
        /// Deadline, same formats as --at
        #[arg(long, value_name = "WHEN")]
        due: Option<String>,
    },
    /// Change fields of an existing reminder
    Edit {
        /// Reminder ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
        /// New alert time
        #[arg(long, value_name = "WHEN", conflicts_with = "clear_at")]
        at: Option<String>,
        /// New deadline
        #[arg(long, value_name = "WHEN", conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the alert time
        #[arg(long)]
        clear_at: bool,
        /// Remove the deadline
        #[arg(long)]
        clear_due: bool,
    },
    /// Mark a reminder as done
    #[command(alias = "done")]
    Complete {
        /// Reminder ID
        id: String,
        /// Reopen instead of completing
        #[arg(long)]
        undo: bool,
    },
    /// Delete a reminder
    #[command(alias = "rm")]
    Delete {
        /// Reminder ID
        id: String,
    },
    /// List reminders
    #[command(alias = "ls")]
    List {
        /// Hide completed reminders
        #[arg(long)]
        active: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show mutations waiting to be sent to peers
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send pending mutations now, then push a full snapshot
    Flush,
    /// Push the full reminder list to every reachable peer
    Snapshot,
    /// Show device role, queue depth and last snapshot times
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Locate TV receivers with the configured discovery strategy
    Discover,
    /// Drop every pending mutation without sending it
    ClearPending,
    /// Stay running: flush on start and on SIGUSR1, and reconcile on the configured interval
    Daemon,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}
