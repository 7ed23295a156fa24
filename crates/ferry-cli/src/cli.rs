use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ferry_core::domain::QueueKind;

/// Ferry - distributed persistent job queue
#[derive(Debug, Parser)]
#[command(name = "ferry", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (JSON).
    #[arg(long, env = "FERRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Plugin whose commands are registered.
    #[arg(long, env = "FERRY_PLUGIN", default_value = "sample")]
    pub plugin: String,

    /// Use the secondary channel instead of the primary one.
    #[arg(long, global = true)]
    pub secondary: bool,

    /// Keep queues in process memory instead of Redis.
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "FERRY_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show queue lengths of both channels.
    Length,

    /// Print messages of one queue without removing them.
    Peek {
        #[arg(long, value_enum, default_value_t = QueueArg::Pending)]
        queue: QueueArg,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,

        #[arg(long, default_value_t = 9, allow_negative_numbers = true)]
        stop: i64,
    },

    /// Consume up to COUNT messages, then exit.
    Consume {
        #[arg(long, default_value_t = 1)]
        count: u64,
    },

    /// Run consumers until interrupted.
    Work {
        /// Number of consumers (defaults to the settings file).
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Move failed messages back to pending.
    RepublishFailed {
        /// Move every failed message instead of one.
        #[arg(long)]
        all: bool,
    },

    /// Delete one queue, or all three.
    Clear {
        #[arg(long, value_enum)]
        queue: ClearTarget,
    },

    /// Publish a plugin command.
    Enqueue(EnqueueArgs),

    /// Run a plugin command in this process, bypassing the queue.
    Run(CommandArgs),

    /// List the plugin's commands and lambdas.
    List,
}

#[derive(Debug, Args)]
pub struct CommandArgs {
    /// Plugin command name (see `ferry list`).
    #[arg(required_unless_present = "lambda", conflicts_with = "lambda")]
    pub name: Option<String>,

    /// Command arguments as a JSON object.
    #[arg(long)]
    pub args: Option<String>,

    /// Registered lambda name instead of a command.
    #[arg(long)]
    pub lambda: Option<String>,
}

#[derive(Debug, Args)]
pub struct EnqueueArgs {
    #[command(flatten)]
    pub command: CommandArgs,

    #[arg(long)]
    pub ping_before: Option<String>,

    #[arg(long)]
    pub ping_after: Option<String>,

    #[arg(long)]
    pub write_output_to: Option<PathBuf>,

    #[arg(long)]
    pub append_output_to: Option<PathBuf>,

    /// Repeatable.
    #[arg(long)]
    pub email_output_to: Vec<String>,

    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueArg {
    Pending,
    InProgress,
    Failed,
}

impl From<QueueArg> for QueueKind {
    fn from(q: QueueArg) -> Self {
        match q {
            QueueArg::Pending => QueueKind::Pending,
            QueueArg::InProgress => QueueKind::InProgress,
            QueueArg::Failed => QueueKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    Pending,
    InProgress,
    Failed,
    All,
}
