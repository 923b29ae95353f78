use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tasklist", version, about = "Terminal task list with filters and drag-to-reorder")]
pub struct Cli {
    /// Directory holding the task blob (overrides config and discovery)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Path to config.yml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project task list in the current directory
    Init,
    /// List tasks
    List {
        /// all, incomplete, completed, or a category name
        #[arg(long, short = 'f')]
        filter: Option<String>,
    },
    /// Add a new task
    Add {
        /// Task text
        text: String,
        /// Category (defaults to the first configured one)
        #[arg(long, short = 'c')]
        category: Option<String>,
    },
    /// Flip a task between complete and incomplete
    Toggle {
        /// 1-based task number as shown by `list`
        #[arg(value_parser = task_number)]
        number: usize,
    },
    /// Replace the text of a task
    Edit {
        /// 1-based task number
        #[arg(value_parser = task_number)]
        number: usize,
        /// New text
        text: String,
    },
    /// Delete a task
    Delete {
        /// 1-based task number
        #[arg(value_parser = task_number)]
        number: usize,
    },
    /// Move a task to another position
    Move {
        /// 1-based number of the task to move
        #[arg(value_parser = task_number)]
        from: usize,
        /// 1-based position it should end up at
        #[arg(value_parser = task_number)]
        to: usize,
    },
    /// Print completion progress
    Progress,
    /// Launch the interactive TUI
    Tui,
}

fn task_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a task number starting at 1, got {:?}", raw)),
    }
}
