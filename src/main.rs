mod app;
mod cli;
mod commands;
mod config;
mod filter;
mod model;
mod reorder;
mod storage;
mod store;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;
use std::fs::{self, File, OpenOptions};
use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let config = commands::load_config(args.config.as_deref())?;
    if let cli::Command::Init = command {
        install_tracing(None);
        return commands::init(&config, &mut stdout());
    }
    let session = commands::Session::open(config, args.store.as_deref())?;
    if let cli::Command::Tui = command {
        install_tracing(Some(&session.location.log_path()));
        return commands::tui(session);
    }
    install_tracing(None);
    let out = &mut stdout();
    match command {
        cli::Command::List { filter } => commands::list(&session, filter, out),
        cli::Command::Add { text, category } => commands::add(&session, text, category, out),
        cli::Command::Toggle { number } => commands::toggle(&session, number, out),
        cli::Command::Edit { number, text } => commands::edit(&session, number, text, out),
        cli::Command::Delete { number } => commands::delete(&session, number, out),
        cli::Command::Move { from, to } => commands::move_task(&session, from, to, out),
        cli::Command::Progress => commands::progress(&session, out),
        cli::Command::Init | cli::Command::Tui => Ok(()),
    }
}

enum LogTarget {
    Stderr,
    File(File),
    /// The TUI owns the terminal, so logs are dropped when the file is unusable.
    Discard,
}

fn log_target(log_file: Option<&Path>) -> LogTarget {
    let Some(path) = log_file else {
        return LogTarget::Stderr;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return LogTarget::Discard;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => LogTarget::File(file),
        Err(_) => LogTarget::Discard,
    }
}

/// `RUST_LOG` overrides the default level. The TUI logs to a file so output
/// never lands on the alternate screen.
fn install_tracing(log_file: Option<&Path>) {
    let default_level = if log_file.is_some() { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    let _ = match log_target(log_file) {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        LogTarget::Discard => builder.with_writer(std::io::sink).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_commands_log_to_stderr() {
        assert!(matches!(log_target(None), LogTarget::Stderr));
    }

    #[test]
    fn tui_logs_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("tasklist.log");
        assert!(matches!(log_target(Some(&path)), LogTarget::File(_)));
        assert!(path.exists());
    }

    #[test]
    fn unusable_log_file_never_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("tasklist.log");
        assert!(matches!(log_target(Some(&path)), LogTarget::Discard));
    }
}
