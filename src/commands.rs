use crate::app::AppState;
use crate::config::Config;
use crate::filter::FilterSelector;
use crate::model::{Category, TaskError};
use crate::storage::{
    default_config_path, init_project_store, locate_store, BlobStore, FileBlobStore,
    StoreLocation,
};
use crate::store::{StoreError, StoreResult, TaskStore};
use crate::ui;
use crate::view::render;
use anyhow::{anyhow, Result};
use std::env;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Resolved configuration and store location for one invocation.
pub struct Session {
    pub config: Config,
    pub location: StoreLocation,
}

impl Session {
    pub fn open(config: Config, store: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir()?;
        let explicit = store.or(config.storage_dir.as_deref());
        let location = locate_store(&cwd, explicit)?;
        Ok(Session { config, location })
    }

    pub fn load_store(&self) -> TaskStore<FileBlobStore> {
        TaskStore::load(
            self.location.blob_store(),
            &self.config.storage_key,
            self.config.categories(),
        )
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p),
        None => Config::load(&default_config_path()?),
    }
}

pub fn init(config: &Config, out: &mut impl Write) -> Result<()> {
    let location = init_project_store()?;
    let blob = location.blob_store();
    if blob.get(&config.storage_key)?.is_none() {
        TaskStore::load(blob, &config.storage_key, config.categories()).save()?;
    }
    writeln!(out, "Initialized task list at {}", location.dir.display())?;
    Ok(())
}

pub fn list(session: &Session, filter: Option<String>, out: &mut impl Write) -> Result<()> {
    let store = open_store(session, out)?;
    let filter = match filter {
        Some(raw) => FilterSelector::parse(&raw, store.categories())?,
        None => FilterSelector::All,
    };
    let rendered = render(store.tasks(), &filter);
    writeln!(
        out,
        "Tasks ({}, filter {})",
        session.location.scope.label(),
        rendered.filter
    )?;
    if rendered.rows.is_empty() {
        writeln!(out, "  (no tasks)")?;
    }
    for row in &rendered.rows {
        writeln!(
            out,
            "{:>3}. {} {}",
            row.original_index + 1,
            row.marker(),
            row.label
        )?;
    }
    writeln!(out, "Progress: {}", rendered.progress)?;
    Ok(())
}

pub fn add(
    session: &Session,
    text: String,
    category: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let mut store = open_store(session, out)?;
    let category = match category {
        Some(name) => find_category(store.categories(), &name)?,
        None => session.config.default_category(),
    };
    match report(out, store.add(&text, category))? {
        Some(Some(_)) => {
            let task = store
                .get(store.len() - 1)
                .ok_or_else(|| anyhow!("added task missing from list"))?;
            writeln!(out, "Added task {}: {}", store.len(), task.text)?;
        }
        Some(None) => writeln!(out, "Nothing changed: task text is empty")?,
        None => {}
    }
    Ok(())
}

pub fn toggle(session: &Session, number: usize, out: &mut impl Write) -> Result<()> {
    let mut store = open_store(session, out)?;
    if let Some(completed) = report(out, store.toggle(number - 1))? {
        let verb = if completed { "Completed" } else { "Reopened" };
        writeln!(out, "{} task {}", verb, number)?;
    }
    Ok(())
}

pub fn edit(session: &Session, number: usize, text: String, out: &mut impl Write) -> Result<()> {
    let mut store = open_store(session, out)?;
    match report(out, store.edit(number - 1, Some(&text)))? {
        Some(true) => writeln!(out, "Updated task {}", number)?,
        Some(false) => writeln!(out, "Nothing changed: task text is empty")?,
        None => {}
    }
    Ok(())
}

pub fn delete(session: &Session, number: usize, out: &mut impl Write) -> Result<()> {
    let mut store = open_store(session, out)?;
    if let Some(task) = report(out, store.remove(number - 1))? {
        writeln!(out, "Deleted task {}: {}", number, task.text)?;
    }
    Ok(())
}

pub fn move_task(session: &Session, from: usize, to: usize, out: &mut impl Write) -> Result<()> {
    let mut store = open_store(session, out)?;
    if report(out, store.move_task(from - 1, to - 1))?.is_some() {
        writeln!(out, "Moved task {} to position {}", from, to)?;
    }
    Ok(())
}

pub fn progress(session: &Session, out: &mut impl Write) -> Result<()> {
    let store = open_store(session, out)?;
    writeln!(out, "{}", render(store.tasks(), &FilterSelector::All).progress)?;
    Ok(())
}

pub fn tui(session: Session) -> Result<()> {
    let state = AppState::new(session.load_store());
    ui::run(state, session.location)
}

/// Loads the store, warning when saved data had to be ignored.
fn open_store(session: &Session, out: &mut impl Write) -> Result<TaskStore<FileBlobStore>> {
    let store = session.load_store();
    if let Some(reason) = store.discarded() {
        writeln!(
            out,
            "Warning: ignoring saved tasks in {} ({}); the next change overwrites them",
            session.location.dir.display(),
            reason
        )?;
    }
    Ok(store)
}

fn find_category(categories: &[Category], name: &str) -> Result<Category> {
    categories
        .iter()
        .find(|c| c.as_str() == name)
        .cloned()
        .ok_or_else(|| {
            let known = categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("unknown category {} (expected one of: {})", name, known)
        })
}

/// Prints recoverable domain errors and turns them into `None`.
fn report<T>(out: &mut impl Write, result: StoreResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::Task(err)) => {
            debug!("ignoring command: {}", err);
            match err {
                TaskError::IndexOutOfRange { index, len } => writeln!(
                    out,
                    "Nothing changed: there is no task {} ({} tasks)",
                    index + 1,
                    len
                )?,
                other => writeln!(out, "Nothing changed: {}", other)?,
            }
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
