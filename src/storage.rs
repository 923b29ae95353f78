use crate::model::{normalize_text, Category, Task};
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const PROJECT_DIR: &str = ".tasklist";

/// Key-value blob persistence boundary.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Keeps each key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileBlobStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {:?}", path)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryBlobStore {
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = MemoryBlobStore::default();
        store.values.insert(key.to_string(), value.to_string());
        store
    }
}

#[cfg(test)]
impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// On-disk shape of a task: `{text, completed, category}`.
#[derive(Debug, Serialize, Deserialize)]
struct TaskRecord {
    text: String,
    completed: bool,
    category: Category,
}

pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    let records = tasks
        .iter()
        .map(|t| TaskRecord {
            text: t.text.clone(),
            completed: t.completed,
            category: t.category.clone(),
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&records).context("serializing tasks")
}

/// Parses a stored blob, rejecting blank texts and unconfigured categories.
pub fn decode_tasks(raw: &str, categories: &[Category]) -> Result<Vec<Task>> {
    let records: Vec<TaskRecord> = serde_json::from_str(raw).context("parsing task blob")?;
    let mut tasks = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let Some(text) = normalize_text(&record.text) else {
            bail!("task {} has empty text", idx);
        };
        if !categories.contains(&record.category) {
            bail!("task {} has unknown category {:?}", idx, record.category.as_str());
        }
        tasks.push(Task::new(text, record.completed, record.category));
    }
    Ok(tasks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Explicit,
    Project,
    Global,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Explicit => "explicit",
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

impl StoreLocation {
    pub fn blob_store(&self) -> FileBlobStore {
        FileBlobStore::new(&self.dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join("tasklist.log")
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {} directory", PROJECT_DIR))?;
    Ok(StoreLocation {
        dir,
        scope: StoreScope::Project,
    })
}

/// Picks the explicit directory, else the nearest `.tasklist` above `start`,
/// else the per-user data directory.
pub fn locate_store(start: &Path, explicit: Option<&Path>) -> Result<StoreLocation> {
    if let Some(dir) = explicit {
        return Ok(StoreLocation {
            dir: dir.to_path_buf(),
            scope: StoreScope::Explicit,
        });
    }
    if let Some(dir) = find_project_dir(start) {
        return Ok(StoreLocation {
            dir,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        dir: global_data_dir()?,
        scope: StoreScope::Global,
    })
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.yml"))
}

fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "tasklist").context("locating data directory")
}
