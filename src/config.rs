use crate::model::Category;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const RESERVED: [&str; 3] = ["all", "incomplete", "completed"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Allowed task categories, in display order.
    pub categories: Vec<String>,
    /// Where the task blob lives; falls back to project/global discovery.
    pub storage_dir: Option<PathBuf>,
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            categories: vec!["Work".into(), "Personal".into(), "Urgent".into()],
            storage_dir: None,
            storage_key: "tasks".into(),
        }
    }
}

impl Config {
    /// Reads `path`, using defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let config: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            bail!("config must list at least one category");
        }
        let mut seen = HashSet::new();
        for name in &self.categories {
            if name.trim().is_empty() || name.trim() != name {
                bail!("invalid category name {:?}", name);
            }
            if RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
                bail!("category name {:?} is reserved for filters", name);
            }
            if !seen.insert(name.as_str()) {
                bail!("duplicate category {:?}", name);
            }
        }
        if self.storage_key.trim().is_empty()
            || self
                .storage_key
                .contains(|c: char| c == '/' || c == '\\')
        {
            bail!("invalid storage key {:?}", self.storage_key);
        }
        Ok(())
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.iter().map(Category::new).collect()
    }

    pub fn default_category(&self) -> Category {
        Category::new(self.categories.first().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.yml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_category(), Category::new("Work"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "categories: [Home, Errands]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.categories(),
            vec![Category::new("Home"), Category::new("Errands")]
        );
        assert_eq!(config.storage_key, "tasks");
        assert_eq!(config.storage_dir, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "categories: {oops").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn rejects_bad_categories() {
        let with = |categories: &[&str]| Config {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..Config::default()
        };
        assert!(with(&[]).validate().is_err());
        assert!(with(&["Work", "Work"]).validate().is_err());
        assert!(with(&["All"]).validate().is_err());
        assert!(with(&[" Work"]).validate().is_err());
        assert!(with(&["Work", "work"]).validate().is_ok());
    }
}
