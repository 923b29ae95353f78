use crate::model::{normalize_text, Category, Task, TaskError, TaskId, TaskList};
use crate::storage::{decode_tasks, encode_tasks, BlobStore};
use tracing::{debug, info, warn};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("saving tasks: {0:#}")]
    Save(anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered task collection with write-through persistence. A mutation only
/// becomes visible in memory once the blob holding it has been written.
pub struct TaskStore<B: BlobStore> {
    list: TaskList,
    blob: B,
    key: String,
    categories: Vec<Category>,
    discarded: Option<String>,
}

impl<B: BlobStore> TaskStore<B> {
    /// Reads the saved collection. Missing, unreadable or malformed data
    /// yields an empty collection; see [`TaskStore::discarded`].
    pub fn load(blob: B, key: impl Into<String>, categories: Vec<Category>) -> Self {
        let key = key.into();
        let mut discarded = None;
        let tasks = match blob.get(&key) {
            Ok(Some(raw)) => match decode_tasks(&raw, &categories) {
                Ok(tasks) => {
                    info!(count = tasks.len(), key = %key, "loaded tasks");
                    tasks
                }
                Err(err) => {
                    warn!(
                        key = %key,
                        "ignoring saved tasks, the next change overwrites them: {:#}",
                        err
                    );
                    discarded = Some(format!("{:#}", err));
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!(key = %key, "no saved tasks");
                Vec::new()
            }
            Err(err) => {
                warn!(key = %key, "could not read saved tasks: {:#}", err);
                discarded = Some(format!("{:#}", err));
                Vec::new()
            }
        };
        TaskStore {
            list: TaskList::from_tasks(tasks),
            blob,
            key,
            categories,
            discarded,
        }
    }

    pub fn list(&self) -> &TaskList {
        &self.list
    }

    pub fn tasks(&self) -> &[Task] {
        self.list.tasks()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.list.get(index)
    }

    pub fn index_of(&self, id: &TaskId) -> Option<usize> {
        self.list.index_of(id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Why saved data was ignored at load, if it was.
    pub fn discarded(&self) -> Option<&str> {
        self.discarded.as_deref()
    }

    #[cfg(test)]
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Appends a task. Blank text is ignored and yields `None`.
    pub fn add(&mut self, text: &str, category: Category) -> StoreResult<Option<TaskId>> {
        if !self.categories.contains(&category) {
            return Err(TaskError::UnknownCategory(category.as_str().to_string()).into());
        }
        let Some(text) = normalize_text(text) else {
            debug!("ignoring task with blank text");
            return Ok(None);
        };
        let task = Task::new(text, false, category);
        let id = task.id.clone();
        self.commit(|list| {
            list.push(task);
            Ok(())
        })?;
        Ok(Some(id))
    }

    /// Returns the new completion state.
    pub fn toggle(&mut self, index: usize) -> StoreResult<bool> {
        self.commit(|list| list.toggle(index))
    }

    /// `None` is a cancelled edit. Returns whether the text changed.
    pub fn edit(&mut self, index: usize, new_text: Option<&str>) -> StoreResult<bool> {
        if index >= self.list.len() {
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.list.len(),
            }
            .into());
        }
        let Some(raw) = new_text else {
            debug!(index, "edit cancelled");
            return Ok(false);
        };
        let Some(text) = normalize_text(raw) else {
            debug!(index, "ignoring blank edit");
            return Ok(false);
        };
        self.commit(|list| list.set_text(index, text))?;
        Ok(true)
    }

    pub fn remove(&mut self, index: usize) -> StoreResult<Task> {
        self.commit(|list| list.remove(index))
    }

    pub fn move_task(&mut self, from: usize, to: usize) -> StoreResult<()> {
        self.commit(|list| list.move_task(from, to))
    }

    /// Applies `change` to a copy of the list, writes the copy, and only then
    /// replaces the in-memory list.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut TaskList) -> Result<T, TaskError>,
    ) -> StoreResult<T> {
        let mut next = self.list.clone();
        let value = change(&mut next)?;
        write_tasks(&mut self.blob, &self.key, &next)?;
        self.list = next;
        self.discarded = None;
        Ok(value)
    }

    /// Writes the current collection as is.
    pub fn save(&mut self) -> StoreResult<()> {
        write_tasks(&mut self.blob, &self.key, &self.list)?;
        self.discarded = None;
        Ok(())
    }
}

fn write_tasks<B: BlobStore>(blob: &mut B, key: &str, list: &TaskList) -> StoreResult<()> {
    let encoded = encode_tasks(list.tasks()).map_err(StoreError::Save)?;
    blob.set(key, &encoded).map_err(StoreError::Save)?;
    debug!(count = list.len(), key = %key, "saved tasks");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileBlobStore, MemoryBlobStore};
    use std::cell::Cell;
    use std::rc::Rc;

    const KEY: &str = "tasks";

    fn categories() -> Vec<Category> {
        ["Work", "Personal", "Urgent"]
            .into_iter()
            .map(Category::new)
            .collect()
    }

    fn empty_store() -> TaskStore<MemoryBlobStore> {
        TaskStore::load(MemoryBlobStore::default(), KEY, categories())
    }

    fn reload(store: &TaskStore<MemoryBlobStore>) -> TaskStore<MemoryBlobStore> {
        TaskStore::load(store.blob().clone(), KEY, categories())
    }

    fn texts<B: BlobStore>(store: &TaskStore<B>) -> Vec<&str> {
        store.tasks().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn blank_add_never_changes_length() {
        let mut store = empty_store();
        for text in ["", "   ", "\t\n"] {
            assert_eq!(store.add(text, Category::new("Work")).unwrap(), None);
        }
        assert!(store.is_empty());
        assert_eq!(store.blob().get(KEY).unwrap(), None);
    }

    #[test]
    fn add_trims_and_appends() {
        let mut store = empty_store();
        store.add("first", Category::new("Work")).unwrap();
        let id = store.add("  second  ", Category::new("Urgent")).unwrap();
        assert_eq!(texts(&store), vec!["first", "second"]);
        assert_eq!(store.index_of(&id.unwrap()), Some(1));
        assert!(!store.get(1).unwrap().completed);
    }

    #[test]
    fn add_rejects_unconfigured_category() {
        let mut store = empty_store();
        let err = store.add("x", Category::new("Chores")).unwrap_err();
        assert!(matches!(err, StoreError::Task(TaskError::UnknownCategory(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let mut store = empty_store();
        store.add("a", Category::new("Work")).unwrap();
        store.add("b", Category::new("Personal")).unwrap();
        store.add("c", Category::new("Urgent")).unwrap();
        assert_eq!(reload(&store).len(), 3);

        store.toggle(1).unwrap();
        assert!(reload(&store).get(1).unwrap().completed);

        store.edit(0, Some(" A ")).unwrap();
        assert_eq!(reload(&store).get(0).unwrap().text, "A");

        store.move_task(0, 2).unwrap();
        assert_eq!(texts(&reload(&store)), vec!["b", "c", "A"]);

        store.remove(1).unwrap();
        assert_eq!(texts(&reload(&store)), vec!["b", "A"]);
    }

    #[test]
    fn save_load_round_trip() {
        let mut store = empty_store();
        store.add("Buy milk", Category::new("Personal")).unwrap();
        store.add("Finish report", Category::new("Work")).unwrap();
        store.add("Call plumber", Category::new("Urgent")).unwrap();
        store.toggle(2).unwrap();
        let restored = reload(&store);
        assert_eq!(restored.len(), store.len());
        for (a, b) in store.tasks().iter().zip(restored.tasks()) {
            assert!(a.same_content(b));
        }
    }

    #[test]
    fn cancelled_or_blank_edit_leaves_state() {
        let mut store = empty_store();
        store.add("keep", Category::new("Work")).unwrap();
        assert!(!store.edit(0, None).unwrap());
        assert!(!store.edit(0, Some("   ")).unwrap());
        assert_eq!(texts(&store), vec!["keep"]);
    }

    #[test]
    fn out_of_range_reports_task_error() {
        let mut store = empty_store();
        store.add("only", Category::new("Work")).unwrap();
        for err in [
            store.toggle(1).unwrap_err(),
            store.edit(4, Some("x")).unwrap_err(),
            store.remove(1).map(|_| ()).unwrap_err(),
            store.move_task(0, 1).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                StoreError::Task(TaskError::IndexOutOfRange { len: 1, .. })
            ));
        }
        assert_eq!(texts(&store), vec!["only"]);
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let blob = MemoryBlobStore::with_value(KEY, "{ not json");
        let store = TaskStore::load(blob, KEY, categories());
        assert!(store.is_empty());
    }

    #[test]
    fn unconfigured_category_in_blob_loads_empty() {
        let raw = r#"[{"text":"a","completed":false,"category":"Chores"}]"#;
        let store = TaskStore::load(MemoryBlobStore::with_value(KEY, raw), KEY, categories());
        assert!(store.is_empty());
    }

    #[test]
    fn file_backed_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TaskStore::load(FileBlobStore::new(dir.path()), KEY, categories());
        store.add("persisted", Category::new("Work")).unwrap();
        store.toggle(0).unwrap();

        let store = TaskStore::load(FileBlobStore::new(dir.path()), KEY, categories());
        assert_eq!(texts(&store), vec!["persisted"]);
        assert!(store.get(0).unwrap().completed);
    }

    struct FailingBlob;

    impl BlobStore for FailingBlob {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("permission denied")
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn write_failure_surfaces_as_save_error() {
        let mut store = TaskStore::load(FailingBlob, KEY, categories());
        let err = store.add("x", Category::new("Work")).unwrap_err();
        assert!(matches!(err, StoreError::Save(_)));
        assert!(err.to_string().contains("disk full"));
        assert!(store.is_empty());
    }

    #[test]
    fn read_failure_loads_empty() {
        let store = TaskStore::load(FailingBlob, KEY, categories());
        assert!(store.is_empty());
        assert!(store.discarded().unwrap().contains("permission denied"));
    }

    /// Memory blob whose writes start failing once `broken` is set.
    #[derive(Clone, Default)]
    struct BreakableBlob {
        inner: MemoryBlobStore,
        broken: Rc<Cell<bool>>,
    }

    impl BlobStore for BreakableBlob {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.broken.get() {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_save_leaves_memory_matching_blob() {
        let blob = BreakableBlob::default();
        let broken = blob.broken.clone();
        let mut store = TaskStore::load(blob, KEY, categories());
        store.add("a", Category::new("Work")).unwrap();
        store.add("b", Category::new("Personal")).unwrap();
        broken.set(true);

        assert!(matches!(store.toggle(0), Err(StoreError::Save(_))));
        assert!(matches!(store.edit(0, Some("changed")), Err(StoreError::Save(_))));
        assert!(matches!(store.remove(1), Err(StoreError::Save(_))));
        assert!(matches!(store.move_task(0, 1), Err(StoreError::Save(_))));
        assert!(matches!(
            store.add("c", Category::new("Work")),
            Err(StoreError::Save(_))
        ));

        let persisted = TaskStore::load(store.blob().inner.clone(), KEY, categories());
        assert_eq!(texts(&store), vec!["a", "b"]);
        assert_eq!(texts(&persisted), texts(&store));
        for (memory, saved) in store.tasks().iter().zip(persisted.tasks()) {
            assert!(memory.same_content(saved));
        }

        broken.set(false);
        assert!(store.toggle(0).unwrap());
        let persisted = TaskStore::load(store.blob().inner.clone(), KEY, categories());
        assert!(persisted.get(0).unwrap().completed);
    }

    #[test]
    fn unconfigured_category_is_reported_until_overwritten() {
        let raw = r#"[{"text":"a","completed":false,"category":"Chores"}]"#;
        let mut store = TaskStore::load(MemoryBlobStore::with_value(KEY, raw), KEY, categories());
        assert!(store.discarded().unwrap().contains("Chores"));
        store.add("b", Category::new("Work")).unwrap();
        assert_eq!(store.discarded(), None);
    }
}
