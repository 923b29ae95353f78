use crate::filter::FilterSelector;
use crate::model::{Category, TaskError, TaskId};
use crate::reorder::{ReorderController, RowSpan};
use crate::storage::BlobStore;
use crate::store::{StoreError, StoreResult, TaskStore};
use crate::view::{render, RenderedList, RowAction};
use anyhow::Result;
use tracing::debug;

/// Application state behind the user-facing commands. Rendering is a pure
/// function of the store, the current filter and any drag preview.
pub struct AppState<B: BlobStore> {
    store: TaskStore<B>,
    filter: FilterSelector,
    reorder: ReorderController,
}

impl<B: BlobStore> AppState<B> {
    pub fn new(store: TaskStore<B>) -> Self {
        AppState {
            store,
            filter: FilterSelector::All,
            reorder: ReorderController::new(),
        }
    }

    pub fn store(&self) -> &TaskStore<B> {
        &self.store
    }

    pub fn filter(&self) -> &FilterSelector {
        &self.filter
    }

    pub fn reorder(&self) -> &ReorderController {
        &self.reorder
    }

    pub fn categories(&self) -> &[Category] {
        self.store.categories()
    }

    pub fn render(&self) -> RenderedList {
        let mut rendered = render(self.store.tasks(), &self.filter);
        rendered.rows = self.reorder.preview(rendered.rows);
        rendered
    }

    pub fn add_task(&mut self, text: &str, category: Category) -> Result<Option<TaskId>> {
        let added = recover(self.store.add(text, category))?.flatten();
        if added.is_some() {
            self.reorder.reset();
        }
        Ok(added)
    }

    pub fn toggle(&mut self, id: &TaskId) -> Result<bool> {
        let Some(index) = self.resolve(id) else {
            return Ok(false);
        };
        let changed = recover(self.store.toggle(index))?.is_some();
        self.reorder.reset();
        Ok(changed)
    }

    /// `None` cancels the edit.
    pub fn edit(&mut self, id: &TaskId, new_text: Option<&str>) -> Result<bool> {
        let Some(index) = self.resolve(id) else {
            return Ok(false);
        };
        Ok(recover(self.store.edit(index, new_text))?.unwrap_or(false))
    }

    pub fn delete(&mut self, id: &TaskId) -> Result<bool> {
        let Some(index) = self.resolve(id) else {
            return Ok(false);
        };
        let removed = recover(self.store.remove(index))?.is_some();
        self.reorder.reset();
        Ok(removed)
    }

    /// Runs a row affordance. `Edit` needs the replacement text.
    pub fn apply(&mut self, id: &TaskId, action: RowAction, text: Option<&str>) -> Result<bool> {
        match action {
            RowAction::Toggle => self.toggle(id),
            RowAction::Edit => self.edit(id, text),
            RowAction::Delete => self.delete(id),
        }
    }

    pub fn set_filter(&mut self, selector: FilterSelector) {
        if self.filter != selector {
            debug!(filter = %selector, "filter changed");
        }
        self.filter = selector;
        self.reorder.reset();
    }

    /// Pointer down on rendered row `row`; becomes a drag on first movement.
    pub fn press_row(&mut self, row: usize) -> bool {
        let rows = self.render().row_ids();
        self.reorder.press(row, &rows)
    }

    pub fn begin_drag(&mut self, row: usize) -> bool {
        let rows = self.render().row_ids();
        self.reorder.begin(row, &rows)
    }

    pub fn drag_over(&mut self, y: f32, spans: &[RowSpan]) -> Option<usize> {
        self.reorder.drag_over_pointer(y, spans)
    }

    pub fn drag_to(&mut self, position: usize) -> Option<usize> {
        self.reorder.drag_to(position)
    }

    pub fn dragged_position(&self) -> Option<usize> {
        self.reorder.dragged_position()
    }

    /// Releases the pointer, committing the previewed position.
    pub fn drop(&mut self) -> Result<bool> {
        let Some(plan) = self.reorder.release() else {
            return Ok(false);
        };
        let (from, to) = match plan.resolve(self.store.list()) {
            Ok(indexes) => indexes,
            Err(err) => {
                debug!("ignoring drop: {}", err);
                return Ok(false);
            }
        };
        if from == to {
            return Ok(false);
        }
        Ok(recover(self.store.move_task(from, to))?.is_some())
    }

    fn resolve(&self, id: &TaskId) -> Option<usize> {
        let index = self.store.index_of(id);
        if index.is_none() {
            debug!(id = %id, "ignoring command for stale task");
        }
        index
    }
}

/// Domain errors become logged no-ops; storage failures propagate.
fn recover<T>(result: StoreResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::Task(err)) => {
            log_ignored(&err);
            Ok(None)
        }
        Err(err @ StoreError::Save(_)) => Err(err.into()),
    }
}

fn log_ignored(err: &TaskError) {
    debug!("ignoring command: {}", err);
}
