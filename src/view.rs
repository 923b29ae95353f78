use crate::filter::{visible_tasks, FilterSelector};
use crate::model::{Accent, Task, TaskId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Toggle,
    Edit,
    Delete,
}

impl RowAction {
    pub const ALL: [RowAction; 3] = [RowAction::Toggle, RowAction::Edit, RowAction::Delete];

    pub fn label(self, completed: bool) -> &'static str {
        match self {
            RowAction::Toggle if completed => "Undo",
            RowAction::Toggle => "Complete",
            RowAction::Edit => "Edit",
            RowAction::Delete => "Delete",
        }
    }
}

/// One displayed task. Actions are bound to `id`; `original_index` is the
/// task's position in the unfiltered collection at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: TaskId,
    pub original_index: usize,
    pub label: String,
    pub completed: bool,
    pub accent: Accent,
}

impl RowView {
    fn from_task(index: usize, task: &Task) -> Self {
        RowView {
            id: task.id.clone(),
            original_index: index,
            label: format!("{} ({})", task.text, task.category),
            completed: task.completed,
            accent: task.accent,
        }
    }

    pub fn marker(&self) -> &'static str {
        if self.completed {
            "[x]"
        } else {
            "[ ]"
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = (RowAction, &'static str)> + '_ {
        RowAction::ALL
            .into_iter()
            .map(move |action| (action, action.label(self.completed)))
    }
}

/// Completion over the whole collection, independent of the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(tasks: &[Task]) -> Self {
        Progress {
            completed: tasks.iter().filter(|t| t.completed).count(),
            total: tasks.len(),
        }
    }

    /// Exact fraction in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u32 {
        (self.ratio() * 100.0).round() as u32
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% ({}/{})", self.percent(), self.completed, self.total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedList {
    pub filter: FilterSelector,
    pub rows: Vec<RowView>,
    pub progress: Progress,
}

impl RenderedList {
    pub fn position_of(&self, id: &TaskId) -> Option<usize> {
        self.rows.iter().position(|r| &r.id == id)
    }

    pub fn row_ids(&self) -> Vec<TaskId> {
        self.rows.iter().map(|r| r.id.clone()).collect()
    }
}

pub fn render(tasks: &[Task], filter: &FilterSelector) -> RenderedList {
    let rows = visible_tasks(tasks, filter)
        .into_iter()
        .map(|visible| RowView::from_task(visible.index, visible.task))
        .collect();
    RenderedList {
        filter: filter.clone(),
        rows,
        progress: Progress::of(tasks),
    }
}
