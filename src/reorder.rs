//! Drag-to-reorder over the rendered (possibly filtered) list.
//!
//! The controller only ever sees rendered rows. Dropping produces a
//! [`DropPlan`] naming the dragged task and its new rendered neighbours, which
//! is resolved against the full collection so a drop inside a filtered view
//! lands next to the same neighbours in the unfiltered order.

use crate::model::{TaskError, TaskId, TaskList};
use crate::view::RowView;

/// Vertical extent of a rendered row, in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSpan {
    pub top: f32,
    pub height: f32,
}

impl RowSpan {
    pub fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down on a row but has not moved yet.
    Pressed { row: usize, rows: Vec<TaskId> },
    /// `order` is the live preview of the rendered rows.
    Dragging {
        task: TaskId,
        origin: usize,
        order: Vec<TaskId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub task: TaskId,
    /// Rendered row directly above the drop position.
    pub after: Option<TaskId>,
    /// Rendered row directly below the drop position.
    pub before: Option<TaskId>,
}

impl DropPlan {
    /// Translates the drop into `(from, to)` for [`TaskList::move_task`].
    pub fn resolve(&self, list: &TaskList) -> Result<(usize, usize), TaskError> {
        let position = |id: &TaskId| {
            list.index_of(id)
                .ok_or_else(|| TaskError::TaskNotFound(id.clone()))
        };
        let from = position(&self.task)?;
        // Indexes of the neighbours once the dragged task has been taken out.
        let shifted = |idx: usize| if idx > from { idx - 1 } else { idx };
        let to = match (&self.before, &self.after) {
            (Some(next), _) => shifted(position(next)?),
            (None, Some(prev)) => shifted(position(prev)?) + 1,
            (None, None) => from,
        };
        Ok((from, to))
    }
}

#[derive(Debug, Default)]
pub struct ReorderController {
    state: DragState,
}

impl ReorderController {
    pub fn new() -> Self {
        ReorderController::default()
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Dragging { task, .. } => Some(task),
            _ => None,
        }
    }

    /// Current preview position of the dragged row.
    pub fn dragged_position(&self) -> Option<usize> {
        match &self.state {
            DragState::Dragging { task, order, .. } => order.iter().position(|id| id == task),
            _ => None,
        }
    }

    /// Pointer went down on rendered row `row`. Ignored unless idle.
    pub fn press(&mut self, row: usize, rows: &[TaskId]) -> bool {
        if !self.is_idle() || row >= rows.len() {
            return false;
        }
        self.state = DragState::Pressed {
            row,
            rows: rows.to_vec(),
        };
        true
    }

    /// Starts dragging rendered row `row` without a preceding press.
    pub fn begin(&mut self, row: usize, rows: &[TaskId]) -> bool {
        if !self.is_idle() || row >= rows.len() {
            return false;
        }
        self.state = DragState::Dragging {
            task: rows[row].clone(),
            origin: row,
            order: rows.to_vec(),
        };
        true
    }

    /// Moves the dragged row in front of the first other row whose midpoint
    /// lies below `y`, or to the end when there is none. `spans` follows the
    /// current preview order. A pending press turns into a drag here.
    pub fn drag_over_pointer(&mut self, y: f32, spans: &[RowSpan]) -> Option<usize> {
        self.promote_press();
        let DragState::Dragging { task, order, .. } = &self.state else {
            return None;
        };
        let mut target = 0;
        let mut found = false;
        for (id, span) in order.iter().zip(spans) {
            if id == task {
                continue;
            }
            if span.midpoint() > y {
                found = true;
                break;
            }
            target += 1;
        }
        if !found {
            target = order.len() - 1;
        }
        self.drag_to(target)
    }

    /// Moves the dragged row to rendered position `position` (clamped).
    pub fn drag_to(&mut self, position: usize) -> Option<usize> {
        self.promote_press();
        let DragState::Dragging { task, order, .. } = &mut self.state else {
            return None;
        };
        let current = order.iter().position(|id| id == &*task)?;
        let target = position.min(order.len() - 1);
        if current != target {
            let id = order.remove(current);
            order.insert(target, id);
        }
        Some(target)
    }

    /// Ends the gesture. A press without movement or a drag that ends where
    /// it started yields no plan.
    pub fn release(&mut self) -> Option<DropPlan> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging {
            task,
            origin,
            order,
        } = state
        else {
            return None;
        };
        let position = order.iter().position(|id| id == &task)?;
        if position == origin {
            return None;
        }
        Some(DropPlan {
            task,
            after: position.checked_sub(1).map(|p| order[p].clone()),
            before: order.get(position + 1).cloned(),
        })
    }

    /// Drops any gesture in progress without producing a plan.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }

    /// Reorders `rows` to match the live preview; outside a drag it returns
    /// them unchanged.
    pub fn preview(&self, mut rows: Vec<RowView>) -> Vec<RowView> {
        if let DragState::Dragging { order, .. } = &self.state {
            rows.sort_by_key(|row| order.iter().position(|id| id == &row.id).unwrap_or(usize::MAX));
        }
        rows
    }

    fn promote_press(&mut self) {
        if let DragState::Pressed { row, rows } = &self.state {
            let (origin, order) = (*row, rows.clone());
            self.state = DragState::Dragging {
                task: order[origin].clone(),
                origin,
                order,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSelector;
    use crate::model::{Category, Task};
    use crate::view::render;

    fn list(rows: &[(&str, &str)]) -> TaskList {
        TaskList::from_tasks(
            rows.iter()
                .map(|(text, cat)| Task::new(text.to_string(), false, Category::new(*cat)))
                .collect(),
        )
    }

    fn texts(list: &TaskList) -> Vec<&str> {
        list.tasks().iter().map(|t| t.text.as_str()).collect()
    }

    fn spans(count: usize) -> Vec<RowSpan> {
        (0..count)
            .map(|i| RowSpan {
                top: i as f32 * 10.0,
                height: 10.0,
            })
            .collect()
    }

    fn commit(list: &mut TaskList, plan: DropPlan) {
        let (from, to) = plan.resolve(list).unwrap();
        list.move_task(from, to).unwrap();
    }

    #[test]
    fn press_then_release_is_a_click() {
        let tasks = list(&[("a", "Work"), ("b", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        assert!(controller.press(0, &rows));
        assert!(!controller.is_dragging());
        assert_eq!(controller.release(), None);
        assert!(controller.is_idle());
    }

    #[test]
    fn pointer_below_midpoint_moves_row_down() {
        let mut tasks = list(&[("a", "Work"), ("b", "Work"), ("c", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        controller.press(0, &rows);
        // past b's midpoint (15) but above c's (25)
        assert_eq!(controller.drag_over_pointer(18.0, &spans(3)), Some(1));
        assert_eq!(controller.dragged_position(), Some(1));
        let plan = controller.release().unwrap();
        commit(&mut tasks, plan);
        assert_eq!(texts(&tasks), vec!["b", "a", "c"]);
    }

    #[test]
    fn pointer_below_all_rows_moves_to_end() {
        let mut tasks = list(&[("a", "Work"), ("b", "Work"), ("c", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(0, &rows);
        assert_eq!(controller.drag_over_pointer(500.0, &spans(3)), Some(2));
        commit(&mut tasks, controller.release().unwrap());
        assert_eq!(texts(&tasks), vec!["b", "c", "a"]);
    }

    #[test]
    fn pointer_above_all_rows_moves_to_front() {
        let mut tasks = list(&[("a", "Work"), ("b", "Work"), ("c", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(2, &rows);
        assert_eq!(controller.drag_over_pointer(-3.0, &spans(3)), Some(0));
        commit(&mut tasks, controller.release().unwrap());
        assert_eq!(texts(&tasks), vec!["c", "a", "b"]);
    }

    #[test]
    fn preview_does_not_touch_collection() {
        let tasks = list(&[("a", "Work"), ("b", "Work"), ("c", "Work")]);
        let rendered = render(tasks.tasks(), &FilterSelector::All);
        let mut controller = ReorderController::new();
        controller.begin(0, &rendered.row_ids());
        controller.drag_to(2);
        let preview: Vec<String> = controller
            .preview(rendered.rows.clone())
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(preview, vec!["b (Work)", "c (Work)", "a (Work)"]);
        assert_eq!(texts(&tasks), vec!["a", "b", "c"]);
    }

    #[test]
    fn drop_back_at_origin_yields_nothing() {
        let tasks = list(&[("a", "Work"), ("b", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(0, &rows);
        controller.drag_to(1);
        controller.drag_to(0);
        assert_eq!(controller.release(), None);
    }

    #[test]
    fn filtered_drop_targets_full_collection_neighbours() {
        // rendered under Work: [a, c, e]
        let mut tasks = list(&[
            ("a", "Work"),
            ("b", "Personal"),
            ("c", "Work"),
            ("d", "Personal"),
            ("e", "Work"),
        ]);
        let filter = FilterSelector::ByCategory(Category::new("Work"));
        let rows = render(tasks.tasks(), &filter).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(2, &rows);
        controller.drag_to(0);
        let plan = controller.release().unwrap();
        assert_eq!(plan.resolve(&tasks), Ok((4, 0)));
        commit(&mut tasks, plan);
        assert_eq!(texts(&tasks), vec!["e", "a", "b", "c", "d"]);
    }

    #[test]
    fn filtered_drop_to_end_lands_after_last_visible() {
        let mut tasks = list(&[
            ("a", "Work"),
            ("b", "Personal"),
            ("c", "Work"),
            ("d", "Personal"),
        ]);
        let filter = FilterSelector::ByCategory(Category::new("Work"));
        let rows = render(tasks.tasks(), &filter).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(0, &rows);
        controller.drag_to(1);
        commit(&mut tasks, controller.release().unwrap());
        assert_eq!(texts(&tasks), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn stale_plan_is_an_error() {
        let mut tasks = list(&[("a", "Work"), ("b", "Work")]);
        let rows = render(tasks.tasks(), &FilterSelector::All).row_ids();
        let mut controller = ReorderController::new();
        controller.begin(0, &rows);
        controller.drag_to(1);
        let plan = controller.release().unwrap();
        tasks.remove(1).unwrap();
        assert!(matches!(plan.resolve(&tasks), Err(TaskError::TaskNotFound(_))));
    }

    #[test]
    fn one_gesture_at_a_time() {
        let rows = vec![TaskId::generate(), TaskId::generate()];
        let mut controller = ReorderController::new();
        assert!(controller.begin(0, &rows));
        assert!(!controller.begin(1, &rows));
        assert!(!controller.press(1, &rows));
        assert!(!controller.begin(5, &[]));
        controller.reset();
        assert!(controller.is_idle());
    }
}
