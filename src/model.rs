use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime identity of a task. Never persisted; a fresh one is minted whenever
/// a task enters memory, so handlers can outlive index shifts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        TaskId(
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(8)
                .map(char::from)
                .collect(),
        )
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Light background tint for a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Accent {
    pub fn random_light() -> Self {
        let hue = rand::thread_rng().gen_range(0..360);
        Accent::from_hsl(hue as f32, 0.7, 0.8)
    }

    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let sector = (hue.rem_euclid(360.0)) / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = lightness - chroma / 2.0;
        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Accent {
            r: channel(r),
            g: channel(g),
            b: channel(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub category: Category,
    pub accent: Accent,
}

impl Task {
    pub fn new(text: String, completed: bool, category: Category) -> Self {
        Task {
            id: TaskId::generate(),
            text,
            completed,
            category,
            accent: Accent::random_light(),
        }
    }

    /// Compares the persisted fields only.
    #[cfg(test)]
    pub fn same_content(&self, other: &Task) -> bool {
        self.text == other.text
            && self.completed == other.completed
            && self.category == other.category
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task index {index} out of range for {len} tasks")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Trims `input`, returning `None` when nothing is left.
pub fn normalize_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Ordered task collection. Insertion order is display and persisted order.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskList { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn index_of(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle(&mut self, index: usize) -> Result<bool, TaskError> {
        self.ensure_index(index)?;
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn set_text(&mut self, index: usize, text: String) -> Result<(), TaskError> {
        self.ensure_index(index)?;
        self.tasks[index].text = text;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Task, TaskError> {
        self.ensure_index(index)?;
        Ok(self.tasks.remove(index))
    }

    /// Removes the task at `from` and reinserts it so it ends up at `to`.
    pub fn move_task(&mut self, from: usize, to: usize) -> Result<(), TaskError> {
        self.ensure_index(from)?;
        self.ensure_index(to)?;
        if from != to {
            let task = self.tasks.remove(from);
            self.tasks.insert(to, task);
        }
        Ok(())
    }

    fn ensure_index(&self, index: usize) -> Result<(), TaskError> {
        if index >= self.tasks.len() {
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(texts: &[&str]) -> TaskList {
        TaskList::from_tasks(
            texts
                .iter()
                .map(|t| Task::new(t.to_string(), false, Category::new("Work")))
                .collect(),
        )
    }

    fn texts(list: &TaskList) -> Vec<&str> {
        list.tasks().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn toggle_twice_restores_task() {
        let mut tasks = list(&["a", "b"]);
        let before = tasks.get(1).cloned().unwrap();
        assert!(tasks.toggle(1).unwrap());
        assert!(!tasks.toggle(1).unwrap());
        assert_eq!(tasks.get(1).unwrap(), &before);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let mut tasks = list(&["a", "b", "c", "d"]);
        let removed = tasks.remove(1).unwrap();
        assert_eq!(removed.text, "b");
        assert_eq!(texts(&tasks), vec!["a", "c", "d"]);
    }

    #[test]
    fn move_shifts_elements_between() {
        let mut tasks = list(&["a", "b", "c", "d"]);
        tasks.move_task(0, 2).unwrap();
        assert_eq!(texts(&tasks), vec!["b", "c", "a", "d"]);
        tasks.move_task(3, 0).unwrap();
        assert_eq!(texts(&tasks), vec!["d", "b", "c", "a"]);
        tasks.move_task(1, 1).unwrap();
        assert_eq!(texts(&tasks), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut tasks = list(&["a"]);
        assert_eq!(
            tasks.toggle(3),
            Err(TaskError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(tasks.remove(1).is_err());
        assert!(tasks.move_task(0, 1).is_err());
        assert!(tasks.set_text(2, "x".into()).is_err());
        assert_eq!(texts(&tasks), vec!["a"]);
    }

    #[test]
    fn index_of_follows_moves() {
        let mut tasks = list(&["a", "b", "c"]);
        let id = tasks.get(2).unwrap().id.clone();
        tasks.move_task(2, 0).unwrap();
        assert_eq!(tasks.index_of(&id), Some(0));
        tasks.remove(0).unwrap();
        assert_eq!(tasks.index_of(&id), None);
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize_text("   \t"), None);
        assert_eq!(normalize_text("  milk "), Some("milk".to_string()));
    }

    #[test]
    fn light_accent_from_hsl() {
        assert_eq!(
            Accent::from_hsl(0.0, 0.7, 0.8),
            Accent {
                r: 240,
                g: 168,
                b: 168
            }
        );
        let accent = Accent::random_light();
        assert!(accent.r >= 168 && accent.g >= 168 && accent.b >= 168);
    }
}
