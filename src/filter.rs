use crate::model::{Category, Task, TaskError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterSelector {
    #[default]
    All,
    Incomplete,
    Completed,
    ByCategory(Category),
}

impl FilterSelector {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            FilterSelector::All => true,
            FilterSelector::Incomplete => !task.completed,
            FilterSelector::Completed => task.completed,
            FilterSelector::ByCategory(category) => &task.category == category,
        }
    }

    /// Keywords are case-insensitive; category names must match exactly.
    pub fn parse(input: &str, categories: &[Category]) -> Result<Self, TaskError> {
        let trimmed = input.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "all" => return Ok(FilterSelector::All),
            "incomplete" => return Ok(FilterSelector::Incomplete),
            "completed" => return Ok(FilterSelector::Completed),
            _ => {}
        }
        categories
            .iter()
            .find(|c| c.as_str() == trimmed)
            .map(|c| FilterSelector::ByCategory(c.clone()))
            .ok_or_else(|| TaskError::UnknownCategory(trimmed.to_string()))
    }

    /// All, Incomplete, Completed, then each category in order.
    pub fn cycle(&self, categories: &[Category]) -> Self {
        let by_category = |idx: usize| {
            categories
                .get(idx)
                .map(|c| FilterSelector::ByCategory(c.clone()))
                .unwrap_or(FilterSelector::All)
        };
        match self {
            FilterSelector::All => FilterSelector::Incomplete,
            FilterSelector::Incomplete => FilterSelector::Completed,
            FilterSelector::Completed => by_category(0),
            FilterSelector::ByCategory(current) => {
                match categories.iter().position(|c| c == current) {
                    Some(idx) => by_category(idx + 1),
                    None => FilterSelector::All,
                }
            }
        }
    }
}

impl fmt::Display for FilterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSelector::All => f.write_str("all"),
            FilterSelector::Incomplete => f.write_str("incomplete"),
            FilterSelector::Completed => f.write_str("completed"),
            FilterSelector::ByCategory(category) => write!(f, "{}", category),
        }
    }
}

/// A task that passed the filter, with its position in the full collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTask<'a> {
    pub index: usize,
    pub task: &'a Task,
}

pub fn visible_tasks<'a>(tasks: &'a [Task], selector: &FilterSelector) -> Vec<VisibleTask<'a>> {
    tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| selector.matches(task))
        .map(|(index, task)| VisibleTask { index, task })
        .collect()
}
