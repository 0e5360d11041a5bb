use std::sync::Arc;

use chrono::NaiveDate;

use crate::backend::Backend;
use crate::config::Mode;
use crate::error::{AppError, ValidationError};
use crate::identity::{IdentityCallback, IdentityProvider, Subscription};
use crate::models::{NewTask, Priority, Task, TaskId, UserId};
use crate::store::TaskStore;

/// Raw create-form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// `YYYY-MM-DD`, or empty for no due date.
    pub due_date: String,
}

impl TaskForm {
    pub fn titled(title: impl Into<String>) -> Self {
        TaskForm {
            title: title.into(),
            ..TaskForm::default()
        }
    }

    /// Trims the text fields and parses the due date.
    pub fn validate(&self) -> Result<NewTask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let description = self.description.trim();
        let due = self.due_date.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(due, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDueDate(due.to_string()))?,
            )
        };
        Ok(NewTask {
            title: title.to_string(),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            priority: self.priority,
            due_date,
        })
    }

    pub fn clear(&mut self) {
        *self = TaskForm::default();
    }
}

/// Parses a priority typed on the command line.
pub fn parse_priority(raw: &str) -> Result<Priority, ValidationError> {
    raw.parse::<Priority>()
        .map_err(|_| ValidationError::InvalidPriority(raw.to_string()))
}

/// What the front ends call. Every failure comes back as one [`AppError`]
/// whose message is ready to show; nothing is retried.
#[derive(Clone)]
pub struct Controller {
    mode: Mode,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TaskStore>,
}

impl Controller {
    pub fn new(backend: Backend) -> Self {
        Controller {
            mode: backend.mode,
            identity: backend.identity,
            store: backend.store,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The current guest, provisioned on first use.
    pub async fn sign_in(&self) -> Result<UserId, AppError> {
        Ok(self.identity.resolve_or_create().await?)
    }

    pub async fn load(&self, user: &UserId) -> Result<Vec<Task>, AppError> {
        Ok(self.store.list_tasks(user).await?)
    }

    /// Validates `form` and creates the task. Invalid input never reaches the store.
    pub async fn create(&self, user: &UserId, form: &TaskForm) -> Result<(), AppError> {
        let task = form.validate()?;
        self.store.create_task(user, task).await?;
        Ok(())
    }

    pub async fn toggle(&self, user: &UserId, id: &TaskId) -> Result<Vec<Task>, AppError> {
        Ok(self.store.toggle_complete(user, id).await?)
    }

    /// Replaces the current guest with a fresh one.
    pub async fn new_guest(&self) -> Result<UserId, AppError> {
        self.identity.invalidate().await?;
        Ok(self.identity.resolve_or_create().await?)
    }

    pub fn watch(&self, callback: IdentityCallback) -> Subscription {
        self.identity.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_and_defaults() {
        let form = TaskForm {
            title: "  Buy milk ".into(),
            description: "   ".into(),
            priority: Priority::Normal,
            due_date: String::new(),
        };
        let task = form.validate().unwrap();
        assert_eq!(task, NewTask::titled("Buy milk"));
    }

    #[test]
    fn validate_rejects_blank_title() {
        assert_eq!(TaskForm::titled(" \t ").validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn validate_parses_due_date() {
        let mut form = TaskForm::titled("Report");
        form.due_date = "2025-12-01".into();
        assert_eq!(
            form.validate().unwrap().due_date,
            NaiveDate::from_ymd_opt(2025, 12, 1)
        );
        form.due_date = "12/01/2025".into();
        assert_eq!(
            form.validate(),
            Err(ValidationError::InvalidDueDate("12/01/2025".into()))
        );
    }

    #[test]
    fn parse_priority_reports_input() {
        assert_eq!(parse_priority("HIGH"), Ok(Priority::High));
        assert_eq!(
            parse_priority("asap"),
            Err(ValidationError::InvalidPriority("asap".into()))
        );
    }
}
