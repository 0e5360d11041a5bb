use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::TaskStore;
use crate::error::StoreError;
use crate::models::{NewTask, Priority, Task, TaskId, UserId};
use crate::supabase::{error_message, SupabaseClient};

const TABLE: &str = "tasks";

/// Row sent on insert; the backend fills in `id`, `is_complete` and `created_at`.
#[derive(Serialize)]
struct InsertRow<'a> {
    user_id: &'a UserId,
    title: &'a str,
    description: Option<&'a str>,
    priority: Priority,
    due_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct CompletionRow {
    is_complete: bool,
}

fn eq(value: &impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

/// Tasks in the backend's `tasks` table. Row-level security does the access
/// control; the `user_id` filter is sent on every request regardless.
pub struct RemoteTaskStore {
    client: Arc<SupabaseClient>,
}

impl RemoteTaskStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        RemoteTaskStore { client }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.client.end_session().await;
            return Err(StoreError::Unauthenticated);
        }
        if !status.is_success() {
            let (status, message) = error_message(response).await;
            return Err(StoreError::Remote { status, message });
        }
        Ok(response)
    }

    async fn current_completion(&self, user: &UserId, id: &TaskId) -> Result<bool, StoreError> {
        let request = self
            .client
            .rest(Method::GET, TABLE)
            .await?
            .query(&[
                ("select", "id,is_complete".to_string()),
                ("id", eq(id)),
                ("user_id", eq(user)),
            ]);
        let rows: Vec<CompletionRow> = self.send(request).await?.json().await?;
        match rows.first() {
            Some(row) => Ok(row.is_complete),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }
}

#[async_trait]
impl TaskStore for RemoteTaskStore {
    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError> {
        let request = self
            .client
            .rest(Method::GET, TABLE)
            .await?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq(user)),
                ("order", "created_at.desc,id.desc".to_string()),
            ]);
        let tasks: Vec<Task> = self.send(request).await?.json().await?;
        log::debug!("listed {} remote tasks for {}", tasks.len(), user);
        Ok(tasks.into_iter().filter(|t| &t.user_id == user).collect())
    }

    async fn create_task(&self, user: &UserId, task: NewTask) -> Result<(), StoreError> {
        let row = InsertRow {
            user_id: user,
            title: &task.title,
            description: task.description.as_deref(),
            priority: task.priority,
            due_date: task.due_date,
        };
        let request = self
            .client
            .rest(Method::POST, TABLE)
            .await?
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(request).await?;
        log::debug!("created remote task for {}", user);
        Ok(())
    }

    async fn toggle_complete(&self, user: &UserId, id: &TaskId) -> Result<Vec<Task>, StoreError> {
        let current = self.current_completion(user, id).await?;
        let request = self
            .client
            .rest(Method::PATCH, TABLE)
            .await?
            .query(&[("id", eq(id)), ("user_id", eq(user))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "is_complete": !current }));
        let updated: Vec<Task> = self.send(request).await?.json().await?;
        if updated.is_empty() {
            return Err(StoreError::NotFound(id.clone()));
        }
        log::debug!("task {} complete = {}", id, !current);
        self.list_tasks(user).await
    }
}
