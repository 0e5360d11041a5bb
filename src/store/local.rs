use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::TaskStore;
use crate::error::StoreError;
use crate::models::{sort_newest_first, NewTask, Task, TaskId, UserId};
use crate::storage::LocalStorage;

/// Tasks kept as one JSON array per guest in local storage.
///
/// Read-modify-write cycles are serialized within this process only. Two
/// processes writing the same data directory can lose each other's updates.
pub struct LocalTaskStore {
    storage: LocalStorage,
    write_lock: Mutex<()>,
}

fn tasks_key(user: &UserId) -> String {
    format!("tasks.{}.json", user)
}

impl LocalTaskStore {
    pub fn new(storage: LocalStorage) -> Self {
        LocalTaskStore {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the stored tasks for `user`.
    ///
    /// Returns an empty vector if nothing is stored or the blob cannot be
    /// decoded; the next successful write replaces it.
    fn load(&self, user: &UserId) -> Vec<Task> {
        let raw = match self.storage.read(&tasks_key(user)) {
            Some(raw) => raw,
            None => return Vec::new(),
        };
        let mut tasks: Vec<Task> = match serde_json::from_str(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                log::warn!("ignoring unreadable task list for {}: {}", user, e);
                return Vec::new();
            }
        };
        tasks.retain(|t| &t.user_id == user);
        tasks
    }

    fn save(&self, user: &UserId, tasks: &[Task]) -> Result<(), StoreError> {
        let s = serde_json::to_string_pretty(tasks)?;
        self.storage.write(&tasks_key(user), &s)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for LocalTaskStore {
    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.load(user);
        sort_newest_first(&mut tasks);
        log::debug!("listed {} local tasks for {}", tasks.len(), user);
        Ok(tasks)
    }

    async fn create_task(&self, user: &UserId, task: NewTask) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load(user);
        let t = Task {
            id: TaskId(Uuid::new_v4().to_string()),
            user_id: user.clone(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            due_date: task.due_date,
            is_complete: false,
            created_at: Utc::now(),
        };
        log::debug!("creating local task {} for {}", t.id, user);
        tasks.push(t);
        self.save(user, &tasks)
    }

    async fn toggle_complete(&self, user: &UserId, id: &TaskId) -> Result<Vec<Task>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load(user);
        match tasks.iter_mut().find(|t| &t.id == id) {
            Some(t) => {
                t.is_complete = !t.is_complete;
                log::debug!("task {} complete = {}", id, t.is_complete);
            }
            None => return Err(StoreError::NotFound(id.clone())),
        }
        self.save(user, &tasks)?;
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }
}
