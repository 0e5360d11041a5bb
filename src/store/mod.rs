//! Task persistence, either on the hosted backend or in local storage.

mod local;
mod remote;

pub use local::LocalTaskStore;
pub use remote::RemoteTaskStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskId, UserId};

/// The operations every task backend supports. Tasks are never edited or
/// deleted, only created and toggled.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks owned by `user`, newest first.
    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError>;

    /// Stores a new incomplete task for `user`. The store assigns `id` and `created_at`.
    async fn create_task(&self, user: &UserId, task: NewTask) -> Result<(), StoreError>;

    /// Flips `is_complete` on one of `user`'s tasks and returns the refreshed list.
    ///
    /// Fails with [`StoreError::NotFound`] rather than creating anything when
    /// `user` has no such task.
    async fn toggle_complete(&self, user: &UserId, id: &TaskId) -> Result<Vec<Task>, StoreError>;
}
