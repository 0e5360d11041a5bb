use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use guest_tasks::backend::Backend;
use guest_tasks::config::{Config, Mode};
use guest_tasks::controller::{Controller, TaskForm};
use guest_tasks::error::{AppError, ConfigError, StoreError, ValidationError};
use guest_tasks::identity::LocalIdentity;
use guest_tasks::models::{NewTask, Priority, Task, TaskId, UserId};
use guest_tasks::storage::LocalStorage;
use guest_tasks::store::TaskStore;
use tempfile::TempDir;

/// Counts calls and otherwise does nothing.
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
}

#[async_trait]
impl TaskStore for CountingStore {
    async fn list_tasks(&self, _user: &UserId) -> Result<Vec<Task>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn create_task(&self, _user: &UserId, _task: NewTask) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn toggle_complete(&self, _user: &UserId, id: &TaskId) -> Result<Vec<Task>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::NotFound(id.clone()))
    }
}

fn local_controller() -> (TempDir, Controller) {
    let dir = tempfile::tempdir().unwrap();
    let controller = Controller::new(Backend::local(LocalStorage::new(dir.path())));
    (dir, controller)
}

#[tokio::test]
async fn test_blank_title_never_reaches_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::default());
    let controller = Controller::new(Backend {
        mode: Mode::Local,
        identity: Arc::new(LocalIdentity::new(LocalStorage::new(dir.path()))),
        store: store.clone(),
    });
    let user = controller.sign_in().await.unwrap();

    for title in ["", "   ", "\t\n"] {
        let err = controller
            .create(&user, &TaskForm::titled(title))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyTitle)));
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);

    controller.create(&user, &TaskForm::titled("ok")).await.unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_local_buy_milk_scenario() {
    let (_dir, controller) = local_controller();
    let user = controller.sign_in().await.unwrap();
    assert!(controller.load(&user).await.unwrap().is_empty());

    controller
        .create(&user, &TaskForm::titled("  Buy milk  "))
        .await
        .unwrap();

    let tasks = controller.load(&user).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert_eq!(tasks[0].priority, Priority::Normal);
    assert_eq!(tasks[0].description, None);
    assert_eq!(tasks[0].due_date, None);
    assert!(!tasks[0].is_complete);
}

#[tokio::test]
async fn test_local_new_guest_scenario() {
    let (_dir, controller) = local_controller();
    let old = controller.sign_in().await.unwrap();
    controller.create(&old, &TaskForm::titled("old task")).await.unwrap();

    let new = controller.new_guest().await.unwrap();
    assert_ne!(old, new);
    assert_eq!(controller.sign_in().await.unwrap(), new);
    assert!(controller.load(&new).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_toggle_round_trip_and_missing() {
    let (_dir, controller) = local_controller();
    let user = controller.sign_in().await.unwrap();
    controller.create(&user, &TaskForm::titled("first")).await.unwrap();
    let id = controller.load(&user).await.unwrap()[0].id.clone();

    let once = controller.toggle(&user, &id).await.unwrap();
    assert!(once[0].is_complete);
    let twice = controller.toggle(&user, &id).await.unwrap();
    assert!(!twice[0].is_complete);

    let err = controller
        .toggle(&user, &TaskId::from("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(controller.load(&user).await.unwrap(), twice);
}

#[tokio::test]
async fn test_invalid_due_date_is_rejected() {
    let (_dir, controller) = local_controller();
    let user = controller.sign_in().await.unwrap();
    let mut form = TaskForm::titled("dated");
    form.due_date = "tomorrow".into();

    let err = controller.create(&user, &form).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid due date 'tomorrow'. Use YYYY-MM-DD.");
    assert!(controller.load(&user).await.unwrap().is_empty());
}

#[test]
fn test_missing_remote_config_without_fallback_builds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dir_str = dir.path().to_str().unwrap().to_string();
    let config = Config::from_lookup(|key| match key {
        "GUEST_TASKS_DIR" => Some(dir_str.clone()),
        _ => None,
    })
    .unwrap();

    match Backend::from_config(&config) {
        Err(AppError::Config(ConfigError::Missing(vars))) => {
            assert_eq!(vars, vec!["SUPABASE_URL", "SUPABASE_ANON_KEY"]);
        }
        Err(e) => panic!("expected missing config, got {}", e),
        Ok(_) => panic!("expected missing config, got a backend"),
    }
    // No store was built, so nothing was written.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_remote_config_with_fallback_uses_local() {
    let dir = tempfile::tempdir().unwrap();
    let dir_str = dir.path().to_str().unwrap().to_string();
    let config = Config::from_lookup(|key| match key {
        "GUEST_TASKS_DIR" => Some(dir_str.clone()),
        "GUEST_TASKS_DEMO" => Some("1".into()),
        _ => None,
    })
    .unwrap();

    let backend = Backend::from_config(&config).unwrap();
    assert_eq!(backend.mode, Mode::Local);
}

#[test]
fn test_complete_remote_config_uses_remote() {
    let config = Config::from_lookup(|key| match key {
        "SUPABASE_URL" => Some("https://project.supabase.co".into()),
        "SUPABASE_ANON_KEY" => Some("anon".into()),
        "GUEST_TASKS_DIR" => Some("/nonexistent/guest-tasks".into()),
        _ => None,
    })
    .unwrap();

    let backend = Backend::from_config(&config).unwrap();
    assert_eq!(backend.mode, Mode::Remote);
}
