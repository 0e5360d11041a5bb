use std::future::Future;
use std::sync::Arc;

use ratatui::widgets::TableState;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::controller::{Controller, TaskForm};
use crate::error::AppError;
use crate::identity::Subscription;
use crate::models::{Priority, Task, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Priority,
    DueDate,
}

impl FormField {
    pub fn next(self) -> FormField {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Priority,
            FormField::Priority => FormField::DueDate,
            FormField::DueDate => FormField::Title,
        }
    }

    pub fn previous(self) -> FormField {
        match self {
            FormField::Title => FormField::DueDate,
            FormField::Description => FormField::Title,
            FormField::Priority => FormField::Description,
            FormField::DueDate => FormField::Priority,
        }
    }
}

/// Results of background work, delivered back to the UI thread.
pub enum Message {
    SignedIn(Result<UserId, AppError>),
    /// The identity provider reported a new guest, or `None` after sign-out.
    IdentityChanged(Option<UserId>),
    Loaded {
        user: UserId,
        result: Result<Vec<Task>, AppError>,
    },
    Created {
        user: UserId,
        result: Result<(), AppError>,
    },
    Toggled {
        user: UserId,
        id: TaskId,
        result: Result<Vec<Task>, AppError>,
    },
    GuestReplaced(Result<UserId, AppError>),
}

/// State of the single task screen.
///
/// Store and identity calls run on the tokio runtime; their results come
/// back as [`Message`]s. The busy flags only keep the same action from being
/// started twice from the keyboard.
pub struct App {
    controller: Controller,
    runtime: Handle,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    _subscription: Subscription,

    pub user_id: Option<UserId>,
    pub tasks: Vec<Task>,
    pub state: TableState,
    /// The one message slot. The most recent error replaces any earlier one.
    pub error: Option<String>,
    pub loading_auth: bool,
    pub loading_tasks: bool,
    pub creating: bool,
    pub updating_id: Option<TaskId>,

    pub form: TaskForm,
    pub input_mode: InputMode,
    pub field: FormField,
}

impl App {
    /// Creates the screen state and subscribes to identity changes for as
    /// long as the `App` lives.
    pub fn new(controller: Controller, runtime: Handle) -> App {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = tx.clone();
        let subscription = controller.watch(Arc::new(move |user: Option<&UserId>| {
            let _ = watcher.send(Message::IdentityChanged(user.cloned()));
        }));
        App {
            controller,
            runtime,
            tx,
            rx,
            _subscription: subscription,
            user_id: None,
            tasks: Vec::new(),
            state: TableState::default(),
            error: None,
            loading_auth: false,
            loading_tasks: false,
            creating: false,
            updating_id: None,
            form: TaskForm::default(),
            input_mode: InputMode::Normal,
            field: FormField::Title,
        }
    }

    pub fn mode_label(&self) -> &'static str {
        self.controller.mode().label()
    }

    /// Runs `work` in the background and queues its message. If the `App`
    /// is gone by then the message is dropped.
    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(work.await);
        });
    }

    /// Resolves the guest identity; the task list follows once it is known.
    pub fn start(&mut self) {
        self.error = None;
        self.loading_auth = true;
        let controller = self.controller.clone();
        self.spawn(async move { Message::SignedIn(controller.sign_in().await) });
    }

    /// Applies every message that has arrived. Returns whether anything changed.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
            changed = true;
        }
        changed
    }

    /// Waits for the next message and applies it.
    pub async fn recv(&mut self) {
        if let Some(msg) = self.rx.recv().await {
            self.apply(msg);
        }
    }

    fn is_current(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }

    fn set_user(&mut self, user: Option<UserId>) {
        if self.user_id == user {
            return;
        }
        self.user_id = user;
        self.loading_tasks = false;
        self.tasks.clear();
        self.state.select(None);
        if self.user_id.is_some() {
            self.refresh();
        }
    }

    /// Updates the state from one finished operation. Results for a guest
    /// that is no longer current are ignored.
    pub fn apply(&mut self, msg: Message) {
        match msg {
            Message::SignedIn(result) | Message::GuestReplaced(result) => {
                self.loading_auth = false;
                match result {
                    Ok(user) => self.set_user(Some(user)),
                    Err(e) => self.error = Some(e.to_string()),
                }
            }
            Message::IdentityChanged(user) => self.set_user(user),
            Message::Loaded { user, result } => {
                if !self.is_current(&user) {
                    return;
                }
                self.loading_tasks = false;
                match result {
                    Ok(tasks) => self.set_tasks(tasks),
                    Err(e) => self.error = Some(e.to_string()),
                }
            }
            Message::Created { user, result } => {
                self.creating = false;
                if !self.is_current(&user) {
                    return;
                }
                match result {
                    Ok(()) => {
                        // The re-list is already on its way.
                        self.loading_tasks = true;
                        self.form.clear();
                        self.field = FormField::Title;
                        self.input_mode = InputMode::Normal;
                    }
                    Err(e) => self.error = Some(e.to_string()),
                }
            }
            Message::Toggled { user, id, result } => {
                if self.updating_id.as_ref() == Some(&id) {
                    self.updating_id = None;
                }
                if !self.is_current(&user) {
                    return;
                }
                match result {
                    Ok(tasks) => self.set_tasks(tasks),
                    Err(e) => self.error = Some(e.to_string()),
                }
            }
        }
    }

    fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        if self.tasks.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.tasks.len() {
                self.state.select(Some(self.tasks.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    /// Re-reads the task list.
    pub fn refresh(&mut self) {
        let user = match &self.user_id {
            Some(u) => u.clone(),
            None => return,
        };
        self.error = None;
        self.loading_tasks = true;
        let controller = self.controller.clone();
        self.spawn(async move {
            let result = controller.load(&user).await;
            Message::Loaded { user, result }
        });
    }

    /// Submits the create form: create, then re-list.
    pub fn submit(&mut self) {
        let user = match &self.user_id {
            Some(u) => u.clone(),
            None => return,
        };
        if self.creating {
            return;
        }
        if let Err(e) = self.form.validate() {
            self.error = Some(e.to_string());
            return;
        }
        self.error = None;
        self.creating = true;
        let controller = self.controller.clone();
        let form = self.form.clone();
        let tx = self.tx.clone();
        self.spawn(async move {
            let result = controller.create(&user, &form).await;
            if result.is_ok() {
                let _ = tx.send(Message::Created {
                    user: user.clone(),
                    result: Ok(()),
                });
                let listed = controller.load(&user).await;
                return Message::Loaded { user, result: listed };
            }
            Message::Created { user, result }
        });
    }

    /// Flips completion of the selected task.
    pub fn toggle_selected(&mut self) {
        let user = match &self.user_id {
            Some(u) => u.clone(),
            None => return,
        };
        let id = match self.selected_task() {
            Some(t) => t.id.clone(),
            None => return,
        };
        if self.updating_id.as_ref() == Some(&id) {
            return;
        }
        self.error = None;
        self.updating_id = Some(id.clone());
        let controller = self.controller.clone();
        self.spawn(async move {
            let result = controller.toggle(&user, &id).await;
            Message::Toggled { user, id, result }
        });
    }

    /// Drops the current guest and provisions a new one.
    pub fn new_guest(&mut self) {
        if self.loading_auth {
            return;
        }
        self.error = None;
        self.loading_auth = true;
        let controller = self.controller.clone();
        self.spawn(async move { Message::GuestReplaced(controller.new_guest().await) });
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    /// Selects the next task.
    pub fn next(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous task.
    pub fn previous(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn can_edit(&self) -> bool {
        !self.loading_auth && self.user_id.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.can_edit() && !self.creating && !self.form.title.trim().is_empty()
    }

    /// Focuses the create form.
    pub fn start_edit(&mut self) {
        if !self.can_edit() {
            return;
        }
        self.input_mode = InputMode::Editing;
    }

    pub fn stop_edit(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn next_field(&mut self) {
        self.field = self.field.next();
    }

    pub fn previous_field(&mut self) {
        self.field = self.field.previous();
    }

    /// Types a character into the focused field.
    pub fn push_char(&mut self, c: char) {
        match self.field {
            FormField::Title => self.form.title.push(c),
            FormField::Description => self.form.description.push(c),
            FormField::DueDate => self.form.due_date.push(c),
            FormField::Priority => match c {
                'l' | 'L' => self.form.priority = Priority::Low,
                'n' | 'N' => self.form.priority = Priority::Normal,
                'h' | 'H' => self.form.priority = Priority::High,
                ' ' => self.form.priority = self.form.priority.next(),
                _ => {}
            },
        }
    }

    pub fn backspace(&mut self) {
        match self.field {
            FormField::Title => {
                self.form.title.pop();
            }
            FormField::Description => {
                self.form.description.pop();
            }
            FormField::DueDate => {
                self.form.due_date.pop();
            }
            FormField::Priority => {}
        }
    }

    /// Left/right on the priority field.
    pub fn cycle_priority(&mut self, forward: bool) {
        if self.field != FormField::Priority {
            return;
        }
        self.form.priority = if forward {
            self.form.priority.next()
        } else {
            self.form.priority.previous()
        };
    }
}
