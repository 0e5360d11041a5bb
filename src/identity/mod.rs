//! Guest identity: who the current user is, and how to replace them.

mod local;
mod remote;

pub use local::LocalIdentity;
pub use remote::RemoteIdentity;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;

use crate::error::AuthError;
use crate::models::UserId;

/// Called with the new identity, or `None` once signed out.
pub type IdentityCallback = Arc<dyn Fn(Option<&UserId>) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the current guest, provisioning a new one if there is none.
    async fn resolve_or_create(&self) -> Result<UserId, AuthError>;

    /// Forgets the current guest. The next [`resolve_or_create`] provisions a
    /// fresh one; nothing is reissued automatically.
    ///
    /// [`resolve_or_create`]: IdentityProvider::resolve_or_create
    async fn invalidate(&self) -> Result<(), AuthError>;

    /// Registers `callback` for identity changes until the returned handle is dropped.
    fn subscribe(&self, callback: IdentityCallback) -> Subscription;
}

type Registry = Mutex<HashMap<u64, IdentityCallback>>;

/// Observer list shared by an identity provider and its subscriptions.
#[derive(Default)]
pub struct SessionWatchers {
    next_id: Mutex<u64>,
    callbacks: Arc<Registry>,
}

impl SessionWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: IdentityCallback) -> Subscription {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        Subscription {
            id,
            registry: Arc::downgrade(&self.callbacks),
        }
    }

    /// Invokes every registered callback. The registry lock is not held while
    /// callbacks run, so a callback may unsubscribe itself.
    pub fn notify(&self, user: Option<&UserId>) {
        let callbacks: Vec<IdentityCallback> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for cb in callbacks {
            cb(user);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered identity callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}
