use async_trait::async_trait;
use uuid::Uuid;

use super::{IdentityCallback, IdentityProvider, SessionWatchers, Subscription};
use crate::error::AuthError;
use crate::models::UserId;
use crate::storage::LocalStorage;

const GUEST_KEY: &str = "guest_id";

/// Guest identity kept in local storage, for demo mode.
pub struct LocalIdentity {
    storage: LocalStorage,
    watchers: SessionWatchers,
}

impl LocalIdentity {
    pub fn new(storage: LocalStorage) -> Self {
        LocalIdentity {
            storage,
            watchers: SessionWatchers::new(),
        }
    }

    /// The persisted guest id, without creating one.
    pub fn current(&self) -> Option<UserId> {
        self.storage
            .read(GUEST_KEY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(UserId)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn resolve_or_create(&self) -> Result<UserId, AuthError> {
        if let Some(id) = self.current() {
            return Ok(id);
        }
        let id = UserId(Uuid::new_v4().to_string());
        self.storage.write(GUEST_KEY, id.as_str())?;
        log::info!("created local guest {}", id);
        self.watchers.notify(Some(&id));
        Ok(id)
    }

    async fn invalidate(&self) -> Result<(), AuthError> {
        self.storage.remove(GUEST_KEY)?;
        log::info!("local guest cleared");
        self.watchers.notify(None);
        Ok(())
    }

    fn subscribe(&self, callback: IdentityCallback) -> Subscription {
        self.watchers.subscribe(callback)
    }
}
