use std::sync::Arc;

use async_trait::async_trait;

use super::{IdentityCallback, IdentityProvider, Subscription};
use crate::error::AuthError;
use crate::models::UserId;
use crate::supabase::SupabaseClient;

/// Anonymous guest account on the hosted backend.
pub struct RemoteIdentity {
    client: Arc<SupabaseClient>,
}

impl RemoteIdentity {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        RemoteIdentity { client }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentity {
    async fn resolve_or_create(&self) -> Result<UserId, AuthError> {
        if let Some(session) = self.client.session().await? {
            return Ok(session.user.id);
        }
        let session = self.client.sign_in_anonymously().await?;
        Ok(session.user.id)
    }

    async fn invalidate(&self) -> Result<(), AuthError> {
        self.client.sign_out().await
    }

    fn subscribe(&self, callback: IdentityCallback) -> Subscription {
        self.client.subscribe(callback)
    }
}
