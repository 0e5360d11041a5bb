use std::sync::Arc;

use crate::config::{Config, Mode};
use crate::error::AppError;
use crate::identity::{IdentityProvider, LocalIdentity, RemoteIdentity};
use crate::storage::LocalStorage;
use crate::store::{LocalTaskStore, RemoteTaskStore, TaskStore};
use crate::supabase::SupabaseClient;

/// The identity provider and task store picked at startup.
#[derive(Clone)]
pub struct Backend {
    pub mode: Mode,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn TaskStore>,
}

impl Backend {
    /// Builds the backend `config` selects. Nothing is built, and no store is
    /// reachable, when the configuration is rejected.
    pub fn from_config(config: &Config) -> Result<Backend, AppError> {
        let mode = config.resolve_mode()?;
        let storage = LocalStorage::new(&config.data_dir);
        match mode {
            Mode::Remote => {
                let client = Arc::new(SupabaseClient::new(config.remote()?, storage)?);
                log::info!("using remote backend at {}", config.url.as_deref().unwrap_or_default());
                Ok(Backend::remote(client))
            }
            Mode::Local => {
                log::info!("using local storage in {}", config.data_dir.display());
                Ok(Backend::local(storage))
            }
        }
    }

    pub fn local(storage: LocalStorage) -> Backend {
        Backend {
            mode: Mode::Local,
            identity: Arc::new(LocalIdentity::new(storage.clone())),
            store: Arc::new(LocalTaskStore::new(storage)),
        }
    }

    pub fn remote(client: Arc<SupabaseClient>) -> Backend {
        Backend {
            mode: Mode::Remote,
            identity: Arc::new(RemoteIdentity::new(client.clone())),
            store: Arc::new(RemoteTaskStore::new(client)),
        }
    }
}
