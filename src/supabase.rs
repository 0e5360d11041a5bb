//! Client for a Supabase-compatible backend: anonymous auth under `/auth/v1`
//! and the structured query API under `/rest/v1`.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::RemoteConfig;
use crate::error::AuthError;
use crate::identity::{IdentityCallback, SessionWatchers, Subscription};
use crate::models::UserId;
use crate::storage::LocalStorage;

const SESSION_KEY: &str = "session.json";
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 30;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: UserId,
}

/// An authenticated guest session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: SessionUser,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS <= now
    }
}

/// Body returned by the signup and token endpoints.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<SessionUser>,
}

impl TokenResponse {
    fn into_session(self) -> Result<Session, AuthError> {
        match (self.access_token, self.refresh_token, self.user) {
            (Some(access_token), Some(refresh_token), Some(user)) => {
                let expires_at = self
                    .expires_at
                    .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
                Ok(Session {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                })
            }
            _ => Err(AuthError::MissingSession),
        }
    }
}

/// Error bodies differ between the auth and data services; take whichever
/// message field is present.
#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Reads the human-readable message out of a failed response.
pub(crate) async fn error_message(response: Response) -> (u16, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                trimmed.to_string()
            }
        });
    (status.as_u16(), message)
}

#[derive(Default)]
struct SessionCache {
    loaded: bool,
    session: Option<Session>,
}

/// Explicitly constructed handle to one backend project. Shared between the
/// remote identity provider and the remote task store through an `Arc`.
pub struct SupabaseClient {
    http: reqwest::Client,
    config: RemoteConfig,
    storage: LocalStorage,
    cache: Mutex<SessionCache>,
    watchers: SessionWatchers,
}

impl SupabaseClient {
    /// `storage` is where the session is persisted between runs.
    pub fn new(config: RemoteConfig, storage: LocalStorage) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(SupabaseClient {
            http,
            config,
            storage,
            cache: Mutex::new(SessionCache::default()),
            watchers: SessionWatchers::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.as_str().trim_end_matches('/'), path)
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(&format!("auth/v1/{}", path)))
            .header("apikey", &self.config.anon_key)
    }

    /// A request against `/rest/v1/<table>` authorized as the current guest.
    pub async fn rest(&self, method: Method, table: &str) -> Result<RequestBuilder, AuthError> {
        let token = self.access_token().await?;
        Ok(self
            .http
            .request(method, self.endpoint(&format!("rest/v1/{}", table)))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token))
    }

    fn load_persisted(&self) -> Option<Session> {
        let raw = self.storage.read(SESSION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("discarding unreadable persisted session: {}", e);
                None
            }
        }
    }

    fn persist(&self, session: Option<&Session>) {
        let result = match session {
            Some(s) => match serde_json::to_string(s) {
                Ok(json) => self.storage.write(SESSION_KEY, &json),
                Err(e) => {
                    log::warn!("cannot encode session: {}", e);
                    return;
                }
            },
            None => self.storage.remove(SESSION_KEY),
        };
        // The in-memory session stays authoritative for this run.
        if let Err(e) = result {
            log::warn!("cannot persist session: {}", e);
        }
    }

    /// The current session, refreshed if it is about to expire.
    ///
    /// A refresh the auth service rejects ends the session and yields `None`.
    pub async fn session(&self) -> Result<Option<Session>, AuthError> {
        let mut cache = self.cache.lock().await;
        if !cache.loaded {
            cache.session = self.load_persisted();
            cache.loaded = true;
        }
        let current = match cache.session.clone() {
            Some(s) => s,
            None => return Ok(None),
        };
        if !current.is_expired(Utc::now().timestamp()) {
            return Ok(Some(current));
        }

        log::debug!("refreshing session for {}", current.user.id);
        match self.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                self.persist(Some(&fresh));
                cache.session = Some(fresh.clone());
                drop(cache);
                if fresh.user.id != current.user.id {
                    self.watchers.notify(Some(&fresh.user.id));
                }
                Ok(Some(fresh))
            }
            Err(AuthError::Rejected { status, message }) => {
                log::info!("session refresh rejected ({}): {}", status, message);
                self.persist(None);
                cache.session = None;
                drop(cache);
                self.watchers.notify(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(AuthError::Rejected { status, message });
        }
        response.json::<TokenResponse>().await?.into_session()
    }

    /// Provisions a new anonymous account and makes it the current session.
    ///
    /// If another caller signed in while this one waited for the lock, that
    /// live session is returned instead of creating a second account.
    pub async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        let mut cache = self.cache.lock().await;
        if !cache.loaded {
            cache.session = self.load_persisted();
            cache.loaded = true;
        }
        if let Some(current) = &cache.session {
            if !current.is_expired(Utc::now().timestamp()) {
                return Ok(current.clone());
            }
        }
        let response = self
            .auth_request(Method::POST, "signup")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(AuthError::Rejected { status, message });
        }
        let session = response.json::<TokenResponse>().await?.into_session()?;
        log::info!("signed in as anonymous guest {}", session.user.id);
        self.persist(Some(&session));
        cache.loaded = true;
        cache.session = Some(session.clone());
        drop(cache);
        self.watchers.notify(Some(&session.user.id));
        Ok(session)
    }

    /// Ends the current session on the server and locally.
    ///
    /// A session the server no longer knows about counts as signed out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let mut cache = self.cache.lock().await;
        if !cache.loaded {
            cache.session = self.load_persisted();
            cache.loaded = true;
        }
        if let Some(session) = cache.session.clone() {
            let response = self
                .auth_request(Method::POST, "logout")
                .bearer_auth(&session.access_token)
                .send()
                .await?;
            let status = response.status();
            let already_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !status.is_success() && !already_gone {
                let (status, message) = error_message(response).await;
                return Err(AuthError::Rejected { status, message });
            }
            log::info!("signed out guest {}", session.user.id);
        }
        self.persist(None);
        cache.session = None;
        drop(cache);
        self.watchers.notify(None);
        Ok(())
    }

    /// Drops the session after the data service refused its token.
    pub async fn end_session(&self) {
        let mut cache = self.cache.lock().await;
        if cache.session.take().is_some() {
            log::warn!("session rejected by the backend, signing out locally");
            self.persist(None);
            drop(cache);
            self.watchers.notify(None);
        }
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        match self.session().await? {
            Some(s) => Ok(s.access_token),
            None => Err(AuthError::NotSignedIn),
        }
    }

    pub fn subscribe(&self, callback: IdentityCallback) -> Subscription {
        self.watchers.subscribe(callback)
    }
}
