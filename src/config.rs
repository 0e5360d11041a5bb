use std::path::PathBuf;

use reqwest::Url;

use crate::error::ConfigError;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const DIR_VAR: &str = "GUEST_TASKS_DIR";
pub const MODE_VAR: &str = "GUEST_TASKS_MODE";
pub const DEMO_VAR: &str = "GUEST_TASKS_DEMO";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub url: Url,
    pub anon_key: String,
}

impl RemoteConfig {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
                reason: "scheme must be http or https".into(),
            });
        }
        Ok(RemoteConfig {
            url: parsed,
            anon_key: anon_key.into(),
        })
    }
}

/// What to do when the remote settings are incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingConfigPolicy {
    /// Quietly run against local storage.
    FallbackToLocal,
    /// Refuse to start.
    Fail,
}

/// Which store/identity pair the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Remote,
    Local,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Remote => "remote",
            Mode::Local => "local demo",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Raw URL, if set.
    pub url: Option<String>,
    /// Raw anon key, if set.
    pub anon_key: Option<String>,
    /// Where local storage, the persisted session and logs live.
    pub data_dir: PathBuf,
    /// Mode requested explicitly, bypassing detection.
    pub forced_mode: Option<Mode>,
    pub policy: MissingConfigPolicy,
}

/// Returns the default data directory.
///
/// 1. `GUEST_TASKS_DIR` if set.
/// 2. `~/.local/share/guest-tasks` (on Linux).
/// 3. `./.guest-tasks` (fallback).
fn default_data_dir(dir_var: Option<String>) -> PathBuf {
    dir_var.map(PathBuf::from).unwrap_or_else(|| {
        match dirs::data_local_dir() {
            Some(mut p) => {
                p.push("guest-tasks");
                p
            }
            None => PathBuf::from(".guest-tasks"),
        }
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn truthy(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

impl Config {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, so tests need not touch the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let forced_mode = match non_empty(lookup(MODE_VAR)) {
            None => None,
            Some(m) => match m.to_lowercase().as_str() {
                "local" => Some(Mode::Local),
                "remote" => Some(Mode::Remote),
                _ => return Err(ConfigError::UnknownMode(m)),
            },
        };
        let policy = if truthy(lookup(DEMO_VAR)) {
            MissingConfigPolicy::FallbackToLocal
        } else {
            MissingConfigPolicy::Fail
        };
        Ok(Config {
            url: non_empty(lookup(URL_VAR)),
            anon_key: non_empty(lookup(ANON_KEY_VAR)),
            data_dir: default_data_dir(non_empty(lookup(DIR_VAR))),
            forced_mode,
            policy,
        })
    }

    /// Names of the remote settings that are not set.
    pub fn missing_remote(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_none() {
            missing.push(URL_VAR);
        }
        if self.anon_key.is_none() {
            missing.push(ANON_KEY_VAR);
        }
        missing
    }

    /// Validated remote settings.
    pub fn remote(&self) -> Result<RemoteConfig, ConfigError> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(key)) => RemoteConfig::new(url, key.clone()),
            _ => Err(ConfigError::Missing(self.missing_remote())),
        }
    }

    /// Picks the mode once, at startup.
    ///
    /// Complete remote settings select remote mode. Incomplete ones fall back
    /// to local mode only under [`MissingConfigPolicy::FallbackToLocal`].
    pub fn resolve_mode(&self) -> Result<Mode, ConfigError> {
        if let Some(mode) = self.forced_mode {
            if mode == Mode::Remote {
                self.remote()?;
            }
            return Ok(mode);
        }
        let missing = self.missing_remote();
        if missing.is_empty() {
            self.remote()?;
            return Ok(Mode::Remote);
        }
        match self.policy {
            MissingConfigPolicy::FallbackToLocal => {
                log::info!("{} not set, using local demo mode", missing.join(", "));
                Ok(Mode::Local)
            }
            MissingConfigPolicy::Fail => Err(ConfigError::Missing(missing)),
        }
    }
}
