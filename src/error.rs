use thiserror::Error;

use crate::models::TaskId;

/// Remote configuration is absent or unusable.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing remote configuration. Set {}.", .0.join(" and "))]
    Missing(Vec<&'static str>),
    #[error("Invalid remote URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unknown mode '{0}'. Use 'local' or 'remote'.")]
    UnknownMode(String),
}

/// Resolving or tearing down the guest identity failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Auth service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Auth service returned no session.")]
    MissingSession,
    #[error("Not signed in.")]
    NotSignedIn,
    #[error("Failed to persist identity: {0}")]
    Storage(#[from] std::io::Error),
}

/// A task store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task {0} not found.")]
    NotFound(TaskId),
    #[error("Session expired. Start a new guest session.")]
    Unauthenticated,
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Form input rejected before any I/O.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Title is required.")]
    EmptyTitle,
    #[error("Invalid priority '{0}'. Use low, normal or high.")]
    InvalidPriority(String),
    #[error("Invalid due date '{0}'. Use YYYY-MM-DD.")]
    InvalidDueDate(String),
}

/// Everything the controller can surface to the user as one message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Store(StoreError::NotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_names_variables() {
        let e = ConfigError::Missing(vec!["SUPABASE_URL", "SUPABASE_ANON_KEY"]);
        assert_eq!(
            e.to_string(),
            "Missing remote configuration. Set SUPABASE_URL and SUPABASE_ANON_KEY."
        );
    }

    #[test]
    fn app_error_message_is_the_inner_message() {
        let e: AppError = ValidationError::EmptyTitle.into();
        assert_eq!(e.to_string(), "Title is required.");
        let e: AppError = StoreError::NotFound(TaskId::from("t1")).into();
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "Task t1 not found.");
    }
}
