//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Sign-in rejected or could not be completed
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Sign-up rejected or could not be completed
    #[error("{0}")]
    RegistrationFailed(String),

    /// Profile or organization could not be loaded
    #[error("{0}")]
    ProfileFetchFailed(String),

    /// Session could not be invalidated
    #[error("{0}")]
    SignOutFailed(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Token refresh error
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// No session to act on
    #[error("Not signed in")]
    NotSignedIn,

    /// Invalid state transition in the credential FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors are connection failures, timeouts and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Api { status, .. } => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }

    /// Human-readable message suitable for display.
    ///
    /// Backend messages are passed through as-is; transport details are not.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::AuthenticationFailed(msg)
            | AuthError::RegistrationFailed(msg)
            | AuthError::ProfileFetchFailed(msg)
            | AuthError::SignOutFailed(msg)
            | AuthError::TokenRefresh(msg) => msg.clone(),
            AuthError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_server_error() {
        let err = AuthError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_is_not_transient_client_error() {
        let err = AuthError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_is_not_transient_taxonomy_errors() {
        assert!(!AuthError::AuthenticationFailed("x".to_string()).is_transient());
        assert!(!AuthError::NotSignedIn.is_transient());
        assert!(!AuthError::RefreshExhausted(3).is_transient());
    }

    #[test]
    fn test_user_message_passes_backend_text_through() {
        let err = AuthError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid login credentials");

        let err = AuthError::AuthenticationFailed("Sign in failed".to_string());
        assert_eq!(err.user_message(), "Sign in failed");
        assert_eq!(err.to_string(), "Sign in failed");
    }
}
