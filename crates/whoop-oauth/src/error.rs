//! Error types for the OAuth token lifecycle.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while obtaining, storing or refreshing tokens.
///
/// These cover infrastructure failures only. A user denying consent or a
/// forged callback is reported through [`crate::flow::AuthResult`] instead.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error talking to the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// The token endpoint rejected a refresh request.
    #[error("Token refresh failed with status {status}: {body}")]
    RefreshFailed { status: u16, body: String },

    /// The token endpoint rejected an authorization code.
    #[error("Code exchange failed with status {status}: {body}")]
    ExchangeFailed { status: u16, body: String },

    /// Stored token is expired and there is no refresh token to renew it.
    #[error("Token expired and no refresh token is available; re-authorize to continue")]
    TokenExpired,

    /// The fixed callback port is already taken.
    #[error("Callback port {port} is already in use: {message}")]
    PortInUse { port: u16, message: String },

    /// Token file could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Token JSON could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The system random source failed.
    #[error("Failed to generate random state: {0}")]
    Entropy(String),

    /// The callback listener failed while serving.
    #[error("Callback server error: {0}")]
    Callback(String),

    /// The flow was cancelled by the caller.
    #[error("Authorization cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl OAuthError {
    /// HTTP status returned by the token endpoint, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            OAuthError::RefreshFailed { status, .. } | OAuthError::ExchangeFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = OAuthError::RefreshFailed {
            status: 401,
            body: "invalid_grant".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("401"));

        assert_eq!(OAuthError::TokenExpired.status(), None);
    }

    #[test]
    fn test_port_in_use_display() {
        let err = OAuthError::PortInUse {
            port: 8080,
            message: "Address already in use".to_string(),
        };
        assert!(err.to_string().contains("8080"));
    }
}
