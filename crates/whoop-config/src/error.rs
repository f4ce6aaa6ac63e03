//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No home directory and no override to fall back on.
    #[error("could not determine home directory; set {0} to choose a config directory")]
    NoHomeDir(&'static str),

    /// OAuth client credentials are required but not set.
    #[error("{missing} environment variable(s) required")]
    MissingCredentials { missing: String },
}
