//! Settings resolved from the environment.
//!
//! | variable              | meaning                                        |
//! |-----------------------|------------------------------------------------|
//! | `WHOOP_CLIENT_ID`     | OAuth client id (needed to authorize/refresh)  |
//! | `WHOOP_CLIENT_SECRET` | OAuth client secret                            |
//! | `WHOOP_ACCESS_TOKEN`  | pre-provisioned token, bypasses the token file |
//! | `WHOOP_CONFIG_DIR`    | replaces `~/.whoop`                            |

use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::paths::{LOG_DIR, config_dir_with};

pub const CLIENT_ID_ENV: &str = "WHOOP_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "WHOOP_CLIENT_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "WHOOP_ACCESS_TOKEN";

/// OAuth application credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Present only when both id and secret are non-empty.
    pub credentials: Option<Credentials>,
    /// Static token that takes precedence over the token file, with no expiry checks.
    pub access_token: Option<String>,
    pub config_dir: PathBuf,
}

impl Settings {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = match (non_empty(CLIENT_ID_ENV), non_empty(CLIENT_SECRET_ENV)) {
            (Some(client_id), Some(client_secret)) => Some(Credentials {
                client_id,
                client_secret,
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of {} and {} is set; token refresh and authorization are disabled",
                    CLIENT_ID_ENV,
                    CLIENT_SECRET_ENV
                );
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            credentials,
            access_token: non_empty(ACCESS_TOKEN_ENV),
            config_dir: config_dir_with(&lookup)?,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join(LOG_DIR)
    }

    /// Credentials, or an error naming the missing variables.
    pub fn require_credentials(&self) -> Result<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCredentials {
                missing: format!("{} and {}", CLIENT_ID_ENV, CLIENT_SECRET_ENV),
            })
    }
}
