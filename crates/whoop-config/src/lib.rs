//! Configuration for the WHOOP MCP server.
//!
//! Configuration is environment-only: OAuth client credentials, an optional
//! pre-provisioned access token, and the directory holding the token file
//! and logs.

pub mod error;
pub mod paths;
pub mod settings;

pub use error::{ConfigError, Result};
pub use paths::{CONFIG_DIR_ENV, config_dir, config_dir_with};
pub use settings::{
    ACCESS_TOKEN_ENV, CLIENT_ID_ENV, CLIENT_SECRET_ENV, Credentials, Settings,
};
