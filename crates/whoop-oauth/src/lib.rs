//! OAuth 2.0 token lifecycle for the WHOOP API.
//!
//! Acquires tokens through the authorization-code flow, keeps them on disk
//! and renews them transparently before API calls.
//!
//! # Components
//!
//! - [`store`]: owner-only, atomically written token file
//! - [`refresh`]: refresh-token grant that always persists its result
//! - [`token_manager`]: validity gate behind the [`TokenProvider`] capability
//! - [`callback`]: single-use local listener for the OAuth redirect
//! - [`flow`]: per-attempt orchestrator tying the above to the browser

pub mod browser;
pub mod callback;
pub mod error;
pub mod flow;
pub mod oauth;
pub mod refresh;
pub mod store;
pub mod token;
pub mod token_manager;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use callback::{CallbackError, CallbackListener, CallbackOutcome};
pub use error::{OAuthError, Result};
pub use flow::{AUTH_TIMEOUT, AuthFlow, AuthResult};
pub use oauth::{DEFAULT_SCOPES, OAuthConfig, build_authorization_url, generate_state};
pub use refresh::TokenRefresher;
pub use store::TokenStore;
pub use token::Token;
pub use token_manager::{
    SharedTokenProvider, StaticToken, TokenInfo, TokenManager, TokenProvider, format_duration,
};
