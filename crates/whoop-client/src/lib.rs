//! Typed HTTP client for the WHOOP developer API.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use whoop_client::{CollectionQuery, WhoopClient};
//! use whoop_oauth::{TokenManager, TokenStore};
//!
//! # async fn example() -> whoop_client::Result<()> {
//! let manager = TokenManager::read_only(TokenStore::new("/home/me/.whoop/token.json"));
//! let client = WhoopClient::builder()
//!     .token_provider(Arc::new(manager))
//!     .build()?;
//!
//! let cycles = client.cycles().list(&CollectionQuery::new().limit(5)).await?;
//! for cycle in cycles.records {
//!     println!("{} {:?}", cycle.id, cycle.score.map(|s| s.strain));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Credentials
//!
//! A token passed to [`ClientBuilder::access_token`] is sent verbatim on
//! every request. Otherwise a [`whoop_oauth::TokenProvider`] is asked for a
//! token before each request, which may refresh it. With neither, requests
//! go out without an `Authorization` header.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{CollectionQuery, MAX_LIMIT};
pub use client::{BASE_URL, ClientBuilder, WhoopClient};
pub use error::{Error, Result};
pub use types::*;
