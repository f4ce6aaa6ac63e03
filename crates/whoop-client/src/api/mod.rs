//! API endpoint implementations.

mod activity;
mod cycles;
mod recovery;
mod sleep;
mod user;
mod workouts;

pub use activity::ActivityApi;
pub use cycles::CyclesApi;
pub use recovery::RecoveryApi;
pub use sleep::SleepApi;
pub use user::UserApi;
pub use workouts::WorkoutsApi;

use serde::Serialize;

use crate::error::{Error, Result};

/// Largest page size the API accepts.
pub const MAX_LIMIT: i64 = 25;

/// Query parameters shared by every collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionQuery {
    /// ISO 8601 lower bound (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// ISO 8601 upper bound (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Page size. Values above [`MAX_LIMIT`] are clamped; non-positive
    /// values are left out of the request.
    #[serde(
        skip_serializing_if = "limit_is_unset",
        serialize_with = "serialize_limit"
    )]
    pub limit: Option<i64>,
    /// Token from the previous page's `next_token`.
    #[serde(rename = "nextToken", skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// The page size actually sent, if any.
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.filter(|l| *l > 0).map(|l| l.min(MAX_LIMIT))
    }
}

fn limit_is_unset(limit: &Option<i64>) -> bool {
    !matches!(limit, Some(l) if *l > 0)
}

fn serialize_limit<S: serde::Serializer>(limit: &Option<i64>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match limit {
        Some(l) => s.serialize_i64((*l).min(MAX_LIMIT)),
        None => s.serialize_none(),
    }
}

/// Reject non-positive numeric ids before building a request.
pub(crate) fn validate_id(kind: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(Error::InvalidArgument(format!("invalid {} ID: {}", kind, id)));
    }
    Ok(())
}

/// Accept only the canonical hyphenated UUID form.
pub(crate) fn validate_uuid(kind: &str, id: &str) -> Result<()> {
    if id.len() != 36 || uuid::Uuid::try_parse(id).is_err() {
        return Err(Error::InvalidArgument(format!(
            "invalid {} ID: must be a valid UUID",
            kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(query: &CollectionQuery) -> String {
        let client = reqwest::Client::new();
        let request = client.get("http://x/").query(query).build().unwrap();
        request.url().query().unwrap_or_default().to_string()
    }

    #[test]
    fn test_limit_clamped() {
        let query = CollectionQuery::new().limit(100);
        assert_eq!(query.effective_limit(), Some(25));
        assert_eq!(encode(&query), "limit=25");
    }

    #[test]
    fn test_non_positive_limit_omitted() {
        assert_eq!(encode(&CollectionQuery::new().limit(0)), "");
        assert_eq!(encode(&CollectionQuery::new().limit(-3)), "");
        assert_eq!(CollectionQuery::new().limit(-3).effective_limit(), None);
    }

    #[test]
    fn test_all_params() {
        let query = CollectionQuery::new()
            .start("2024-01-01T00:00:00Z")
            .end("2024-01-31T00:00:00Z")
            .limit(10)
            .next_token("abc");
        let encoded = encode(&query);
        assert!(encoded.contains("start=2024-01-01T00%3A00%3A00Z"));
        assert!(encoded.contains("end=2024-01-31T00%3A00%3A00Z"));
        assert!(encoded.contains("limit=10"));
        assert!(encoded.contains("nextToken=abc"));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("sleep", "ecfc6a15-4661-442f-a9a4-f160dd7afae8").is_ok());
        assert!(validate_uuid("sleep", "ECFC6A15-4661-442F-A9A4-F160DD7AFAE8").is_ok());
        assert!(validate_uuid("sleep", "ecfc6a154661442fa9a4f160dd7afae8").is_err());
        assert!(validate_uuid("sleep", "not-a-uuid").is_err());
        assert!(validate_uuid("sleep", "").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("cycle", 1).is_ok());
        assert!(validate_id("cycle", 0).is_err());
        assert!(validate_id("cycle", -5).is_err());
    }
}
