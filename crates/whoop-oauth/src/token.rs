//! The persisted OAuth credential and the token endpoint response.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Safety margin before expiry during which a token is already treated as expired.
pub const EXPIRY_MARGIN: TimeDelta = TimeDelta::minutes(5);

/// One OAuth credential set.
///
/// Tokens are replaced wholesale on refresh or re-authorization, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,

    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Absolute expiry. `None` means no known expiry.
    #[serde(
        default,
        deserialize_with = "known_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Whether the token is expired, or will be within [`EXPIRY_MARGIN`].
    ///
    /// A token without a known expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + EXPIRY_MARGIN > expiry,
            None => false,
        }
    }

    /// Time left until expiry. Zero when the expiry is unknown, negative once passed.
    pub fn expires_in(&self) -> TimeDelta {
        self.expires_in_at(Utc::now())
    }

    pub fn expires_in_at(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.expiry {
            Some(expiry) => expiry - now,
            None => TimeDelta::zero(),
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// Files written by other tools may carry a zero timestamp ("0001-01-01T00:00:00Z")
// instead of omitting the field.
fn known_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(value.filter(|ts| ts.timestamp() > 0))
}

/// JSON body returned by the token endpoint for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a [`Token`] with an absolute expiry computed from `now`.
    pub fn into_token(self, now: DateTime<Utc>) -> Token {
        let expiry = (self.expires_in > 0).then(|| now + TimeDelta::seconds(self.expires_in));
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|s| !s.is_empty()),
            token_type: self.token_type,
            expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(delta: TimeDelta) -> Token {
        Token {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + delta),
        }
    }

    #[test]
    fn test_is_expired_margin() {
        assert!(token_expiring_in(TimeDelta::minutes(4)).is_expired());
        assert!(!token_expiring_in(TimeDelta::minutes(10)).is_expired());
        assert!(token_expiring_in(TimeDelta::minutes(-1)).is_expired());
    }

    #[test]
    fn test_unknown_expiry_never_expires() {
        let token = Token {
            expiry: None,
            ..token_expiring_in(TimeDelta::zero())
        };
        assert!(!token.is_expired());
        assert_eq!(token.expires_in(), TimeDelta::zero());
    }

    #[test]
    fn test_expires_in_tracks_wall_clock() {
        let token = token_expiring_in(TimeDelta::hours(1));
        let left = token.expires_in();
        assert!(left <= TimeDelta::hours(1));
        assert!(left > TimeDelta::minutes(59));
    }

    #[test]
    fn test_zero_timestamp_is_unknown_expiry() {
        let json = r#"{
            "access_token": "a",
            "refresh_token": "",
            "token_type": "Bearer",
            "expiry": "0001-01-01T00:00:00Z"
        }"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.expiry, None);
        assert_eq!(token.refresh_token, None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_file_field_names() {
        let token = token_expiring_in(TimeDelta::hours(1));
        let value = serde_json::to_value(&token).unwrap();
        for field in ["access_token", "refresh_token", "token_type", "expiry"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_response_into_token() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"new","refresh_token":"r2","token_type":"bearer","expires_in":3600,"scope":"offline"}"#,
        )
        .unwrap();
        let now = Utc::now();
        let token = response.into_token(now);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
        assert_eq!(token.expiry, Some(now + TimeDelta::seconds(3600)));
    }

    #[test]
    fn test_response_without_expires_in() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        let token = response.into_token(Utc::now());
        assert_eq!(token.expiry, None);
        assert_eq!(token.token_type, "Bearer");
    }
}
