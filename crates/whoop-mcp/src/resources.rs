//! Read-only MCP resources.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use whoop_oauth::oauth::{AUTHORIZE_URL, TOKEN_URL};

use crate::error::{McpError, Result};
use crate::protocol::{ResourceContents, ResourceInfo};

/// A static document served through `resources/read`.
pub trait Resource: Send + Sync {
    fn uri(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str> {
        None
    }
    fn mime_type(&self) -> Option<&str> {
        None
    }
    fn read(&self) -> Result<String>;

    fn info(&self) -> ResourceInfo {
        ResourceInfo {
            uri: self.uri().to_string(),
            name: self.name().to_string(),
            description: self.description().map(String::from),
            mime_type: self.mime_type().map(String::from),
        }
    }
}

/// Resources keyed by URI.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R: Resource + 'static>(&mut self, resource: R) {
        self.resources
            .insert(resource.uri().to_string(), Arc::new(resource));
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn list(&self) -> Vec<ResourceInfo> {
        self.resources.values().map(|r| r.info()).collect()
    }

    pub fn read(&self, uri: &str) -> Result<ResourceContents> {
        let resource = self
            .resources
            .get(uri)
            .ok_or_else(|| McpError::UnknownResource(uri.to_string()))?;
        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: resource.mime_type().map(String::from),
            text: resource.read()?,
        })
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// oauth://config
// ─────────────────────────────────────────────────────────────────────────────

pub const OAUTH_CONFIG_URI: &str = "oauth://config";

/// Data scopes and what they grant.
pub const SCOPES: [(&str, &str); 6] = [
    ("read:recovery", "Read Recovery data (HRV, resting HR, recovery score)"),
    ("read:cycles", "Read physiological cycles (strain, day boundaries)"),
    ("read:workout", "Read workout data (activities, heart rate zones)"),
    ("read:sleep", "Read sleep data (stages, efficiency, duration)"),
    ("read:profile", "Read user profile (name, email)"),
    ("read:body_measurement", "Read body measurements (height, weight, max HR)"),
];

/// OAuth endpoints and scopes, for clients setting up their own app.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuthConfigResource;

impl Resource for OAuthConfigResource {
    fn uri(&self) -> &str {
        OAUTH_CONFIG_URI
    }

    fn name(&self) -> &str {
        "WHOOP OAuth Configuration"
    }

    fn description(&self) -> Option<&str> {
        Some(
            "OAuth 2.0 configuration for WHOOP API authentication. Use this to understand \
             required scopes and endpoints.",
        )
    }

    fn mime_type(&self) -> Option<&str> {
        Some("application/json")
    }

    fn read(&self) -> Result<String> {
        let scopes: BTreeMap<&str, &str> = SCOPES.into_iter().collect();
        let config = json!({
            "authorization_url": AUTHORIZE_URL,
            "token_url": TOKEN_URL,
            "scopes": scopes,
        });
        Ok(serde_json::to_string(&config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_config_resource() {
        let mut registry = ResourceRegistry::new();
        registry.register(OAuthConfigResource);

        let list = registry.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].uri, "oauth://config");
        assert_eq!(list[0].mime_type.as_deref(), Some("application/json"));

        let contents = registry.read("oauth://config").unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents.text).unwrap();
        assert_eq!(
            value["authorization_url"],
            "https://api.prod.whoop.com/oauth/oauth2/auth"
        );
        assert_eq!(value["scopes"].as_object().unwrap().len(), 6);
        assert!(value["scopes"]["read:sleep"].is_string());
    }

    #[test]
    fn test_unknown_resource() {
        let registry = ResourceRegistry::new();
        assert!(matches!(
            registry.read("oauth://nope"),
            Err(McpError::UnknownResource(_))
        ));
    }
}
