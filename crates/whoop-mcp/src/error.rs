//! Error types for the MCP server.

use thiserror::Error;

use crate::protocol::JsonRpcError;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// MCP-defined code for an unknown resource URI.
pub const RESOURCE_NOT_FOUND: i64 = -32002;

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to read from or write to the peer.
    #[error("transport error: {0}")]
    Transport(String),

    /// Message was not valid JSON-RPC.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request parameters did not match the method.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Peer closed the stream.
    #[error("connection closed")]
    ConnectionClosed,
}

impl McpError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invalid-params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// The JSON-RPC error object sent back to the client.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            Self::Protocol(_) | Self::Json(_) => JsonRpcError::parse_error(self.to_string()),
            Self::InvalidParams(msg) => JsonRpcError::invalid_params(msg.clone()),
            Self::MethodNotFound(method) => JsonRpcError::method_not_found(method),
            Self::UnknownTool(name) => {
                JsonRpcError::invalid_params(format!("Unknown tool: {}", name))
            }
            Self::UnknownResource(uri) => {
                JsonRpcError::new(RESOURCE_NOT_FOUND, format!("Resource not found: {}", uri))
            }
            Self::Transport(_) | Self::Io(_) | Self::ConnectionClosed => {
                JsonRpcError::internal(self.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McpError::transport("broken pipe");
        assert!(err.to_string().contains("transport"));
        assert!(err.to_string().contains("broken pipe"));
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(
            McpError::MethodNotFound("x".into()).to_rpc_error().code,
            JsonRpcError::METHOD_NOT_FOUND
        );
        assert_eq!(
            McpError::invalid_params("bad").to_rpc_error().code,
            JsonRpcError::INVALID_PARAMS
        );
        assert_eq!(
            McpError::UnknownTool("nope".into()).to_rpc_error().code,
            JsonRpcError::INVALID_PARAMS
        );
        assert_eq!(
            McpError::UnknownResource("oauth://nope".into())
                .to_rpc_error()
                .code,
            RESOURCE_NOT_FOUND
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert!(matches!(mcp_err, McpError::Json(_)));
        assert_eq!(mcp_err.to_rpc_error().code, JsonRpcError::PARSE_ERROR);
    }
}
