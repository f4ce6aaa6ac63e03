//! Tools exposed by the WHOOP MCP server.

pub mod api;
pub mod auth;

pub use api::{ApiTool, DEFAULT_LIMIT, Endpoint, format_error, register_api_tools};
pub use auth::{AuthContext, AuthStatus, AuthStatusTool, AuthorizeTool, register_auth_tools};
