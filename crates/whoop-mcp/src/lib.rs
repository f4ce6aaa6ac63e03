//! Model Context Protocol server for the WHOOP API.
//!
//! Speaks JSON-RPC 2.0 over stdio. Each WHOOP endpoint is a tool, two more
//! tools report and obtain authorization, and `oauth://config` describes the
//! OAuth setup.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use whoop_client::WhoopClient;
//! use whoop_mcp::{McpServer, ResourceRegistry, OAuthConfigResource, ToolRegistry};
//!
//! # async fn run() -> whoop_mcp::Result<()> {
//! let client = WhoopClient::builder().access_token("token").build().unwrap();
//! let mut tools = ToolRegistry::new();
//! whoop_mcp::tools::register_api_tools(&mut tools, &client);
//! let mut resources = ResourceRegistry::new();
//! resources.register(OAuthConfigResource);
//!
//! let server = McpServer::new("whoop-mcp", "0.1.0")
//!     .with_tools(tools)
//!     .with_resources(resources);
//! Arc::new(server).serve_stdio(CancellationToken::new()).await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tool;
pub mod tools;
pub mod transport;

pub use error::{McpError, Result};
pub use protocol::MCP_PROTOCOL_VERSION;
pub use resources::{OAuthConfigResource, Resource, ResourceRegistry};
pub use server::McpServer;
pub use tool::{Tool, ToolArgs, ToolContext, ToolRegistry};
pub use transport::{Framing, Message, MessageReader, MessageWriter};
