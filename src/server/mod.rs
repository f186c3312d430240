//! MCP stdio front end for the tool dispatcher.

pub mod protocol;
pub mod stdio;

pub use stdio::McpServer;
