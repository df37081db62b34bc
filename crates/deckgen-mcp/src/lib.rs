pub mod backend;
pub mod error;
pub mod registry;
pub mod tool;
pub mod tools;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

// Convenience re-exports so users only need `use deckgen_mcp::*` or individual items.
pub use backend::{Backend, BackendClient, BackendConfig, BackendError, BackendRequest, Method};
pub use error::{ErrorCode, ProtocolError};
pub use registry::ToolRegistry;
pub use tool::Tool;
pub use tools::catalog;
pub use types::{ParamType, ToolArgs, ToolCall, ToolContent, ToolDef, ToolParam, ToolResult};
pub use validate::validate;
