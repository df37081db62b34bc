use crate::{
    backend::Backend,
    types::{ToolArgs, ToolDef, ToolResult},
};

/// A tool that can be registered with the registry and called by the assistant.
///
/// # Example
/// ```rust
/// use deckgen_mcp::{Backend, Tool, ToolArgs, ToolDef, ToolParam, ToolResult};
///
/// struct EchoTool;
///
/// impl Tool for EchoTool {
///     fn def(&self) -> ToolDef {
///         ToolDef {
///             name: "echo".into(),
///             description: "Return the input unchanged.".into(),
///             params: vec![ToolParam::string("text", "Text to echo.").required()],
///         }
///     }
///
///     fn call(&self, args: &ToolArgs, _backend: &dyn Backend) -> anyhow::Result<ToolResult> {
///         Ok(ToolResult::text(args.require_str("text")?))
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// Static metadata: name, description, parameter schema.
    fn def(&self) -> ToolDef;

    /// Invoke the tool with arguments that already passed `def()`'s schema.
    ///
    /// Errors that are not a `ProtocolError` are reported as internal errors.
    fn call(&self, args: &ToolArgs, backend: &dyn Backend) -> anyhow::Result<ToolResult>;
}
