use log::{info, warn};

use crate::{
    backend::Backend,
    error::ProtocolError,
    tool::Tool,
    types::{ToolCall, ToolDef, ToolResult},
    validate::validate,
};

struct Entry {
    def: ToolDef,
    tool: Box<dyn Tool>,
}

/// Holds all registered tools and dispatches calls to the right one.
///
/// Definitions are captured at registration and kept in registration order.
/// The registry is read-only once built, so a shared reference can serve
/// concurrent dispatches.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. If a tool with the same name already exists it is
    /// replaced in place.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let entry = Entry {
            def: tool.def(),
            tool: Box::new(tool),
        };
        match self.entries.iter_mut().find(|e| e.def.name == entry.def.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Retrieve a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.entry(name).map(|e| e.tool.as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn defs(&self) -> Vec<ToolDef> {
        self.entries.iter().map(|e| e.def.clone()).collect()
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.def.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.def.name == name)
    }

    /// Resolve, validate and run a `ToolCall`.
    ///
    /// Unknown names yield `MethodNotFound` and schema violations yield
    /// `InvalidParams`; in both cases the backend is never contacted. Any
    /// handler failure that is not already a `ProtocolError` becomes
    /// `InternalError` carrying the original message.
    pub fn dispatch(
        &self,
        call: &ToolCall,
        backend: &dyn Backend,
    ) -> Result<ToolResult, ProtocolError> {
        let Some(entry) = self.entry(&call.name) else {
            warn!("[dispatch] unknown tool: {}", call.name);
            return Err(ProtocolError::method_not_found(format!(
                "unknown tool: {}",
                call.name
            )));
        };

        let args = validate(&entry.def, &call.arguments).inspect_err(|e| {
            warn!("[dispatch] {} rejected: {}", call.name, e.message);
        })?;

        info!("[dispatch] {}", call.name);

        entry.tool.call(&args, backend).map_err(|err| {
            let err = match err.downcast::<ProtocolError>() {
                Ok(protocol) => protocol,
                Err(other) => ProtocolError::internal(format!("{other:#}")),
            };
            warn!("[dispatch] {} failed: {}", call.name, err);
            err
        })
    }
}
