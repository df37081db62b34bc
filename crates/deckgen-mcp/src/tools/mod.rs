pub mod create_presentation;
pub mod export_presentation;
pub mod get_presentation_status;
pub mod list_presentations;

pub use create_presentation::CreatePresentationTool;
pub use export_presentation::ExportPresentationTool;
pub use get_presentation_status::GetPresentationStatusTool;
pub use list_presentations::ListPresentationsTool;

use serde_json::Value;

use crate::registry::ToolRegistry;

/// Collection endpoint of the presentation backend.
pub(crate) const PRESENTATIONS_PATH: &str = "/api/v1/presentations";

/// Shown for a missing text field.
pub const UNKNOWN: &str = "Unknown";
/// Shown for a missing numeric field.
pub const NOT_AVAILABLE: &str = "N/A";

/// Registry holding every presentation tool, in advertised order.
pub fn catalog() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CreatePresentationTool);
    registry.register(ListPresentationsTool);
    registry.register(ExportPresentationTool);
    registry.register(GetPresentationStatusTool);
    registry
}

/// Display text for a backend field.
///
/// Absent, `null` and empty-string values are treated as missing. Numbers are
/// always shown, including zero.
pub(crate) fn field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn field_or(value: &Value, key: &str, sentinel: &str) -> String {
    field(value, key).unwrap_or_else(|| sentinel.to_string())
}

/// Path of a single presentation, with the id percent-encoded.
pub(crate) fn presentation_path(id: &str) -> String {
    format!("{PRESENTATIONS_PATH}/{}", urlencoding::encode(id))
}
