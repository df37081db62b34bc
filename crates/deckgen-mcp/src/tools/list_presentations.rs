use anyhow::Context;
use serde_json::Value;

use super::{NOT_AVAILABLE, PRESENTATIONS_PATH, UNKNOWN, field, field_or};
use crate::{
    backend::{Backend, BackendRequest},
    tool::Tool,
    types::{ToolArgs, ToolDef, ToolParam, ToolResult},
};

const EMPTY_MESSAGE: &str =
    "📭 No presentations found. Use create_presentation to generate your first one.";

/// Tool: list recent presentations.
pub struct ListPresentationsTool;

impl Tool for ListPresentationsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_presentations".into(),
            description: "List previously generated presentations.".into(),
            params: vec![
                ToolParam::integer("limit", "Maximum number of presentations to return.")
                    .default_value(10),
            ],
        }
    }

    fn call(&self, args: &ToolArgs, backend: &dyn Backend) -> anyhow::Result<ToolResult> {
        let limit = args.require_int("limit")?;

        let request = BackendRequest::get(PRESENTATIONS_PATH).with_query("limit", limit);
        let body = backend
            .send(&request)
            .context("failed to list presentations")?;

        // A missing or malformed collection is reported the same as an empty one.
        let items = body
            .get("presentations")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let Some((first, rest)) = items.split_first() else {
            return Ok(ToolResult::text(EMPTY_MESSAGE));
        };

        let result = rest
            .iter()
            .enumerate()
            .fold(ToolResult::text(format_item(1, first)), |result, (i, item)| {
                result.with_text(format_item(i + 2, item))
            });
        Ok(result)
    }
}

fn format_item(number: usize, item: &Value) -> String {
    let name = field(item, "title")
        .or_else(|| field(item, "presentation_id"))
        .or_else(|| field(item, "id"))
        .unwrap_or_else(|| "Untitled".to_string());

    format!(
        "{number}. {name}\n   \
         📌 Status: {}\n   \
         🕐 Created: {}\n   \
         📊 Slides: {}",
        field_or(item, "status", UNKNOWN),
        field_or(item, "created_at", UNKNOWN),
        field_or(item, "slide_count", NOT_AVAILABLE),
    )
}
