use anyhow::Context;

use super::{NOT_AVAILABLE, UNKNOWN, field, field_or, presentation_path};
use crate::{
    backend::{Backend, BackendRequest},
    tool::Tool,
    types::{ToolArgs, ToolDef, ToolParam, ToolResult},
};

/// Status indicator by lower-cased backend status.
const STATUS_GLYPHS: &[(&str, &str)] = &[
    ("completed", "✅"),
    ("failed", "❌"),
    ("processing", "⏳"),
    ("generating", "⏳"),
    ("pending", "🕒"),
    ("queued", "🕒"),
];

/// Indicator for any status missing from `STATUS_GLYPHS`.
const UNKNOWN_GLYPH: &str = "❓";

const READY_MESSAGE: &str = "🎉 Your presentation is ready! Use export_presentation to download it.";
const FAILED_MESSAGE: &str = "⚠️ Generation failed. Please try again with create_presentation.";
const PROCESSING_MESSAGE: &str = "⏳ Your presentation is still processing. Check back shortly.";

fn status_glyph(status: &str) -> &'static str {
    let key = status.to_lowercase();
    STATUS_GLYPHS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(UNKNOWN_GLYPH)
}

/// Message keyed by the exact, case-sensitive status.
fn status_message(status: &str) -> &'static str {
    match status {
        "completed" => READY_MESSAGE,
        "failed" => FAILED_MESSAGE,
        _ => PROCESSING_MESSAGE,
    }
}

/// Tool: report the generation status of one presentation.
pub struct GetPresentationStatusTool;

impl Tool for GetPresentationStatusTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "get_presentation_status".into(),
            description: "Check the generation status of a presentation.".into(),
            params: vec![
                ToolParam::string("presentation_id", "Id returned by create_presentation.")
                    .required()
                    .min_length(1),
            ],
        }
    }

    fn call(&self, args: &ToolArgs, backend: &dyn Backend) -> anyhow::Result<ToolResult> {
        let id = args.require_str("presentation_id")?;

        let body = backend
            .send(&BackendRequest::get(presentation_path(id)))
            .with_context(|| format!("failed to get status of presentation {id}"))?;

        let status = field(&body, "status");
        let status = status.as_deref().unwrap_or(UNKNOWN);

        let mut text = format!(
            "{glyph} Presentation status\n\
             \n\
             🆔 ID: {id}\n\
             📝 Title: {title}\n\
             📌 Status: {status}\n\
             📊 Slides: {slides}\n\
             🕐 Created: {created}\n\
             🕑 Updated: {updated}\n\
             \n\
             {message}",
            glyph = status_glyph(status),
            title = field_or(&body, "title", "Untitled"),
            slides = field_or(&body, "slide_count", NOT_AVAILABLE),
            created = field_or(&body, "created_at", UNKNOWN),
            updated = field_or(&body, "updated_at", UNKNOWN),
            message = status_message(status),
        );
        if let Some(url) = field(&body, "view_url") {
            text.push_str(&format!("\n🔗 View: {url}"));
        }

        Ok(ToolResult::text(text))
    }
}
