use anyhow::Context;
use serde_json::json;

use super::{PRESENTATIONS_PATH, UNKNOWN, field, field_or};
use crate::{
    backend::{Backend, BackendRequest},
    tool::Tool,
    types::{ToolArgs, ToolDef, ToolParam, ToolResult},
};

/// Tool: start generating a presentation from a prompt.
pub struct CreatePresentationTool;

impl Tool for CreatePresentationTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "create_presentation".into(),
            description: "Generate a new AI presentation from a text prompt. Returns the \
                          presentation id to use with the other tools."
                .into(),
            params: vec![
                ToolParam::string("prompt", "Topic or instructions for the presentation.")
                    .required()
                    .min_length(1),
                ToolParam::integer("slides", "Number of slides to generate (1-20).")
                    .range(1, 20)
                    .default_value(8),
                ToolParam::string("language", "Language the slides are written in.")
                    .default_value("English"),
                ToolParam::string("theme", "Visual theme for the slides.").default_value("modern"),
            ],
        }
    }

    fn call(&self, args: &ToolArgs, backend: &dyn Backend) -> anyhow::Result<ToolResult> {
        let prompt = args.require_str("prompt")?;
        let slides = args.require_int("slides")?;
        let language = args.require_str("language")?;
        let theme = args.require_str("theme")?;

        let request = BackendRequest::post(format!("{PRESENTATIONS_PATH}/generate")).with_body(
            json!({
                "prompt": prompt,
                "slides": slides,
                "language": language,
                "theme": theme,
            }),
        );
        let body = backend
            .send(&request)
            .context("failed to create presentation")?;

        let id = field(&body, "presentation_id")
            .or_else(|| field(&body, "id"))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let status = field_or(&body, "status", UNKNOWN);

        Ok(ToolResult::text(format!(
            "✅ Presentation generation started\n\
             \n\
             📝 Prompt: {prompt}\n\
             📊 Slides: {slides}\n\
             🌐 Language: {language}\n\
             🎨 Theme: {theme}\n\
             \n\
             🆔 Presentation ID: {id}\n\
             📌 Status: {status}\n\
             \n\
             Use get_presentation_status with this id to follow progress."
        )))
    }
}
