use anyhow::Context;

use super::{field_or, presentation_path};
use crate::{
    backend::{Backend, BackendRequest},
    tool::Tool,
    types::{ToolArgs, ToolDef, ToolParam, ToolResult},
};

/// Shown while the backend has not produced a download link yet.
const PENDING: &str = "Pending";

/// Tool: export a presentation to a downloadable file.
pub struct ExportPresentationTool;

impl Tool for ExportPresentationTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "export_presentation".into(),
            description: "Export a generated presentation as PDF or PPTX and return a download link."
                .into(),
            params: vec![
                ToolParam::string("presentation_id", "Id returned by create_presentation.")
                    .required()
                    .min_length(1),
                ToolParam::one_of("format", "Export file format.", &["pdf", "pptx"])
                    .default_value("pdf"),
            ],
        }
    }

    fn call(&self, args: &ToolArgs, backend: &dyn Backend) -> anyhow::Result<ToolResult> {
        let id = args.require_str("presentation_id")?;
        let format = args.require_str("format")?;

        let request = BackendRequest::post(format!("{}/export", presentation_path(id)))
            .with_query("format", format);
        let body = backend
            .send(&request)
            .with_context(|| format!("failed to export presentation {id}"))?;

        Ok(ToolResult::text(format!(
            "📤 Presentation export\n\
             \n\
             🆔 Presentation ID: {id}\n\
             📄 Format: {}\n\
             🔗 Download URL: {}",
            format.to_uppercase(),
            field_or(&body, "download_url", PENDING),
        )))
    }
}
