use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ── Parameter schema ──────────────────────────────────────────────────────────

/// Kinds of value a tool parameter accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer,
    /// A string restricted to a fixed, case-sensitive set of values.
    Enum(Vec<String>),
}

impl ParamType {
    /// JSON Schema `type` keyword for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::String | ParamType::Enum(_) => "string",
        }
    }
}

/// A single parameter in a tool's input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub ty: ParamType,
    pub required: bool,
    /// Substituted when the caller omits the argument.
    pub default: Option<Value>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    /// Minimum length of a string after trimming surrounding whitespace.
    pub min_length: Option<usize>,
}

impl ToolParam {
    fn new(name: &str, description: &str, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
            required: false,
            default: None,
            minimum: None,
            maximum: None,
            min_length: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::String)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Integer)
    }

    pub fn one_of(name: &str, description: &str, choices: &[&str]) -> Self {
        let choices = choices.iter().map(|c| c.to_string()).collect();
        Self::new(name, description, ParamType::Enum(choices))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// JSON Schema fragment describing this parameter.
    pub fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.ty.json_type(),
            "description": self.description,
        });
        if let ParamType::Enum(choices) = &self.ty {
            schema["enum"] = json!(choices);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if let Some(min) = self.minimum {
            schema["minimum"] = json!(min);
        }
        if let Some(max) = self.maximum {
            schema["maximum"] = json!(max);
        }
        if let Some(len) = self.min_length {
            schema["minLength"] = json!(len);
        }
        schema
    }
}

// ── Tool definition ───────────────────────────────────────────────────────────

/// Static metadata that describes a tool to the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolDef {
    /// Render the parameter list as a JSON Schema `object`.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The entry advertised in a `tools/list` response.
    pub fn listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

// ── Tool call (assistant → server) ────────────────────────────────────────────

/// A request from the assistant to invoke a specific tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Raw JSON arguments, checked against the tool's schema before use.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Arguments that passed schema validation, with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn arg_int(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    /// A string argument the schema guarantees; errors if validation was bypassed.
    pub fn require_str(&self, key: &str) -> anyhow::Result<&str> {
        self.arg_str(key)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: {key}"))
    }

    pub fn require_int(&self, key: &str) -> anyhow::Result<i64> {
        self.arg_int(key)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: {key}"))
    }
}

// ── Tool result (server → assistant) ──────────────────────────────────────────

/// A content block inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            ToolContent::Text { text } => text,
        }
    }
}

/// The result of invoking a tool. Always carries at least one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    content: Vec<ToolContent>,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
        }
    }

    /// Append another text block.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(ToolContent::text(text));
        self
    }

    pub fn content(&self) -> &[ToolContent] {
        &self.content
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
