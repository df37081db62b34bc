use serde_json::{Map, Value};

use crate::{
    error::ProtocolError,
    types::{ParamType, ToolArgs, ToolDef, ToolParam},
};

/// Check raw arguments against a tool's schema and fill in defaults.
///
/// `null` arguments count as an empty object, and a `null` field counts as
/// absent. Values are never coerced between kinds and out-of-range values are
/// rejected rather than clamped. Fields the schema does not declare are dropped.
pub fn validate(def: &ToolDef, arguments: &Value) -> Result<ToolArgs, ProtocolError> {
    let empty = Map::new();
    let raw = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ProtocolError::invalid_params(format!(
                "arguments for {} must be an object, got {}",
                def.name,
                kind_of(other)
            )));
        }
    };

    let mut out = Map::new();
    for param in &def.params {
        match raw.get(&param.name).filter(|v| !v.is_null()) {
            Some(value) => {
                check(param, value)?;
                out.insert(param.name.clone(), value.clone());
            }
            None => {
                if let Some(default) = &param.default {
                    out.insert(param.name.clone(), default.clone());
                } else if param.required {
                    return Err(ProtocolError::invalid_params(format!(
                        "missing required argument: {}",
                        param.name
                    )));
                }
            }
        }
    }

    Ok(ToolArgs::new(out))
}

fn check(param: &ToolParam, value: &Value) -> Result<(), ProtocolError> {
    match &param.ty {
        ParamType::String => {
            let s = value.as_str().ok_or_else(|| wrong_kind(param, value))?;
            if let Some(min) = param.min_length {
                if s.trim().chars().count() < min {
                    return Err(ProtocolError::invalid_params(if min == 1 {
                        format!("{} must not be empty", param.name)
                    } else {
                        format!("{} must be at least {} characters", param.name, min)
                    }));
                }
            }
        }
        ParamType::Integer => {
            let Some(n) = value.as_i64() else {
                // Integers past i64::MAX still parse as u64.
                return Err(if value.is_u64() {
                    out_of_range(param, value)
                } else {
                    wrong_kind(param, value)
                });
            };
            let below = param.minimum.is_some_and(|min| n < min);
            let above = param.maximum.is_some_and(|max| n > max);
            if below || above {
                return Err(out_of_range(param, n));
            }
        }
        ParamType::Enum(choices) => {
            let s = value.as_str().ok_or_else(|| wrong_kind(param, value))?;
            if !choices.iter().any(|c| c == s) {
                return Err(ProtocolError::invalid_params(format!(
                    "{} must be one of [{}], got \"{}\"",
                    param.name,
                    choices.join(", "),
                    s
                )));
            }
        }
    }
    Ok(())
}

fn wrong_kind(param: &ToolParam, value: &Value) -> ProtocolError {
    ProtocolError::invalid_params(format!(
        "{} must be {}, got {}",
        param.name,
        param.ty.json_type(),
        kind_of(value)
    ))
}

fn out_of_range(param: &ToolParam, n: impl std::fmt::Display) -> ProtocolError {
    let message = match (param.minimum, param.maximum) {
        (Some(min), Some(max)) => format!("{} must be between {min} and {max}, got {n}", param.name),
        (Some(min), None) => format!("{} must be at least {min}, got {n}", param.name),
        (None, Some(max)) => format!("{} must be at most {max}, got {n}", param.name),
        (None, None) => format!("{} is out of range, got {n}", param.name),
    };
    ProtocolError::invalid_params(message)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorCode;

    fn def() -> ToolDef {
        ToolDef {
            name: "demo".into(),
            description: "demo".into(),
            params: vec![
                ToolParam::string("prompt", "p").required().min_length(1),
                ToolParam::integer("slides", "s").range(1, 20).default_value(8),
                ToolParam::one_of("format", "f", &["pdf", "pptx"]).default_value("pdf"),
                ToolParam::string("note", "optional, no default"),
                ToolParam::integer("limit", "unbounded"),
            ],
        }
    }

    fn invalid(args: Value) -> String {
        let err = validate(&def(), &args).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        err.message
    }

    #[test]
    fn fills_defaults_and_keeps_supplied_values() {
        let args = validate(&def(), &json!({"prompt": "Rust"})).unwrap();
        assert_eq!(args.arg_str("prompt"), Some("Rust"));
        assert_eq!(args.arg_int("slides"), Some(8));
        assert_eq!(args.arg_str("format"), Some("pdf"));
        assert_eq!(args.get("note"), None);

        let args = validate(&def(), &json!({"prompt": "Rust", "slides": 20, "format": "pptx"})).unwrap();
        assert_eq!(args.arg_int("slides"), Some(20));
        assert_eq!(args.arg_str("format"), Some("pptx"));
    }

    #[test]
    fn null_field_counts_as_absent() {
        let args = validate(&def(), &json!({"prompt": "x", "slides": null})).unwrap();
        assert_eq!(args.arg_int("slides"), Some(8));
    }

    #[test]
    fn missing_required_field_is_named() {
        assert_eq!(invalid(json!({})), "missing required argument: prompt");
        assert_eq!(invalid(Value::Null), "missing required argument: prompt");
    }

    #[test]
    fn empty_or_blank_string_fails_min_length() {
        assert_eq!(invalid(json!({"prompt": ""})), "prompt must not be empty");
        assert_eq!(invalid(json!({"prompt": "   "})), "prompt must not be empty");
    }

    #[test]
    fn no_coercion_between_kinds() {
        assert!(invalid(json!({"prompt": "x", "slides": "8"})).contains("must be integer, got string"));
        assert!(invalid(json!({"prompt": "x", "slides": 8.5})).contains("got number"));
        assert!(invalid(json!({"prompt": 42})).contains("prompt must be string, got integer"));
    }

    #[test]
    fn bounds_are_enforced_not_clamped() {
        assert_eq!(
            invalid(json!({"prompt": "x", "slides": 0})),
            "slides must be between 1 and 20, got 0"
        );
        assert!(invalid(json!({"prompt": "x", "slides": 21})).contains("got 21"));
    }

    #[test]
    fn integers_beyond_i64_are_out_of_range() {
        assert_eq!(
            invalid(json!({"prompt": "x", "slides": u64::MAX})),
            format!("slides must be between 1 and 20, got {}", u64::MAX)
        );
        assert_eq!(
            invalid(json!({"prompt": "x", "limit": u64::MAX})),
            format!("limit is out of range, got {}", u64::MAX)
        );

        let args = validate(&def(), &json!({"prompt": "x", "limit": i64::MAX})).unwrap();
        assert_eq!(args.arg_int("limit"), Some(i64::MAX));
    }

    #[test]
    fn enum_match_is_case_sensitive() {
        assert!(invalid(json!({"prompt": "x", "format": "PDF"})).contains("one of [pdf, pptx]"));
        assert!(invalid(json!({"prompt": "x", "format": "docx"})).contains("docx"));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        assert!(invalid(json!(["prompt"])).contains("must be an object, got array"));
    }

    #[test]
    fn undeclared_fields_are_dropped() {
        let args = validate(&def(), &json!({"prompt": "x", "extra": true})).unwrap();
        assert_eq!(args.get("extra"), None);
    }
}
