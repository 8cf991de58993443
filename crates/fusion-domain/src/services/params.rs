//! Execution parameter parsing and coercion.

use std::collections::BTreeMap;

use fusion_client::FieldSchema;
use serde_json::{Map, Value};

use crate::error::{DomainError, Result};

/// Parse a JSON object of execution parameters. Blank input is an empty set.
pub fn parse_params_json(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DomainError::InvalidParameter {
            name: "params".to_string(),
            message: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(DomainError::InvalidParameter {
            name: "params".to_string(),
            message: e.to_string(),
        }),
    }
}

/// Convert a typed-in answer to the JSON type a schema field declares.
///
/// Arrays accept JSON or a comma-separated list; booleans accept
/// `true`, `1` or `yes` as true and anything else as false.
pub fn coerce_value(name: &str, field_type: Option<&str>, raw: &str) -> Result<Value> {
    let invalid = |message: String| DomainError::InvalidParameter {
        name: name.to_string(),
        message,
    };

    match field_type.unwrap_or("string") {
        "integer" => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(format!("'{}' is not an integer: {}", raw, e))),
        "number" => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid(format!("'{}' is not a number", raw))),
        "boolean" => Ok(Value::Bool(matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "1" | "yes"
        ))),
        "array" => Ok(match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => Value::Array(items),
            _ => Value::Array(
                raw.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            ),
        }),
        "object" => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Value::Object(map)),
            Ok(other) => Err(invalid(format!("expected a JSON object, got {}", json_kind(&other)))),
            Err(e) => Err(invalid(e.to_string())),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// Ask for every schema field in order and coerce the answers.
///
/// `ask` receives a prompt and returns the answer; blank answers leave the
/// field out.
pub fn collect_params<F>(schema: &BTreeMap<String, FieldSchema>, mut ask: F) -> Result<Map<String, Value>>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut params = Map::new();
    for (name, field) in schema {
        let title = field.title.as_deref().unwrap_or(name);
        let field_type = field.field_type.as_deref().unwrap_or("string");
        let kind = if field.required {
            format!("{}, required", field_type)
        } else {
            field_type.to_string()
        };
        let prompt = match field.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!("{} ({}) - {}: ", title, kind, description),
            None => format!("{} ({}): ", title, kind),
        };

        let Some(answer) = ask(&prompt).filter(|a| !a.trim().is_empty()) else {
            continue;
        };
        params.insert(name.clone(), coerce_value(name, Some(field_type), answer.trim())?);
    }
    Ok(params)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_params_json() {
        assert_eq!(
            parse_params_json(r#"{"device_id": "abc"}"#).unwrap()["device_id"],
            json!("abc")
        );
        assert!(parse_params_json("  ").unwrap().is_empty());
        assert!(parse_params_json("[1, 2]").is_err());
        assert!(parse_params_json("{oops").is_err());
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_value("n", Some("integer"), "42").unwrap(), json!(42));
        assert!(coerce_value("n", Some("integer"), "forty").is_err());
        assert_eq!(coerce_value("f", Some("number"), "1.5").unwrap(), json!(1.5));
        assert_eq!(coerce_value("b", Some("boolean"), "YES").unwrap(), json!(true));
        assert_eq!(coerce_value("b", Some("boolean"), "nope").unwrap(), json!(false));
        assert_eq!(coerce_value("a", Some("array"), "[1,2]").unwrap(), json!([1, 2]));
        assert_eq!(coerce_value("a", Some("array"), "x, y").unwrap(), json!(["x", "y"]));
        assert_eq!(coerce_value("o", Some("object"), r#"{"k":1}"#).unwrap(), json!({"k": 1}));
        assert!(coerce_value("o", Some("object"), "[]").is_err());
        assert_eq!(coerce_value("s", None, "text").unwrap(), json!("text"));
    }

    #[test]
    fn test_collect_params_skips_blank_answers() {
        let mut schema = BTreeMap::new();
        schema.insert(
            "count".to_string(),
            FieldSchema {
                field_type: Some("integer".to_string()),
                title: Some("Count".to_string()),
                ..Default::default()
            },
        );
        schema.insert(
            "note".to_string(),
            FieldSchema {
                required: true,
                ..Default::default()
            },
        );

        let mut prompts = Vec::new();
        let params = collect_params(&schema, |prompt| {
            prompts.push(prompt.to_string());
            if prompt.starts_with("Count") {
                Some("3".to_string())
            } else {
                Some(String::new())
            }
        })
        .unwrap();

        assert_eq!(params.len(), 1);
        assert_eq!(params["count"], json!(3));
        assert_eq!(prompts, vec!["Count (integer): ", "note (string, required): "]);
    }
}
