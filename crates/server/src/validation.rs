//! Checks tool arguments against the `inputSchema` each tool advertises.

use jsonschema::error::ValidationErrorKind;
use rmcp::model::Tool;
use serde_json::Value;

const SUGGESTION_THRESHOLD: f64 = 0.7;

#[derive(Debug, PartialEq)]
enum Violation {
    UnknownArgument {
        name: String,
        closest: Option<String>,
    },
    MissingArgument(String),
    Schema(String),
}

impl Violation {
    fn describe(&self, declared: &[&str]) -> String {
        match self {
            Violation::UnknownArgument {
                name,
                closest: Some(closest),
            } => format!("unknown argument '{name}'; did you mean '{closest}'?"),
            Violation::UnknownArgument {
                name,
                closest: None,
            } if declared.is_empty() => format!("unknown argument '{name}'; this tool takes none"),
            Violation::UnknownArgument {
                name,
                closest: None,
            } => format!(
                "unknown argument '{name}'; expected one of: {}",
                declared.join(", ")
            ),
            Violation::MissingArgument(name) => format!("missing required argument '{name}'"),
            Violation::Schema(message) => message.clone(),
        }
    }
}

/// Validate `args` for `tool`.
///
/// The error is ready to show the caller. An unknown argument name is reported on its own since
/// it is almost always a typo; everything else is listed together.
pub fn validate_tool_arguments(tool: &Tool, args: &Value) -> Result<(), String> {
    let schema = Value::Object((*tool.input_schema).clone());
    let declared: Vec<&str> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let violations = collect_violations(&schema, &declared, args);
    if violations.is_empty() {
        return Ok(());
    }

    let unknown = violations
        .iter()
        .find(|v| matches!(v, Violation::UnknownArgument { .. }));
    if let Some(unknown) = unknown {
        return Err(format!("Invalid params: {}", unknown.describe(&declared)));
    }

    let details: Vec<String> = violations.iter().map(|v| v.describe(&declared)).collect();
    Err(format!("Invalid params: {}", details.join("; ")))
}

fn collect_violations(schema: &Value, declared: &[&str], args: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    let supplied = args.as_object();

    if let Some(supplied) = supplied {
        violations.extend(
            supplied
                .keys()
                .filter(|k| !declared.contains(&k.as_str()))
                .map(|name| Violation::UnknownArgument {
                    closest: closest_name(name, declared),
                    name: name.clone(),
                }),
        );
    }

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for name in required {
        if !supplied.is_some_and(|s| s.contains_key(name)) {
            violations.push(Violation::MissingArgument(name.to_string()));
        }
    }

    let Ok(validator) = jsonschema::validator_for(schema) else {
        return violations;
    };
    for error in validator.iter_errors(args) {
        // Required and additionalProperties are covered above with friendlier wording.
        if matches!(
            error.kind(),
            ValidationErrorKind::Required { .. } | ValidationErrorKind::AdditionalProperties { .. }
        ) {
            continue;
        }
        let at = error.instance_path().to_string();
        violations.push(Violation::Schema(if at.is_empty() {
            error.to_string()
        } else {
            format!("{at}: {error}")
        }));
    }
    violations
}

fn closest_name(unknown: &str, declared: &[&str]) -> Option<String> {
    declared
        .iter()
        .map(|name| (strsim::jaro(unknown, name), *name))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, name)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::JsonObject;
    use serde_json::json;
    use std::sync::Arc;

    fn tool() -> Tool {
        let schema = json!({
            "type": "object",
            "properties": {
                "method": {"type": "string", "enum": ["get", "post"]},
                "path": {"type": "string", "minLength": 1},
                "reload": {"type": "boolean"}
            },
            "required": ["method", "path"],
            "additionalProperties": false
        });
        let obj: JsonObject = serde_json::from_value(schema).expect("schema object");
        Tool::new("t", "test tool", Arc::new(obj))
    }

    #[test]
    fn accepts_valid_arguments() {
        validate_tool_arguments(&tool(), &json!({"method": "get", "path": "/x"})).expect("valid");
    }

    #[test]
    fn unknown_argument_names_the_closest_match() {
        let err = validate_tool_arguments(&tool(), &json!({"method": "get", "path": "/x", "pth": 1}))
            .expect_err("unknown");
        assert_eq!(err, "Invalid params: unknown argument 'pth'; did you mean 'path'?");

        let err = validate_tool_arguments(
            &tool(),
            &json!({"method": "get", "path": "/x", "zzzzzz": 1}),
        )
        .expect_err("unknown");
        assert_eq!(
            err,
            "Invalid params: unknown argument 'zzzzzz'; expected one of: method, path, reload"
        );
    }

    #[test]
    fn unknown_argument_wins_over_other_problems() {
        let err = validate_tool_arguments(&tool(), &json!({"pth": "/x"})).expect_err("bad");
        assert_eq!(err, "Invalid params: unknown argument 'pth'; did you mean 'path'?");
    }

    #[test]
    fn missing_and_schema_problems_are_listed_together() {
        let err = validate_tool_arguments(&tool(), &json!({"method": "delete"})).expect_err("bad");
        assert!(
            err.starts_with("Invalid params: missing required argument 'path'; /method: "),
            "{err}"
        );

        let err = validate_tool_arguments(&tool(), &json!({"method": "get", "path": ""}))
            .expect_err("empty path");
        assert!(err.starts_with("Invalid params: /path: "), "{err}");
        assert!(!err.contains(';'), "{err}");
    }

    #[test]
    fn non_object_arguments_fail_type_check() {
        let err = validate_tool_arguments(&tool(), &json!([1])).expect_err("array");
        assert!(err.contains("missing required argument 'method'"), "{err}");
    }
}
