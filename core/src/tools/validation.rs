//! Argument-bag validation against a tool's [`JsonSchema`].
//!
//! Validation collects every problem instead of stopping at the first, and on
//! success returns a copy of the arguments with schema defaults filled in.

use serde_json::{Map, Value};

use pkgwatch_protocol::FieldIssue;

use crate::tools::spec::JsonSchema;

/// Check `arguments` against an object schema.
///
/// A missing argument bag counts as an empty object.
pub fn validate_arguments(schema: &JsonSchema, arguments: Option<Value>) -> Result<Value, Vec<FieldIssue>> {
  let JsonSchema::Object {
    properties,
    required,
    additional_properties,
  } = schema
  else {
    return Ok(arguments.unwrap_or(Value::Null));
  };

  let mut bag = match arguments {
    None | Some(Value::Null) => Map::new(),
    Some(Value::Object(bag)) => bag,
    Some(other) => {
      return Err(vec![FieldIssue::new(
        "arguments",
        format!("expected an object, got {}", kind_of(&other)),
      )]);
    }
  };

  let mut issues = Vec::new();

  for field in required.iter().flatten() {
    if bag.get(field).is_none_or(Value::is_null) {
      issues.push(FieldIssue::new(field, "is required"));
    }
  }

  if !additional_properties {
    for key in bag.keys() {
      if !properties.contains_key(key) {
        issues.push(FieldIssue::new(key, "is not a recognized argument"));
      }
    }
  }

  for (field, field_schema) in properties {
    match bag.get(field) {
      None | Some(Value::Null) => {
        if let JsonSchema::Integer {
          default: Some(default),
          ..
        } = field_schema
        {
          bag.insert(field.clone(), Value::from(*default));
        }
      }
      Some(value) => {
        if let Some(reason) = check_value(field_schema, value) {
          issues.push(FieldIssue::new(field, reason));
        }
      }
    }
  }

  if issues.is_empty() {
    bag.retain(|_, value| !value.is_null());
    Ok(Value::Object(bag))
  } else {
    Err(issues)
  }
}

fn check_value(schema: &JsonSchema, value: &Value) -> Option<String> {
  match schema {
    JsonSchema::String {
      allowed,
      min_length,
      max_length,
      ..
    } => {
      let Some(text) = value.as_str() else {
        return Some(format!("expected a string, got {}", kind_of(value)));
      };
      let length = text.chars().count();
      if let Some(min) = min_length
        && (length < *min || text.trim().is_empty())
      {
        return Some("must not be empty".to_string());
      }
      if let Some(max) = max_length
        && length > *max
      {
        return Some(format!("must be at most {max} characters"));
      }
      if let Some(allowed) = allowed
        && !allowed.iter().any(|candidate| candidate == text)
      {
        return Some(format!("must be one of: {}", allowed.join(", ")));
      }
      None
    }
    JsonSchema::Integer {
      minimum, maximum, ..
    } => {
      let Some(number) = value.as_i64() else {
        return Some(format!("expected an integer, got {}", kind_of(value)));
      };
      match (minimum, maximum) {
        (Some(min), Some(max)) if number < *min || number > *max => {
          Some(format!("must be between {min} and {max}"))
        }
        (Some(min), None) if number < *min => Some(format!("must be at least {min}")),
        (None, Some(max)) if number > *max => Some(format!("must be at most {max}")),
        _ => None,
      }
    }
    JsonSchema::Boolean { .. } => {
      (!value.is_boolean()).then(|| format!("expected a boolean, got {}", kind_of(value)))
    }
    JsonSchema::Object { .. } => {
      (!value.is_object()).then(|| format!("expected an object, got {}", kind_of(value)))
    }
  }
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use pkgwatch_config::Config;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;
  use crate::tools::spec::{CHECK_UPDATES, SEARCH_PACKAGES, ToolSpec, build_specs};

  fn schema(name: &str) -> JsonSchema {
    build_specs(&Config::default())
      .into_iter()
      .find(|spec: &ToolSpec| spec.name == name)
      .map(|spec| spec.input_schema)
      .expect("known tool")
  }

  #[test]
  fn defaults_are_applied() {
    let validated = validate_arguments(&schema(SEARCH_PACKAGES), Some(json!({ "query": "react" })));
    assert_eq!(validated, Ok(json!({ "query": "react", "size": 10 })));
  }

  #[test]
  fn every_problem_is_reported_with_its_field() {
    let issues = validate_arguments(
      &schema(SEARCH_PACKAGES),
      Some(json!({ "size": 900, "colour": "red" })),
    )
    .expect_err("invalid");

    assert_eq!(
      issues,
      vec![
        FieldIssue::new("query", "is required"),
        FieldIssue::new("colour", "is not a recognized argument"),
        FieldIssue::new("size", "must be between 1 and 250"),
      ]
    );
  }

  #[test]
  fn wrong_types_are_rejected() {
    let issues = validate_arguments(
      &schema(SEARCH_PACKAGES),
      Some(json!({ "query": 5, "size": 2.5 })),
    )
    .expect_err("invalid");

    assert_eq!(
      issues,
      vec![
        FieldIssue::new("query", "expected a string, got an integer"),
        FieldIssue::new("size", "expected an integer, got a number"),
      ]
    );
  }

  #[test]
  fn enum_values_are_enforced() {
    let issues = validate_arguments(&schema(CHECK_UPDATES), Some(json!({ "target": "newer" })))
      .expect_err("invalid");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field, "target");
    assert!(issues[0].reason.starts_with("must be one of: latest, newest"));
  }

  #[test]
  fn missing_bag_is_an_empty_object() {
    assert_eq!(validate_arguments(&schema(CHECK_UPDATES), None), Ok(json!({})));

    let issues = validate_arguments(&schema(CHECK_UPDATES), Some(json!([1, 2])))
      .expect_err("not an object");
    assert_eq!(issues[0].field, "arguments");
  }

  #[test]
  fn package_names_are_bounded() {
    let package_schema = build_specs(&Config::default())
      .into_iter()
      .find(|spec| spec.name == "package_versions")
      .map(|spec| spec.input_schema)
      .expect("known tool");

    let too_long = "a".repeat(215);
    let issues = validate_arguments(&package_schema, Some(json!({ "package": too_long })))
      .expect_err("too long");
    assert_eq!(issues, vec![FieldIssue::new("package", "must be at most 214 characters")]);

    let issues = validate_arguments(&package_schema, Some(json!({ "package": "  " })))
      .expect_err("blank");
    assert_eq!(issues, vec![FieldIssue::new("package", "must not be empty")]);
  }
}
