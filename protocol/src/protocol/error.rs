use serde::{Deserialize, Serialize};

/// One reason an argument bag failed schema validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldIssue {
  /// Dotted path of the offending field; empty for the bag itself.
  pub field: String,
  pub reason: String,
}

impl FieldIssue {
  pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      reason: reason.into(),
    }
  }
}

impl std::fmt::Display for FieldIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.field.is_empty() {
      write!(f, "{}", self.reason)
    } else {
      write!(f, "{}: {}", self.field, self.reason)
    }
  }
}

/// Request-malformed errors. These are raised to the transport as protocol
/// errors instead of being folded into an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
  #[error("unknown tool: {name}")]
  UnknownOperation { name: String },

  #[error("invalid arguments for {operation}: {}", join_issues(.issues))]
  InvalidArguments {
    operation: String,
    issues: Vec<FieldIssue>,
  },
}

impl ProtocolError {
  /// Structured detail for the transport's error `data` field.
  pub fn detail(&self) -> serde_json::Value {
    match self {
      ProtocolError::UnknownOperation { name } => serde_json::json!({ "tool": name }),
      ProtocolError::InvalidArguments { operation, issues } => serde_json::json!({
        "tool": operation,
        "issues": issues,
      }),
    }
  }
}

fn join_issues(issues: &[FieldIssue]) -> String {
  issues
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_arguments_message_names_every_field() {
    let err = ProtocolError::InvalidArguments {
      operation: "search_packages".to_string(),
      issues: vec![
        FieldIssue::new("query", "is required"),
        FieldIssue::new("size", "must be at most 250"),
      ],
    };

    assert_eq!(
      err.to_string(),
      "invalid arguments for search_packages: query: is required; size: must be at most 250"
    );
    assert_eq!(err.detail()["issues"][1]["field"], "size");
  }
}
