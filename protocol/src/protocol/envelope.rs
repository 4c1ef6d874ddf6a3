use serde::{Deserialize, Serialize};

/// Kind of a content segment. Only text is produced today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
  Text,
}

/// One ordered piece of an envelope's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentSegment {
  pub kind: SegmentKind,
  pub text: String,
}

impl ContentSegment {
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      kind: SegmentKind::Text,
      text: text.into(),
    }
  }
}

/// The single response shape returned for every runtime outcome of a tool
/// invocation.
///
/// `is_error == true` means the text describes the failure; otherwise the
/// content is the handler's nominal output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
  pub content: Vec<ContentSegment>,
  #[serde(rename = "isError")]
  pub is_error: bool,
}

impl ResponseEnvelope {
  pub fn success(text: impl Into<String>) -> Self {
    Self {
      content: vec![ContentSegment::text(text)],
      is_error: false,
    }
  }

  /// Failure envelope. An empty message is replaced so the caller never sees a
  /// contentless error.
  pub fn failure(message: impl Into<String>) -> Self {
    let mut message = message.into();
    if message.trim().is_empty() {
      message = "tool invocation failed without a message".to_string();
    }
    Self {
      content: vec![ContentSegment::text(message)],
      is_error: true,
    }
  }

  /// All text segments joined with newlines.
  pub fn text(&self) -> String {
    self
      .content
      .iter()
      .map(|segment| segment.text.as_str())
      .collect::<Vec<_>>()
      .join("\n")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn envelope_serializes_with_is_error_key() {
    let envelope = ResponseEnvelope::success("ok");
    let value = serde_json::to_value(&envelope).expect("serialize envelope");

    assert_eq!(
      value,
      serde_json::json!({
        "content": [{ "kind": "text", "text": "ok" }],
        "isError": false
      })
    );
  }

  #[test]
  fn empty_failure_message_is_replaced() {
    let envelope = ResponseEnvelope::failure("   ");
    assert!(envelope.is_error);
    assert!(!envelope.text().trim().is_empty());
  }
}
