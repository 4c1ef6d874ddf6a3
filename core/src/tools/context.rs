use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::deadline::DeadlineExceeded;
use crate::gate::Abandoned;
use crate::updates::ResolverError;

/// Invocation payload passed to a tool handler.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
  pub id: String,
  pub name: String,
  /// Arguments after validation, defaults filled in.
  pub arguments: Value,
  /// Cancelled when the invocation deadline fires.
  pub abandon: CancellationToken,
}

impl ToolInvocation {
  pub fn new(name: impl Into<String>, arguments: Value) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      name: name.into(),
      arguments,
      abandon: CancellationToken::new(),
    }
  }

  pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
    serde_json::from_value(self.arguments.clone()).map_err(|e| {
      ToolError::HandlerFailure(format!("invalid arguments for {}: {e}", self.name))
    })
  }
}

/// Successful output of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
  pub content: String,
}

impl ToolOutput {
  pub fn text(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
    }
  }
}

/// Failures a handler reports. Each becomes an error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
  #[error("registry returned HTTP {status} for {url}")]
  UpstreamHttp { status: u16, url: String },
  #[error(transparent)]
  UpstreamTimeout(#[from] DeadlineExceeded),
  #[error("{0}")]
  HandlerFailure(String),
}

impl ToolError {
  pub fn failure(message: impl Into<String>) -> Self {
    ToolError::HandlerFailure(message.into())
  }

  pub(crate) fn request_failed(url: &str, err: reqwest::Error) -> Self {
    ToolError::HandlerFailure(format!("request to {url} failed: {err}"))
  }
}

impl From<Abandoned> for ToolError {
  fn from(value: Abandoned) -> Self {
    ToolError::HandlerFailure(value.to_string())
  }
}

impl From<ResolverError> for ToolError {
  fn from(value: ResolverError) -> Self {
    ToolError::HandlerFailure(value.to_string())
  }
}
