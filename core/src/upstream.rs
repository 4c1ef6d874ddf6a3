//! HTTP client for the npm registry and the npmjs.com website.
//!
//! Every request takes a slot from the shared [`PacedGate`] first, then runs
//! send plus body read under a per-call deadline. Bodies are read chunk by
//! chunk and refused once they pass the configured byte limit.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pkgwatch_config::{RegistryConfig, TimeoutConfig};

use crate::deadline::with_deadline;
use crate::gate::PacedGate;
use crate::tools::context::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum ClientSetupError {
  #[error("invalid {key} {value:?}: {reason}")]
  InvalidUrl {
    key: &'static str,
    value: String,
    reason: String,
  },
  #[error("cannot build HTTP client: {0}")]
  Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
  http: Client,
  gate: Arc<PacedGate>,
  registry_url: Url,
  website_url: Url,
  max_body_bytes: usize,
  search_timeout: Duration,
  package_timeout: Duration,
  page_timeout: Duration,
}

impl RegistryClient {
  pub fn new(
    registry: &RegistryConfig,
    timeouts: &TimeoutConfig,
    gate: Arc<PacedGate>,
  ) -> Result<Self, ClientSetupError> {
    let http = Client::builder().user_agent(&registry.user_agent).build()?;
    Ok(Self {
      http,
      gate,
      registry_url: base_url("registry.registry_url", &registry.registry_url)?,
      website_url: base_url("registry.website_url", &registry.website_url)?,
      max_body_bytes: registry.max_body_bytes,
      search_timeout: timeouts.search(),
      package_timeout: timeouts.package(),
      page_timeout: timeouts.page(),
    })
  }

  pub fn gate(&self) -> &Arc<PacedGate> {
    &self.gate
  }

  /// `GET {registry}/-/v1/search?text=..&size=..`
  pub async fn search(
    &self,
    text: &str,
    size: u32,
    abandon: &CancellationToken,
  ) -> Result<Value, ToolError> {
    let mut url = endpoint(&self.registry_url, &["-", "v1", "search"]);
    url
      .query_pairs_mut()
      .append_pair("text", text)
      .append_pair("size", &size.to_string());

    let body = self
      .fetch("registry search", url, self.search_timeout, abandon)
      .await?;
    parse_json(&body, "search response")
  }

  /// Full packument for `package`.
  pub async fn packument(&self, package: &str, abandon: &CancellationToken) -> Result<Value, ToolError> {
    let url = packument_url(&self.registry_url, package);
    let body = self
      .fetch("registry packument", url, self.package_timeout, abandon)
      .await?;
    parse_json(&body, "packument")
  }

  /// HTML of the package's website page.
  pub async fn package_page(&self, package: &str, abandon: &CancellationToken) -> Result<String, ToolError> {
    let mut segments = vec!["package"];
    segments.extend(package.split('/'));
    let url = endpoint(&self.website_url, &segments);

    let body = self
      .fetch("package page", url, self.page_timeout, abandon)
      .await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
  }

  async fn fetch(
    &self,
    operation: &str,
    url: Url,
    timeout: Duration,
    abandon: &CancellationToken,
  ) -> Result<Vec<u8>, ToolError> {
    let ticket = self.gate.acquire_unless(abandon).await?;
    debug!(
      operation,
      url = %url,
      waited_ms = ticket.waited.as_millis() as u64,
      "dispatching upstream request"
    );
    with_deadline(operation, timeout, self.send_and_read(url)).await?
  }

  async fn send_and_read(&self, url: Url) -> Result<Vec<u8>, ToolError> {
    let display = url.to_string();
    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|err| ToolError::request_failed(&display, err))?;

    let status = response.status();
    if !status.is_success() {
      return Err(ToolError::UpstreamHttp {
        status: status.as_u16(),
        url: display,
      });
    }

    if let Some(length) = response.content_length()
      && length > self.max_body_bytes as u64
    {
      return Err(self.too_large(&display));
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(|err| ToolError::request_failed(&display, err))?;
      if body.len() + chunk.len() > self.max_body_bytes {
        return Err(self.too_large(&display));
      }
      body.extend_from_slice(&chunk);
    }
    Ok(body)
  }

  fn too_large(&self, url: &str) -> ToolError {
    ToolError::failure(format!(
      "response from {url} exceeds the {} byte limit",
      self.max_body_bytes
    ))
  }
}

fn base_url(key: &'static str, raw: &str) -> Result<Url, ClientSetupError> {
  let invalid = |reason: String| ClientSetupError::InvalidUrl {
    key,
    value: raw.to_string(),
    reason,
  };
  let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
  if url.cannot_be_a_base() {
    return Err(invalid("cannot be used as a base URL".to_string()));
  }
  Ok(url)
}

/// `base` with `segments` appended as percent-encoded path segments.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url
}

/// Registry URL for a package. The slash of a scoped name is encoded, giving
/// `@scope%2Fname`.
pub fn packument_url(registry: &Url, package: &str) -> Url {
  endpoint(registry, &[package])
}

fn parse_json(body: &[u8], what: &str) -> Result<Value, ToolError> {
  serde_json::from_slice(body)
    .map_err(|err| ToolError::failure(format!("registry returned a malformed {what}: {err}")))
}

#[cfg(test)]
mod tests {
  use pkgwatch_testing::{MockRegistry, packument_with_versions};
  use pretty_assertions::assert_eq;

  use super::*;

  fn client_for(mock: &MockRegistry, max_body_bytes: usize) -> RegistryClient {
    let registry = RegistryConfig {
      registry_url: mock.url(),
      website_url: mock.url(),
      max_body_bytes,
      ..RegistryConfig::default()
    };
    RegistryClient::new(
      &registry,
      &TimeoutConfig::default(),
      PacedGate::new(Duration::ZERO).shared(),
    )
    .expect("client")
  }

  #[test]
  fn scoped_names_are_encoded() {
    let registry = Url::parse("https://registry.npmjs.org").expect("url");
    assert_eq!(
      packument_url(&registry, "@types/node").as_str(),
      "https://registry.npmjs.org/@types%2Fnode"
    );
    assert_eq!(
      packument_url(&registry, "left-pad").as_str(),
      "https://registry.npmjs.org/left-pad"
    );
  }

  #[test]
  fn invalid_base_url_is_a_setup_error() {
    let registry = RegistryConfig {
      registry_url: "not a url".to_string(),
      ..RegistryConfig::default()
    };
    let err = RegistryClient::new(&registry, &TimeoutConfig::default(), PacedGate::new(Duration::ZERO).shared())
      .expect_err("invalid");
    assert!(err.to_string().starts_with("invalid registry.registry_url"));
  }

  #[tokio::test]
  async fn fetches_scoped_packument_through_the_gate() {
    let mock = MockRegistry::start().await;
    mock.packument("@scope/pkg", packument_with_versions("@scope/pkg", 2)).await;
    let client = client_for(&mock, 1024 * 1024);

    let packument = client
      .packument("@scope/pkg", &CancellationToken::new())
      .await
      .expect("packument");

    assert_eq!(packument["name"], "@scope/pkg");
    assert_eq!(client.gate().released(), 1);
  }

  #[tokio::test]
  async fn non_success_status_is_reported_with_url() {
    let mock = MockRegistry::start().await;
    mock.status("missing", 404).await;
    let client = client_for(&mock, 1024);

    let err = client
      .packument("missing", &CancellationToken::new())
      .await
      .expect_err("404");
    match err {
      ToolError::UpstreamHttp { status, url } => {
        assert_eq!(status, 404);
        assert!(url.ends_with("/missing"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn oversized_body_is_refused() {
    let mock = MockRegistry::start().await;
    mock.packument("huge", packument_with_versions("huge", 50)).await;
    let client = client_for(&mock, 256);

    let err = client
      .packument("huge", &CancellationToken::new())
      .await
      .expect_err("too large");
    assert!(err.to_string().contains("exceeds the 256 byte limit"));
  }

  #[tokio::test]
  async fn abandoned_request_never_reaches_upstream() {
    let mock = MockRegistry::start().await;
    mock.packument("left-pad", packument_with_versions("left-pad", 1)).await;
    let client = client_for(&mock, 1024 * 1024);

    let abandon = CancellationToken::new();
    abandon.cancel();
    let err = client.packument("left-pad", &abandon).await.expect_err("abandoned");

    assert_eq!(err.to_string(), "request abandoned while queued for the registry");
    assert_eq!(mock.request_count().await, 0);
  }
}
