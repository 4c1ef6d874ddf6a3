use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use pkgwatch_config::Config;
use pkgwatch_core::tools::ToolServices;
use pkgwatch_core::updates::{
  ResolverError, UpdateMode, UpdateOptions, UpdateResolver, UpgradeMap, UpgradeOutcome,
};
use pkgwatch_core::{ToolDispatcher, build_dispatcher};
use pkgwatch_protocol::ProtocolError;
use pkgwatch_testing::{
  MockRegistry, package_page_html, packument_with_versions, search_response,
};

#[derive(Default)]
struct CountingResolver {
  calls: AtomicUsize,
}

#[async_trait]
impl UpdateResolver for CountingResolver {
  async fn resolve(&self, _options: &UpdateOptions, _mode: UpdateMode) -> Result<UpgradeMap, ResolverError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(UpgradeMap::from([(
      "left-pad".to_string(),
      UpgradeOutcome::Version("^1.3.0".to_string()),
    )]))
  }
}

fn config_for(mock: &MockRegistry) -> Config {
  let mut config = Config::default();
  config.registry.registry_url = mock.url();
  config.registry.website_url = mock.url();
  config.registry.requests_per_second = 100.0;
  config
}

fn dispatcher_with(
  config: &Config,
  cwd: &Path,
  resolver: Arc<CountingResolver>,
) -> (ToolDispatcher, ToolServices) {
  let services = ToolServices::from_config(config, cwd.to_path_buf())
    .expect("services")
    .with_resolver(resolver);
  let dispatcher = build_dispatcher(config, &services).expect("dispatcher");
  (dispatcher, services)
}

#[tokio::test]
async fn search_reports_total_and_sample_size() {
  let mock = MockRegistry::start().await;
  mock
    .search("react", search_response(42, &["react", "react-dom", "react-router"]))
    .await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let envelope = dispatcher
    .dispatch("search_packages", Some(serde_json::json!({ "query": "react", "size": 3 })))
    .await
    .expect("envelope");

  assert!(!envelope.is_error, "{}", envelope.text());
  let text = envelope.text();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(lines[0], "Found 42 packages (showing 3)");
  assert_eq!(lines.iter().filter(|line| line.contains("@1.0.0")).count(), 3);
  assert!(lines[2].starts_with("1. react@1.0.0"));
}

#[tokio::test]
async fn versions_are_capped_with_a_remainder_note() {
  let mock = MockRegistry::start().await;
  mock
    .packument("left-pad", packument_with_versions("left-pad", 40))
    .await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let envelope = dispatcher
    .dispatch("package_versions", Some(serde_json::json!({ "package": "left-pad" })))
    .await
    .expect("envelope");

  let text = envelope.text();
  assert_eq!(text.lines().filter(|line| line.starts_with("- ")).count(), 15);
  assert!(text.ends_with("...and 25 more"));
}

#[tokio::test]
async fn scoped_details_are_shaped() {
  let mock = MockRegistry::start().await;
  mock
    .packument("@scope/pkg", packument_with_versions("@scope/pkg", 25))
    .await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let envelope = dispatcher
    .dispatch("package_details", Some(serde_json::json!({ "package": "@scope/pkg" })))
    .await
    .expect("envelope");

  assert!(!envelope.is_error, "{}", envelope.text());
  let details: serde_json::Value = serde_json::from_str(&envelope.text()).expect("json");
  let versions = details["versions"].as_object().expect("versions");
  assert_eq!(versions.len(), 10);
  assert!(versions.contains_key("1.24.0"));
  assert!(details.get("readme").is_none());
}

#[tokio::test]
async fn page_text_is_extracted() {
  let mock = MockRegistry::start().await;
  mock
    .page(
      "left-pad",
      package_page_html("left-pad", "1.3.0", "String left pad", "Pads strings."),
    )
    .await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let envelope = dispatcher
    .dispatch("package_page", Some(serde_json::json!({ "package": "left-pad" })))
    .await
    .expect("envelope");

  let text = envelope.text();
  assert!(text.starts_with("Package: left-pad\nVersion: 1.3.0\nDescription: String left pad\n\n"));
  assert!(text.contains("Pads strings."));
}

#[tokio::test]
async fn unknown_tool_touches_neither_gate_nor_upstream() {
  let mock = MockRegistry::start().await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, services) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let err = dispatcher
    .dispatch("bogus_tool", Some(serde_json::json!({})))
    .await
    .expect_err("unknown tool");

  assert_eq!(
    err,
    ProtocolError::UnknownOperation {
      name: "bogus_tool".to_string()
    }
  );
  assert_eq!(services.client.gate().released(), 0);
  assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn upstream_status_becomes_error_envelope() {
  let mock = MockRegistry::start().await;
  mock.status("does-not-exist", 404).await;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), Arc::default());

  let envelope = dispatcher
    .dispatch("package_versions", Some(serde_json::json!({ "package": "does-not-exist" })))
    .await
    .expect("envelope");

  assert!(envelope.is_error);
  assert!(envelope.text().starts_with("registry returned HTTP 404 for "));
}

#[tokio::test]
async fn slow_upstream_hits_the_network_deadline() {
  let mock = MockRegistry::start().await;
  mock
    .slow_packument(
      "sloth",
      packument_with_versions("sloth", 1),
      Duration::from_secs(5),
    )
    .await;
  let mut config = config_for(&mock);
  config.timeouts.package_ms = 200;
  let dir = tempfile::tempdir().expect("tempdir");
  let (dispatcher, _) = dispatcher_with(&config, dir.path(), Arc::default());

  let started = std::time::Instant::now();
  let envelope = dispatcher
    .dispatch("package_details", Some(serde_json::json!({ "package": "sloth" })))
    .await
    .expect("envelope");

  assert!(envelope.is_error);
  assert_eq!(envelope.text(), "registry packument timed out after 200ms");
  assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn missing_manifest_names_the_resolved_path() {
  let mock = MockRegistry::start().await;
  let dir = tempfile::tempdir().expect("tempdir");
  let resolver = Arc::new(CountingResolver::default());
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), resolver.clone());

  let envelope = dispatcher
    .dispatch(
      "check_updates",
      Some(serde_json::json!({ "cwd": "app", "package_file": "package.json" })),
    )
    .await
    .expect("envelope");

  assert!(envelope.is_error);
  assert_eq!(
    envelope.text(),
    format!(
      "package file not found: {}",
      dir.path().join("app").join("package.json").display()
    )
  );
  assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn present_manifest_reports_upgrades() {
  let mock = MockRegistry::start().await;
  let dir = tempfile::tempdir().expect("tempdir");
  std::fs::write(dir.path().join("package.json"), r#"{ "dependencies": {} }"#).expect("manifest");
  let resolver = Arc::new(CountingResolver::default());
  let (dispatcher, _) = dispatcher_with(&config_for(&mock), dir.path(), resolver.clone());

  let envelope = dispatcher
    .dispatch("check_updates", None)
    .await
    .expect("envelope");

  assert!(!envelope.is_error, "{}", envelope.text());
  assert!(envelope.text().ends_with("Upgrades available:\n- left-pad -> ^1.3.0"));
  assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}
