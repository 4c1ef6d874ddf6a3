//! Fixtures and a mock registry shared by the pkgwatch test suites.

use std::time::Duration;

use serde_json::{Map, Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Packument with versions `1.0.0` .. `1.{n-1}.0` in publication order.
///
/// Every version carries fields the detail view is expected to strip (`dist`,
/// `scripts`), and the top level carries `readme` and `users`.
pub fn packument_with_versions(name: &str, n: usize) -> Value {
  let mut versions = Map::new();
  let mut time = Map::new();
  time.insert("created".to_string(), json!("2020-01-01T00:00:00.000Z"));

  for minor in 0..n {
    let version = format!("1.{minor}.0");
    versions.insert(
      version.clone(),
      json!({
        "name": name,
        "version": version,
        "description": format!("{name} release {version}"),
        "main": "index.js",
        "dependencies": { "tslib": "^2.0.0" },
        "scripts": { "test": "node test.js" },
        "dist": {
          "tarball": format!("https://registry.npmjs.org/{name}/-/{name}-{version}.tgz"),
          "shasum": "0000000000000000000000000000000000000000"
        },
        "_npmUser": { "name": "publisher" }
      }),
    );
    time.insert(
      version,
      json!(format!("2020-01-{:02}T00:00:00.000Z", (minor % 28) + 1)),
    );
  }
  time.insert("modified".to_string(), json!("2024-06-01T00:00:00.000Z"));

  let mut packument = json!({
    "_id": name,
    "name": name,
    "description": format!("{name} test package"),
    "license": "MIT",
    "homepage": format!("https://example.test/{name}"),
    "keywords": ["fixture"],
    "readme": "# Long readme that should never reach the caller",
    "users": { "someone": true },
  });
  if n > 0 {
    packument["dist-tags"] = json!({ "latest": format!("1.{}.0", n - 1) });
  }
  packument["versions"] = Value::Object(versions);
  packument["time"] = Value::Object(time);
  packument
}

/// Search endpoint response reporting `total` matches and returning one
/// object per name.
pub fn search_response(total: u64, names: &[&str]) -> Value {
  let objects: Vec<Value> = names
    .iter()
    .map(|name| {
      json!({
        "package": {
          "name": name,
          "version": "1.0.0",
          "description": format!("{name} package"),
          "date": "2024-03-05T12:00:00.000Z",
          "links": { "npm": format!("https://www.npmjs.com/package/{name}") },
          "publisher": { "username": "publisher" }
        },
        "score": { "final": 0.5 },
        "searchScore": 1.0
      })
    })
    .collect();

  json!({ "objects": objects, "total": total, "time": "Tue Mar 05 2024" })
}

/// npmjs.com-like package page with tracking script, navigation and styles
/// around the real content.
pub fn package_page_html(name: &str, version: &str, description: &str, readme: &str) -> String {
  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{name} - npm</title>
  <meta name="description" content="{description}">
  <style>.hidden {{ display: none; }}</style>
  <script>window.trackUser = function() {{ return "{name}"; }};</script>
</head>
<body>
  <header><nav><a href="/signup">Sign Up</a> <a href="/login">Sign In</a></nav></header>
  <main>
    <h1>{name}</h1>
    <span>{version} • Public • Published 3 days ago</span>
    <!-- readme -->
    <article><p>{readme}</p></article>
  </main>
  <footer>Terms of Use</footer>
</body>
</html>"#
  )
}

/// Registry path segment for a package name, scoped names encoded.
pub fn registry_path(name: &str) -> String {
  format!("/{}", name.replace('/', "%2F"))
}

/// A wiremock server standing in for both the registry and the website.
pub struct MockRegistry {
  server: MockServer,
}

impl MockRegistry {
  pub async fn start() -> Self {
    Self {
      server: MockServer::start().await,
    }
  }

  pub fn url(&self) -> String {
    self.server.uri()
  }

  pub fn server(&self) -> &MockServer {
    &self.server
  }

  pub async fn packument(&self, name: &str, body: Value) {
    Mock::given(method("GET"))
      .and(path(registry_path(name)))
      .respond_with(ResponseTemplate::new(200).set_body_json(body))
      .mount(&self.server)
      .await;
  }

  pub async fn slow_packument(&self, name: &str, body: Value, delay: Duration) {
    Mock::given(method("GET"))
      .and(path(registry_path(name)))
      .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
      .mount(&self.server)
      .await;
  }

  pub async fn status(&self, name: &str, status: u16) {
    Mock::given(method("GET"))
      .and(path(registry_path(name)))
      .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
      .mount(&self.server)
      .await;
  }

  pub async fn search(&self, text: &str, body: Value) {
    Mock::given(method("GET"))
      .and(path("/-/v1/search"))
      .and(query_param("text", text))
      .respond_with(ResponseTemplate::new(200).set_body_json(body))
      .mount(&self.server)
      .await;
  }

  pub async fn page(&self, name: &str, html: String) {
    Mock::given(method("GET"))
      .and(path(format!("/package/{name}")))
      .respond_with(
        ResponseTemplate::new(200)
          .insert_header("content-type", "text/html; charset=utf-8")
          .set_body_string(html),
      )
      .mount(&self.server)
      .await;
  }

  /// Number of requests the server has seen so far.
  pub async fn request_count(&self) -> usize {
    self
      .server
      .received_requests()
      .await
      .map(|requests| requests.len())
      .unwrap_or_default()
  }
}
