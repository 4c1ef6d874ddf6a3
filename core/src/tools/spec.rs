use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pkgwatch_config::{Config, UpdateTarget};

pub const SEARCH_PACKAGES: &str = "search_packages";
pub const PACKAGE_VERSIONS: &str = "package_versions";
pub const PACKAGE_DETAILS: &str = "package_details";
pub const PACKAGE_PAGE: &str = "package_page";
pub const CHECK_UPDATES: &str = "check_updates";
pub const UPGRADE_PACKAGES: &str = "upgrade_packages";

/// Longest package name the registry accepts.
pub const MAX_PACKAGE_NAME_LEN: usize = 214;

/// JSON schema representation for tool input contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonSchema {
  String {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<String>>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    min_length: Option<usize>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
  },
  Integer {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum: Option<i64>,
  },
  Boolean {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
  },
  Object {
    properties: BTreeMap<String, JsonSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<Vec<String>>,
    #[serde(rename = "additionalProperties")]
    additional_properties: bool,
  },
}

impl JsonSchema {
  pub fn to_value(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      JsonSchema::String { .. } => "string",
      JsonSchema::Integer { .. } => "integer",
      JsonSchema::Boolean { .. } => "boolean",
      JsonSchema::Object { .. } => "object",
    }
  }
}

/// Immutable description of one operation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
  pub name: String,
  pub description: String,
  pub input_schema: JsonSchema,
  /// Outer deadline for one invocation, queueing included.
  #[serde(skip)]
  pub timeout: Duration,
}

impl ToolSpec {
  pub fn new(
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: JsonSchema,
    timeout: Duration,
  ) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      input_schema,
      timeout,
    }
  }
}

pub fn build_specs(config: &Config) -> Vec<ToolSpec> {
  let invocation = config.timeouts.invocation();
  let update_invocation = config.timeouts.update_invocation();
  vec![
    search_tool(invocation),
    versions_tool(invocation),
    details_tool(invocation),
    page_tool(invocation),
    update_tool(
      CHECK_UPDATES,
      "Report dependencies in a package.json that have newer versions, without changing the file.",
      update_invocation,
    ),
    update_tool(
      UPGRADE_PACKAGES,
      "Rewrite dependency ranges in a package.json to newer versions. Does not run npm install.",
      update_invocation,
    ),
  ]
}

fn obj(properties: BTreeMap<String, JsonSchema>, required: &[&str]) -> JsonSchema {
  JsonSchema::Object {
    properties,
    required: if required.is_empty() {
      None
    } else {
      Some(required.iter().map(|s| s.to_string()).collect())
    },
    additional_properties: false,
  }
}

fn str_field(desc: &str) -> JsonSchema {
  JsonSchema::String {
    description: Some(desc.to_string()),
    allowed: None,
    min_length: None,
    max_length: None,
  }
}

fn package_field() -> JsonSchema {
  JsonSchema::String {
    description: Some("Package name, e.g. `react` or `@types/node`".to_string()),
    allowed: None,
    min_length: Some(1),
    max_length: Some(MAX_PACKAGE_NAME_LEN),
  }
}

fn bool_field(desc: &str) -> JsonSchema {
  JsonSchema::Boolean {
    description: Some(desc.to_string()),
  }
}

fn search_tool(timeout: Duration) -> ToolSpec {
  let mut properties = BTreeMap::new();
  properties.insert(
    "query".to_string(),
    JsonSchema::String {
      description: Some("Search text".to_string()),
      allowed: None,
      min_length: Some(1),
      max_length: None,
    },
  );
  properties.insert(
    "size".to_string(),
    JsonSchema::Integer {
      description: Some("Number of results to return".to_string()),
      default: Some(10),
      minimum: Some(1),
      maximum: Some(250),
    },
  );

  ToolSpec::new(
    SEARCH_PACKAGES,
    "Search the npm registry for packages.",
    obj(properties, &["query"]),
    timeout,
  )
}

fn package_tool(name: &str, description: &str, timeout: Duration) -> ToolSpec {
  let mut properties = BTreeMap::new();
  properties.insert("package".to_string(), package_field());
  ToolSpec::new(name, description, obj(properties, &["package"]), timeout)
}

fn versions_tool(timeout: Duration) -> ToolSpec {
  package_tool(
    PACKAGE_VERSIONS,
    "List the published versions of a package, newest first.",
    timeout,
  )
}

fn details_tool(timeout: Duration) -> ToolSpec {
  package_tool(
    PACKAGE_DETAILS,
    "Show package metadata with its most recent versions and publish times.",
    timeout,
  )
}

fn page_tool(timeout: Duration) -> ToolSpec {
  package_tool(
    PACKAGE_PAGE,
    "Read the text of a package's npmjs.com page, README included.",
    timeout,
  )
}

fn update_tool(name: &str, description: &str, timeout: Duration) -> ToolSpec {
  let mut properties = BTreeMap::new();
  properties.insert(
    "package_file".to_string(),
    str_field("Manifest path relative to `cwd` (default: package.json)"),
  );
  properties.insert(
    "cwd".to_string(),
    str_field("Directory the manifest path is resolved against (default: server working directory)"),
  );
  properties.insert(
    "target".to_string(),
    JsonSchema::String {
      description: Some("Which version to move each dependency to".to_string()),
      allowed: Some(
        UpdateTarget::ALL
          .iter()
          .map(|target| target.as_str().to_string())
          .collect(),
      ),
      min_length: None,
      max_length: None,
    },
  );
  properties.insert(
    "filter".to_string(),
    str_field("Only consider packages matching this name, list or /regex/"),
  );
  properties.insert(
    "reject".to_string(),
    str_field("Skip packages matching this name, list or /regex/"),
  );
  properties.insert(
    "dep".to_string(),
    str_field("Dependency sections to check, e.g. `prod,dev`"),
  );
  properties.insert("peer".to_string(), bool_field("Check peer dependencies of installed packages"));
  properties.insert("pre".to_string(), bool_field("Include prerelease versions"));
  properties.insert(
    "minimal".to_string(),
    bool_field("Do not upgrade versions already satisfied by the current range"),
  );

  ToolSpec::new(name, description, obj(properties, &[]), timeout)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn catalog_is_fixed_and_unique() {
    let specs = build_specs(&Config::default());
    let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
    assert_eq!(
      names,
      vec![
        SEARCH_PACKAGES,
        PACKAGE_VERSIONS,
        PACKAGE_DETAILS,
        PACKAGE_PAGE,
        CHECK_UPDATES,
        UPGRADE_PACKAGES
      ]
    );
  }

  #[test]
  fn update_tools_get_the_longer_deadline() {
    let mut config = Config::default();
    config.timeouts.invocation_ms = 1_000;
    config.timeouts.update_invocation_ms = 9_000;
    let specs = build_specs(&config);

    for spec in &specs {
      let expected = if spec.name == CHECK_UPDATES || spec.name == UPGRADE_PACKAGES {
        Duration::from_secs(9)
      } else {
        Duration::from_secs(1)
      };
      assert_eq!(spec.timeout, expected, "{}", spec.name);
    }
  }

  #[test]
  fn search_schema_serializes_bounds_and_default() {
    let schema = search_tool(Duration::from_secs(30)).input_schema.to_value();
    assert_eq!(
      schema,
      serde_json::json!({
        "type": "object",
        "properties": {
          "query": { "type": "string", "description": "Search text", "minLength": 1 },
          "size": {
            "type": "integer",
            "description": "Number of results to return",
            "default": 10,
            "minimum": 1,
            "maximum": 250
          }
        },
        "required": ["query"],
        "additionalProperties": false
      })
    );
  }
}
