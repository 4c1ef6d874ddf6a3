// Configuration Loader
// Layered configuration loading system

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::layered::{ConfigLayer, ConfigLayerSource, LayeredConfig};
use crate::types::{Config, ConfigError};

const CONFIG_DIR: &str = ".pkgwatch";
const CONFIG_FILE: &str = "config.toml";

/// Configuration loader with layered support
pub struct ConfigLoader {
  /// Global config directory
  global_dir: Option<PathBuf>,
  /// Project config directory
  project_dir: Option<PathBuf>,
}

impl ConfigLoader {
  /// Create a new configuration loader
  pub fn new() -> Self {
    Self {
      global_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR)),
      project_dir: None,
    }
  }

  /// Set project directory
  pub fn with_project_dir(mut self, dir: PathBuf) -> Self {
    self.project_dir = Some(dir);
    self
  }

  /// Replace the global config directory
  pub fn with_global_dir(mut self, dir: Option<PathBuf>) -> Self {
    self.global_dir = dir;
    self
  }

  /// Load configuration with CLI overrides
  pub fn load_with_cli_overrides(&self, cli_overrides: Vec<(String, String)>) -> Result<Config> {
    // Load layers in order:
    // 1. Built-in defaults
    // 2. Global config (~/.pkgwatch/config.toml)
    // 3. Project config (.pkgwatch/config.toml)
    // 4. CLI overrides
    let defaults =
      toml::Value::try_from(Config::default()).context("failed to serialize default config")?;

    let mut layered = LayeredConfig::new();
    layered.add_layer(ConfigLayer {
      source: ConfigLayerSource::Default,
      values: defaults.clone(),
    });

    if let Some(global_dir) = &self.global_dir {
      if let Some(values) = read_layer(&global_dir.join(CONFIG_FILE))? {
        layered.add_layer(ConfigLayer {
          source: ConfigLayerSource::GlobalConfig,
          values,
        });
      }
    }

    if let Some(project_dir) = &self.project_dir {
      if let Some(values) = read_layer(&project_dir.join(CONFIG_DIR).join(CONFIG_FILE))? {
        layered.add_layer(ConfigLayer {
          source: ConfigLayerSource::ProjectConfig,
          values,
        });
      }
    }

    for (key, value) in cli_overrides {
      let values = override_layer(&defaults, &key, &value)?;
      layered.add_layer(ConfigLayer {
        source: ConfigLayerSource::CliOverride,
        values,
      });
    }

    debug!(sources = ?layered.sources(), "merging configuration layers");
    let config = layered
      .merge()
      .try_into::<Config>()
      .context("failed to build configuration from merged layers")?;
    config.validate()?;
    Ok(config)
  }
}

impl Default for ConfigLoader {
  fn default() -> Self {
    Self::new()
  }
}

/// Split `key=value` command line pairs.
pub fn parse_override(raw: &str) -> Result<(String, String), ConfigError> {
  match raw.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => {
      Ok((key.trim().to_string(), value.trim().to_string()))
    }
    _ => Err(ConfigError::InvalidValue {
      key: raw.to_string(),
      value: "expected KEY=VALUE".to_string(),
    }),
  }
}

fn read_layer(path: &Path) -> Result<Option<toml::Value>> {
  if !path.exists() {
    return Ok(None);
  }
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file {}", path.display()))?;
  let values = toml::from_str(&content)
    .with_context(|| format!("failed to parse config file {}", path.display()))?;
  debug!(path = %path.display(), "loaded config layer");
  Ok(Some(values))
}

/// Build a one-key layer from a dotted CLI override, rejecting keys the
/// default configuration does not have.
fn override_layer(defaults: &toml::Value, key: &str, raw: &str) -> Result<toml::Value, ConfigError> {
  let segments: Vec<&str> = key.split('.').collect();

  let mut cursor = defaults;
  for segment in &segments {
    cursor = cursor
      .get(segment)
      .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
  }
  if cursor.is_table() {
    return Err(ConfigError::UnknownKey(key.to_string()));
  }

  let mut value = parse_scalar(raw);
  if cursor.is_str() && !value.is_str() {
    value = toml::Value::String(raw.to_string());
  }
  if cursor.type_str() != value.type_str() && !(cursor.is_float() && value.is_integer()) {
    return Err(ConfigError::InvalidValue {
      key: key.to_string(),
      value: raw.to_string(),
    });
  }
  if cursor.is_float() {
    if let Some(int) = value.as_integer() {
      value = toml::Value::Float(int as f64);
    }
  }

  for segment in segments.iter().rev() {
    let mut table = toml::map::Map::new();
    table.insert((*segment).to_string(), value);
    value = toml::Value::Table(table);
  }
  Ok(value)
}

fn parse_scalar(raw: &str) -> toml::Value {
  let wrapped = format!("v = {raw}");
  match toml::from_str::<toml::Table>(&wrapped) {
    Ok(mut table) => table
      .remove("v")
      .unwrap_or_else(|| toml::Value::String(raw.to_string())),
    Err(_) => toml::Value::String(raw.to_string()),
  }
}
