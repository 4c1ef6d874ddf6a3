// Configuration Types
// All configuration type definitions

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Upstream registry settings
  pub registry: RegistryConfig,
  /// Network and invocation deadlines
  pub timeouts: TimeoutConfig,
  /// Payload size bounds
  pub shaping: ShapingConfig,
  /// Update resolver settings
  pub updates: UpdatesConfig,
  /// Invocation housekeeping
  pub housekeeping: HousekeepingConfig,
  /// Logging settings
  pub logging: LoggingConfig,
}

// ============================================================================
// REGISTRY CONFIGURATION
// ============================================================================

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// JSON registry base URL
  pub registry_url: String,
  /// Package page base URL
  pub website_url: String,
  /// Outbound request budget shared by every tool
  pub requests_per_second: f64,
  /// Largest response body read into memory
  pub max_body_bytes: usize,
  /// User agent sent upstream
  pub user_agent: String,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      registry_url: "https://registry.npmjs.org".to_string(),
      website_url: "https://www.npmjs.com".to_string(),
      requests_per_second: 2.0,
      max_body_bytes: 32 * 1024 * 1024,
      user_agent: concat!("pkgwatch/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

impl RegistryConfig {
  /// Minimum spacing between two dispatches.
  pub fn min_spacing(&self) -> Duration {
    Duration::from_secs_f64(1.0 / self.requests_per_second)
  }
}

// ============================================================================
// TIMEOUT CONFIGURATION
// ============================================================================

/// Timeout configuration, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
  /// Registry search call
  pub search_ms: u64,
  /// Packument fetch (versions and details)
  pub package_ms: u64,
  /// Package page fetch
  pub page_ms: u64,
  /// Whole invocation of a registry tool, queueing included
  pub invocation_ms: u64,
  /// Whole invocation of an update tool
  pub update_invocation_ms: u64,
}

impl Default for TimeoutConfig {
  fn default() -> Self {
    Self {
      search_ms: 10_000,
      package_ms: 15_000,
      page_ms: 20_000,
      invocation_ms: 30_000,
      update_invocation_ms: 120_000,
    }
  }
}

impl TimeoutConfig {
  pub fn search(&self) -> Duration {
    Duration::from_millis(self.search_ms)
  }

  pub fn package(&self) -> Duration {
    Duration::from_millis(self.package_ms)
  }

  pub fn page(&self) -> Duration {
    Duration::from_millis(self.page_ms)
  }

  pub fn invocation(&self) -> Duration {
    Duration::from_millis(self.invocation_ms)
  }

  pub fn update_invocation(&self) -> Duration {
    Duration::from_millis(self.update_invocation_ms)
  }

  /// Longest single network deadline.
  pub fn max_network(&self) -> Duration {
    self.search().max(self.package()).max(self.page())
  }
}

// ============================================================================
// SHAPING CONFIGURATION
// ============================================================================

/// Bounds applied to upstream payloads before they are kept or rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
  /// Versions shown by `package_versions`
  pub max_listed_versions: usize,
  /// Versions retained by `package_details`
  pub max_detail_versions: usize,
  /// Non-anchor `time` entries retained by `package_details`
  pub max_time_entries: usize,
  /// Characters of page body kept by `package_page`
  pub max_page_chars: usize,
}

impl Default for ShapingConfig {
  fn default() -> Self {
    Self {
      max_listed_versions: 15,
      max_detail_versions: 10,
      max_time_entries: 10,
      max_page_chars: 4000,
    }
  }
}

// ============================================================================
// UPDATES CONFIGURATION
// ============================================================================

/// Update resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
  /// Program that runs npm-check-updates
  pub command: String,
  /// Arguments placed before the generated flags
  pub args: Vec<String>,
  /// Manifest used when a call names none
  pub default_package_file: String,
  /// Target used when a call names none
  pub default_target: UpdateTarget,
}

impl Default for UpdatesConfig {
  fn default() -> Self {
    Self {
      command: "npx".to_string(),
      args: vec!["--yes".to_string(), "npm-check-updates".to_string()],
      default_package_file: "package.json".to_string(),
      default_target: UpdateTarget::Latest,
    }
  }
}

/// Which version an upgrade should aim for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTarget {
  Latest,
  Newest,
  Greatest,
  Minor,
  Patch,
  Semver,
}

impl UpdateTarget {
  pub const ALL: [UpdateTarget; 6] = [
    UpdateTarget::Latest,
    UpdateTarget::Newest,
    UpdateTarget::Greatest,
    UpdateTarget::Minor,
    UpdateTarget::Patch,
    UpdateTarget::Semver,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      UpdateTarget::Latest => "latest",
      UpdateTarget::Newest => "newest",
      UpdateTarget::Greatest => "greatest",
      UpdateTarget::Minor => "minor",
      UpdateTarget::Patch => "patch",
      UpdateTarget::Semver => "semver",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|target| target.as_str() == value)
  }
}

impl std::fmt::Display for UpdateTarget {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ============================================================================
// HOUSEKEEPING CONFIGURATION
// ============================================================================

/// Per-invocation housekeeping thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
  /// Issue a memory reclamation hint every N invocations; 0 disables
  pub reclaim_every: u64,
  /// Invocations slower than this are logged as warnings
  pub slow_invocation_ms: u64,
}

impl Default for HousekeepingConfig {
  fn default() -> Self {
    Self {
      reclaim_every: 50,
      slow_invocation_ms: 5_000,
    }
  }
}

// ============================================================================
// LOGGING CONFIGURATION
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// `tracing` filter directive, overridden by `RUST_LOG`
  pub filter: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      filter: "info".to_string(),
    }
  }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  #[error("{key} must be {expected}")]
  OutOfRange { key: &'static str, expected: &'static str },
  #[error("invalid value for {key}: {value}")]
  InvalidValue { key: String, value: String },
  #[error("unknown config key: {0}")]
  UnknownKey(String),
}

impl Config {
  /// Reject values that would make the gate, deadlines or shaping bounds
  /// meaningless.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let rps = self.registry.requests_per_second;
    if !rps.is_finite() || rps <= 0.0 {
      return Err(ConfigError::OutOfRange {
        key: "registry.requests_per_second",
        expected: "a positive number",
      });
    }
    if self.registry.max_body_bytes == 0 {
      return Err(ConfigError::OutOfRange {
        key: "registry.max_body_bytes",
        expected: "greater than zero",
      });
    }

    let timeouts = [
      ("timeouts.search_ms", self.timeouts.search_ms),
      ("timeouts.package_ms", self.timeouts.package_ms),
      ("timeouts.page_ms", self.timeouts.page_ms),
      ("timeouts.invocation_ms", self.timeouts.invocation_ms),
      ("timeouts.update_invocation_ms", self.timeouts.update_invocation_ms),
    ];
    if let Some((key, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
      return Err(ConfigError::OutOfRange {
        key,
        expected: "greater than zero",
      });
    }

    let bounds = [
      ("shaping.max_listed_versions", self.shaping.max_listed_versions),
      ("shaping.max_detail_versions", self.shaping.max_detail_versions),
      ("shaping.max_time_entries", self.shaping.max_time_entries),
      ("shaping.max_page_chars", self.shaping.max_page_chars),
    ];
    if let Some((key, _)) = bounds.iter().find(|(_, value)| *value == 0) {
      return Err(ConfigError::OutOfRange {
        key,
        expected: "greater than zero",
      });
    }

    if self.updates.command.trim().is_empty() {
      return Err(ConfigError::OutOfRange {
        key: "updates.command",
        expected: "a non-empty program name",
      });
    }

    Ok(())
  }

  /// Relations between deadlines that are expected but not enforced.
  ///
  /// The invocation deadline has to cover one network deadline plus the time
  /// spent queued in the gate.
  pub fn timeout_warnings(&self) -> Vec<String> {
    let mut warnings = Vec::new();
    let slack = self.registry.min_spacing();
    let needed = self.timeouts.max_network() + slack;
    if self.timeouts.invocation() < needed {
      warnings.push(format!(
        "timeouts.invocation_ms ({}) is below the longest network deadline plus one gate slot ({}ms); \
         slow calls will time out at the invocation level",
        self.timeouts.invocation_ms,
        needed.as_millis()
      ));
    }
    warnings
  }
}
