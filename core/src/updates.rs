//! Dependency-update scanning and rewriting through an external resolver.
//!
//! The resolver itself (`npm-check-updates` by default) is a black box that
//! takes a manifest path plus options and returns `name -> version` (or a
//! success flag per package when it rewrote the file).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use pkgwatch_absolute_path::resolve_against;
use pkgwatch_config::{UpdateTarget, UpdatesConfig};

/// Options as the caller sent them; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateOverrides {
  pub package_file: Option<String>,
  pub cwd: Option<String>,
  pub target: Option<UpdateTarget>,
  pub filter: Option<String>,
  pub reject: Option<String>,
  pub dep: Option<String>,
  pub peer: Option<bool>,
  pub pre: Option<bool>,
  pub minimal: Option<bool>,
}

/// Server-side fallbacks for the options a caller leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDefaults {
  pub package_file: String,
  /// Absolute directory relative paths are resolved against.
  pub cwd: PathBuf,
  pub target: UpdateTarget,
}

impl UpdateDefaults {
  pub fn new(config: &UpdatesConfig, cwd: PathBuf) -> Self {
    Self {
      package_file: config.default_package_file.clone(),
      cwd,
      target: config.default_target,
    }
  }
}

/// Fully resolved options handed to an [`UpdateResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
  /// Absolute manifest path. Not checked for existence.
  pub manifest: PathBuf,
  pub target: UpdateTarget,
  pub filter: Option<String>,
  pub reject: Option<String>,
  pub dep: Option<String>,
  pub peer: bool,
  pub pre: bool,
  pub minimal: bool,
}

impl UpdateOptions {
  pub fn merge(overrides: UpdateOverrides, defaults: &UpdateDefaults) -> Self {
    let cwd = match overrides.cwd.as_deref() {
      Some(cwd) => resolve_against(&defaults.cwd, Path::new(cwd)),
      None => defaults.cwd.clone(),
    };
    let package_file = overrides
      .package_file
      .unwrap_or_else(|| defaults.package_file.clone());

    Self {
      manifest: resolve_against(&cwd, Path::new(&package_file)),
      target: overrides.target.unwrap_or(defaults.target),
      filter: overrides.filter,
      reject: overrides.reject,
      dep: overrides.dep,
      peer: overrides.peer.unwrap_or(false),
      pre: overrides.pre.unwrap_or(false),
      minimal: overrides.minimal.unwrap_or(false),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
  /// Report only.
  Check,
  /// Rewrite the manifest.
  Upgrade,
}

/// Per-package result from the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UpgradeOutcome {
  Version(String),
  Flag(bool),
}

pub type UpgradeMap = BTreeMap<String, UpgradeOutcome>;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
  #[error("failed to start `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },
  #[error("`{command}` exited with {status}: {stderr}")]
  Failed {
    command: String,
    status: String,
    stderr: String,
  },
  #[error("could not parse update resolver output: {0}")]
  Output(#[from] serde_json::Error),
}

#[async_trait]
pub trait UpdateResolver: Send + Sync {
  async fn resolve(&self, options: &UpdateOptions, mode: UpdateMode) -> Result<UpgradeMap, ResolverError>;
}

/// Runs `npm-check-updates` (or whatever `updates.command` names) as a child
/// process and reads its `--jsonUpgraded` output.
#[derive(Debug, Clone)]
pub struct CommandUpdateResolver {
  command: String,
  base_args: Vec<String>,
}

impl CommandUpdateResolver {
  pub fn new(config: &UpdatesConfig) -> Self {
    Self {
      command: config.command.clone(),
      base_args: config.args.clone(),
    }
  }

  pub fn command_args(&self, options: &UpdateOptions, mode: UpdateMode) -> Vec<String> {
    let mut args = self.base_args.clone();
    args.push("--jsonUpgraded".to_string());
    args.push("--packageFile".to_string());
    args.push(options.manifest.display().to_string());
    args.push("--target".to_string());
    args.push(options.target.as_str().to_string());

    let valued = [
      ("--filter", &options.filter),
      ("--reject", &options.reject),
      ("--dep", &options.dep),
    ];
    for (flag, value) in valued {
      if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.clone());
      }
    }

    let switches = [
      ("--peer", options.peer),
      ("--pre", options.pre),
      ("--minimal", options.minimal),
    ];
    args.extend(
      switches
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(flag, _)| flag.to_string()),
    );

    if mode == UpdateMode::Upgrade {
      args.push("--upgrade".to_string());
    }
    args
  }
}

#[async_trait]
impl UpdateResolver for CommandUpdateResolver {
  async fn resolve(&self, options: &UpdateOptions, mode: UpdateMode) -> Result<UpgradeMap, ResolverError> {
    let args = self.command_args(options, mode);
    debug!(command = %self.command, ?args, "running update resolver");

    let mut command = Command::new(&self.command);
    command
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());
    if let Some(dir) = options.manifest.parent() {
      command.current_dir(dir);
    }

    let output = command.output().await.map_err(|source| ResolverError::Spawn {
      command: self.command.clone(),
      source,
    })?;

    if !output.status.success() {
      return Err(ResolverError::Failed {
        command: self.command.clone(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let upgrades = parse_upgrades(&output.stdout)?;
    info!(
      manifest = %options.manifest.display(),
      upgrades = upgrades.len(),
      "update resolver finished"
    );
    Ok(upgrades)
  }
}

/// Parse resolver stdout. Empty output means nothing to upgrade.
pub fn parse_upgrades(stdout: &[u8]) -> Result<UpgradeMap, serde_json::Error> {
  let text = String::from_utf8_lossy(stdout);
  let text = text.trim();
  if text.is_empty() {
    return Ok(UpgradeMap::new());
  }
  serde_json::from_str(text)
}

/// Human-readable report of one resolver run.
pub fn format_updates(options: &UpdateOptions, mode: UpdateMode, upgrades: &UpgradeMap) -> String {
  let mut out = format!(
    "Package file: {}\nTarget: {}\n\n",
    options.manifest.display(),
    options.target
  );

  if upgrades.is_empty() {
    out.push_str(&format!(
      "All dependencies match the {} versions.",
      options.target
    ));
    return out;
  }

  out.push_str(match mode {
    UpdateMode::Check => "Upgrades available:\n",
    UpdateMode::Upgrade => "Upgraded (run npm install to apply):\n",
  });
  let lines: Vec<String> = upgrades
    .iter()
    .map(|(name, outcome)| match outcome {
      UpgradeOutcome::Version(version) => format!("- {name} -> {version}"),
      UpgradeOutcome::Flag(true) => format!("- {name}: upgrade succeeded"),
      UpgradeOutcome::Flag(false) => format!("- {name}: upgrade failed"),
    })
    .collect();
  out.push_str(&lines.join("\n"));
  out
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn defaults() -> UpdateDefaults {
    UpdateDefaults {
      package_file: "package.json".to_string(),
      cwd: PathBuf::from("/srv/app"),
      target: UpdateTarget::Latest,
    }
  }

  #[test]
  fn overrides_win_and_gaps_fall_back() {
    let options = UpdateOptions::merge(
      UpdateOverrides {
        cwd: Some("web".to_string()),
        target: Some(UpdateTarget::Minor),
        pre: Some(true),
        ..UpdateOverrides::default()
      },
      &defaults(),
    );

    assert_eq!(
      options,
      UpdateOptions {
        manifest: PathBuf::from("/srv/app/web/package.json"),
        target: UpdateTarget::Minor,
        filter: None,
        reject: None,
        dep: None,
        peer: false,
        pre: true,
        minimal: false,
      }
    );
  }

  #[test]
  fn absolute_package_file_ignores_cwd() {
    let options = UpdateOptions::merge(
      UpdateOverrides {
        package_file: Some("/other/package.json".to_string()),
        cwd: Some("/ignored".to_string()),
        ..UpdateOverrides::default()
      },
      &defaults(),
    );
    assert_eq!(options.manifest, PathBuf::from("/other/package.json"));
    assert_eq!(options.target, UpdateTarget::Latest);
  }

  #[test]
  fn flags_follow_options() {
    let resolver = CommandUpdateResolver::new(&UpdatesConfig::default());
    let mut options = UpdateOptions::merge(UpdateOverrides::default(), &defaults());
    options.filter = Some("react*".to_string());
    options.minimal = true;

    assert_eq!(
      resolver.command_args(&options, UpdateMode::Upgrade),
      vec![
        "--yes",
        "npm-check-updates",
        "--jsonUpgraded",
        "--packageFile",
        "/srv/app/package.json",
        "--target",
        "latest",
        "--filter",
        "react*",
        "--minimal",
        "--upgrade",
      ]
    );
    assert!(
      !resolver
        .command_args(&options, UpdateMode::Check)
        .contains(&"--upgrade".to_string())
    );
  }

  #[test]
  fn resolver_output_accepts_versions_and_flags() {
    let upgrades = parse_upgrades(br#"{ "react": "^18.3.1", "left-pad": true, "tslib": false }"#)
      .expect("parse");
    assert_eq!(
      upgrades.get("react"),
      Some(&UpgradeOutcome::Version("^18.3.1".to_string()))
    );
    assert_eq!(upgrades.get("left-pad"), Some(&UpgradeOutcome::Flag(true)));
    assert_eq!(parse_upgrades(b"  \n").expect("empty"), UpgradeMap::new());
    assert!(parse_upgrades(b"npm WARN something").is_err());
  }

  #[test]
  fn report_lists_each_package() {
    let options = UpdateOptions::merge(UpdateOverrides::default(), &defaults());
    let upgrades = parse_upgrades(br#"{ "react": "^18.3.1", "tslib": false }"#).expect("parse");

    assert_eq!(
      format_updates(&options, UpdateMode::Check, &upgrades),
      "Package file: /srv/app/package.json\nTarget: latest\n\nUpgrades available:\n- react -> ^18.3.1\n- tslib: upgrade failed"
    );
    assert_eq!(
      format_updates(&options, UpdateMode::Check, &UpgradeMap::new()),
      "Package file: /srv/app/package.json\nTarget: latest\n\nAll dependencies match the latest versions."
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn failing_command_reports_stderr() {
    let resolver = CommandUpdateResolver::new(&UpdatesConfig {
      command: "sh".to_string(),
      args: vec!["-c".to_string(), "echo broken manifest >&2; exit 3".to_string()],
      ..UpdatesConfig::default()
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let options = UpdateOptions::merge(
      UpdateOverrides::default(),
      &UpdateDefaults {
        cwd: dir.path().to_path_buf(),
        ..defaults()
      },
    );

    let err = resolver
      .resolve(&options, UpdateMode::Check)
      .await
      .expect_err("non-zero exit");
    let message = err.to_string();
    assert!(message.starts_with("`sh` exited with"), "{message}");
    assert!(message.ends_with("broken manifest"), "{message}");
  }
}
