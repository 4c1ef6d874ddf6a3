use serde_json::Value;

use super::str_field;

/// Newest-first slice of a package's published versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionListing {
  pub package: String,
  pub latest: Option<String>,
  /// At most `limit` versions, newest first.
  pub shown: Vec<String>,
  /// Number of versions upstream reported.
  pub total: usize,
}

impl VersionListing {
  /// Read the `versions` keys of a packument, newest first.
  ///
  /// "Newest" follows the registry's key order (publication order), not
  /// semver precedence.
  pub fn from_packument(package: &str, packument: &Value, limit: usize) -> Self {
    let latest = packument
      .get("dist-tags")
      .and_then(|tags| str_field(tags, "latest"))
      .map(str::to_string);

    let (shown, total) = match packument.get("versions").and_then(Value::as_object) {
      Some(versions) => (
        versions.keys().rev().take(limit).cloned().collect(),
        versions.len(),
      ),
      None => (Vec::new(), 0),
    };

    Self {
      package: str_field(packument, "name").unwrap_or(package).to_string(),
      latest,
      shown,
      total,
    }
  }

  pub fn remaining(&self) -> usize {
    self.total.saturating_sub(self.shown.len())
  }
}

/// Render a listing: one `- version` line per shown version, then a note with
/// the count of versions left out.
pub fn format_versions(listing: &VersionListing) -> String {
  if listing.total == 0 {
    return format!("No published versions found for {}.", listing.package);
  }

  let mut out = format!("Versions of {}", listing.package);
  if let Some(latest) = &listing.latest {
    out.push_str(&format!(" (latest: {latest})"));
  }
  out.push_str(&format!(", {} total, newest first:\n", listing.total));

  for version in &listing.shown {
    out.push_str("- ");
    out.push_str(version);
    out.push('\n');
  }

  let remaining = listing.remaining();
  if remaining > 0 {
    out.push_str(&format!("...and {remaining} more"));
  }
  out.trim_end().to_string()
}
