//! Bounded, display-ready views of upstream payloads.
//!
//! Registry documents grow without limit (a popular packument lists thousands
//! of versions; a package page carries the whole README). Everything a tool
//! keeps or renders goes through one of these shapers first, and each shaper
//! has a fixed bound taken from [`ShapeLimits`]. Shapers never fail on
//! well-formed JSON or HTML: missing or oddly typed fields are just omitted.

mod details;
mod page;
mod search;
mod versions;

pub use details::{DETAIL_VERSION_FIELDS, shape_package_detail};
pub use page::{PageScrubber, PageText};
pub use search::{SearchHit, SearchSummary, format_search};
pub use versions::{VersionListing, format_versions};

use pkgwatch_config::ShapingConfig;

/// Size bounds applied by the shapers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeLimits {
  pub max_listed_versions: usize,
  pub max_detail_versions: usize,
  pub max_time_entries: usize,
  pub max_page_chars: usize,
}

impl Default for ShapeLimits {
  fn default() -> Self {
    Self::from(&ShapingConfig::default())
  }
}

impl From<&ShapingConfig> for ShapeLimits {
  fn from(config: &ShapingConfig) -> Self {
    Self {
      max_listed_versions: config.max_listed_versions,
      max_detail_versions: config.max_detail_versions,
      max_time_entries: config.max_time_entries,
      max_page_chars: config.max_page_chars,
    }
  }
}

/// Last `n` items of an iterator with a known length, in original order.
fn take_last<I>(items: I, n: usize) -> impl Iterator<Item = I::Item>
where
  I: ExactSizeIterator,
{
  let skip = items.len().saturating_sub(n);
  items.skip(skip)
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
  value
    .get(key)
    .and_then(serde_json::Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
}
