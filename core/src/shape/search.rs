use chrono::{DateTime, Utc};
use serde_json::Value;

use super::str_field;

/// Keywords shown per hit.
const MAX_KEYWORDS: usize = 8;

/// One package in a search response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
  pub name: String,
  pub version: String,
  pub description: Option<String>,
  pub author: Option<String>,
  pub homepage: Option<String>,
  pub repository: Option<String>,
  pub keywords: Vec<String>,
  /// Last publish date, e.g. `Mar 5, 2024`.
  pub published: Option<String>,
}

/// Search response reduced to what the tool renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
  /// Matches upstream reports overall.
  pub total: u64,
  pub hits: Vec<SearchHit>,
}

impl SearchSummary {
  pub fn from_response(response: &Value) -> Self {
    let hits: Vec<SearchHit> = response
      .get("objects")
      .and_then(Value::as_array)
      .map(|objects| {
        objects
          .iter()
          .filter_map(|object| object.get("package"))
          .filter_map(SearchHit::from_package)
          .collect()
      })
      .unwrap_or_default();

    let total = response
      .get("total")
      .and_then(Value::as_u64)
      .unwrap_or(hits.len() as u64);

    Self { total, hits }
  }
}

impl SearchHit {
  fn from_package(package: &Value) -> Option<Self> {
    let name = str_field(package, "name")?.to_string();
    let links = package.get("links");

    let author = package.get("author").and_then(|author| match author {
      Value::String(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
      other => str_field(other, "name").map(str::to_string),
    });

    let keywords = package
      .get("keywords")
      .and_then(Value::as_array)
      .map(|keywords| {
        keywords
          .iter()
          .filter_map(Value::as_str)
          .take(MAX_KEYWORDS)
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default();

    Some(Self {
      name,
      version: str_field(package, "version").unwrap_or("unknown").to_string(),
      description: str_field(package, "description").map(str::to_string),
      author,
      homepage: links.and_then(|l| str_field(l, "homepage")).map(str::to_string),
      repository: links.and_then(|l| str_field(l, "repository")).map(str::to_string),
      keywords,
      published: str_field(package, "date").and_then(human_date),
    })
  }

  fn render(&self, position: usize) -> String {
    let mut line = format!("{position}. {}@{}", self.name, self.version);
    if let Some(description) = &self.description {
      line.push_str(&format!(" - {}", description.replace('\n', " ")));
    }
    if let Some(author) = &self.author {
      line.push_str(&format!(" | author: {author}"));
    }
    if let Some(homepage) = &self.homepage {
      line.push_str(&format!(" | homepage: {homepage}"));
    }
    if let Some(repository) = &self.repository {
      line.push_str(&format!(" | repository: {repository}"));
    }
    if !self.keywords.is_empty() {
      line.push_str(&format!(" | keywords: {}", self.keywords.join(", ")));
    }
    if let Some(published) = &self.published {
      line.push_str(&format!(" | published: {published}"));
    }
    line
  }
}

/// Header with the overall and returned counts, then one line per hit.
pub fn format_search(query: &str, summary: &SearchSummary) -> String {
  if summary.hits.is_empty() {
    return format!("No packages found for \"{query}\".");
  }

  let mut out = format!(
    "Found {} packages (showing {})\n\n",
    summary.total,
    summary.hits.len()
  );
  let lines: Vec<String> = summary
    .hits
    .iter()
    .enumerate()
    .map(|(index, hit)| hit.render(index + 1))
    .collect();
  out.push_str(&lines.join("\n"));
  out
}

fn human_date(raw: &str) -> Option<String> {
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|date| date.with_timezone(&Utc).format("%b %-d, %Y").to_string())
}

#[cfg(test)]
mod tests {
  use pkgwatch_testing::search_response;
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn reports_total_separately_from_sample() {
    let summary = SearchSummary::from_response(&search_response(42, &["react", "preact", "inferno"]));
    let text = format_search("react", &summary);

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Found 42 packages (showing 3)"));
    assert_eq!(lines.next(), Some(""));
    let rest: Vec<&str> = lines.collect();
    assert_eq!(rest.len(), 3);
    assert!(rest[0].starts_with("1. react@1.0.0 - react package"));
    assert!(rest[2].starts_with("3. inferno@1.0.0"));
  }

  #[test]
  fn optional_fields_are_rendered_when_present() {
    let response = serde_json::json!({
      "total": 1,
      "objects": [{
        "package": {
          "name": "left-pad",
          "version": "1.3.0",
          "description": "String left pad",
          "keywords": ["pad", "string"],
          "date": "2018-04-09T01:08:42.361Z",
          "author": { "name": "azer" },
          "links": {
            "homepage": "https://github.com/stevemao/left-pad#readme",
            "repository": "https://github.com/stevemao/left-pad"
          }
        }
      }]
    });
    let summary = SearchSummary::from_response(&response);

    assert_eq!(
      summary.hits[0],
      SearchHit {
        name: "left-pad".to_string(),
        version: "1.3.0".to_string(),
        description: Some("String left pad".to_string()),
        author: Some("azer".to_string()),
        homepage: Some("https://github.com/stevemao/left-pad#readme".to_string()),
        repository: Some("https://github.com/stevemao/left-pad".to_string()),
        keywords: vec!["pad".to_string(), "string".to_string()],
        published: Some("Apr 9, 2018".to_string()),
      }
    );
  }

  #[test]
  fn malformed_entries_lose_optional_fields_only() {
    let response = serde_json::json!({
      "objects": [
        { "package": { "name": "ok", "date": "not a date", "keywords": "nope", "author": 5 } },
        { "package": { "version": "1.0.0" } },
        { "score": 1 }
      ]
    });
    let summary = SearchSummary::from_response(&response);

    assert_eq!(summary.total, 1);
    assert_eq!(summary.hits.len(), 1);
    assert_eq!(summary.hits[0].published, None);
    assert!(summary.hits[0].keywords.is_empty());
    assert_eq!(summary.hits[0].author, None);
  }

  #[test]
  fn empty_result_has_plain_message() {
    let summary = SearchSummary::from_response(&serde_json::json!({ "objects": [], "total": 0 }));
    assert_eq!(format_search("zzz", &summary), "No packages found for \"zzz\".");
  }
}
