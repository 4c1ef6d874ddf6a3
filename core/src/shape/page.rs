use regex::Regex;

/// Markup regions that never carry package content.
const NON_CONTENT_TAGS: [&str; 9] = [
  "script", "style", "noscript", "svg", "nav", "header", "footer", "iframe", "template",
];

const TRUNCATION_MARKER: &str = "\n\n[... content truncated]";

/// Text pulled out of a package page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
  pub name: String,
  pub version: Option<String>,
  pub description: Option<String>,
  /// Page body, at most the configured number of characters.
  pub body: String,
  pub truncated: bool,
}

impl PageText {
  pub fn render(&self) -> String {
    let mut out = format!("Package: {}\n", self.name);
    if let Some(version) = &self.version {
      out.push_str(&format!("Version: {version}\n"));
    }
    if let Some(description) = &self.description {
      out.push_str(&format!("Description: {description}\n"));
    }
    out.push('\n');
    out.push_str(&self.body);
    if self.truncated {
      out.push_str(TRUNCATION_MARKER);
    }
    out
  }
}

/// Compiled patterns for turning package-page HTML into plain text.
#[derive(Debug, Clone)]
pub struct PageScrubber {
  non_content: Regex,
  comment: Regex,
  title: Regex,
  meta: Regex,
  attribute: Regex,
  tag: Regex,
  whitespace: Regex,
  published_version: Regex,
  labelled_version: Regex,
}

impl PageScrubber {
  pub fn new() -> Result<Self, regex::Error> {
    let non_content = NON_CONTENT_TAGS
      .iter()
      .map(|tag| format!(r"<{tag}\b[^>]*>.*?</{tag}\s*>"))
      .collect::<Vec<_>>()
      .join("|");

    Ok(Self {
      non_content: Regex::new(&format!("(?is){non_content}"))?,
      comment: Regex::new(r"(?s)<!--.*?-->")?,
      title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>")?,
      meta: Regex::new(r"(?is)<meta\b[^>]*>")?,
      attribute: Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
      tag: Regex::new(r"(?s)<[^>]*>")?,
      whitespace: Regex::new(r"\s+")?,
      published_version: Regex::new(r"(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)\s*•\s*Public")?,
      labelled_version: Regex::new(r"(?i)\bversion\b\s*:?\s*v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)")?,
    })
  }

  /// Extract name, version, description and a body capped at `max_chars`
  /// characters from a package page.
  pub fn extract(&self, html: &str, package: &str, max_chars: usize) -> PageText {
    let description = self.meta_description(html);
    let title_name = self
      .title
      .captures(html)
      .and_then(|captures| captures.get(1))
      .map(|title| decode_entities(title.as_str()))
      .map(|title| title.trim().trim_end_matches("- npm").trim().to_string())
      .filter(|title| !title.is_empty());

    let without_regions = self.non_content.replace_all(html, " ");
    let without_comments = self.comment.replace_all(&without_regions, " ");
    let without_tags = self.tag.replace_all(&without_comments, " ");
    let decoded = decode_entities(&without_tags);
    let text = self.whitespace.replace_all(&decoded, " ").trim().to_string();

    let version = self
      .published_version
      .captures(&text)
      .or_else(|| self.labelled_version.captures(&text))
      .and_then(|captures| captures.get(1))
      .map(|version| version.as_str().to_string());

    let (body, truncated) = truncate_chars(text, max_chars);
    PageText {
      name: title_name.unwrap_or_else(|| package.to_string()),
      version,
      description,
      body,
      truncated,
    }
  }

  fn meta_description(&self, html: &str) -> Option<String> {
    for meta in self.meta.find_iter(html) {
      let mut key = None;
      let mut content = None;
      for attribute in self.attribute.captures_iter(meta.as_str()) {
        let name = attribute.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let value = attribute.get(2).or_else(|| attribute.get(3)).map(|m| m.as_str());
        match name.as_deref() {
          Some("name") | Some("property") => key = value.map(str::to_ascii_lowercase),
          Some("content") => content = value,
          _ => {}
        }
      }
      if matches!(key.as_deref(), Some("description") | Some("og:description")) {
        if let Some(content) = content.map(decode_entities).filter(|c| !c.trim().is_empty()) {
          return Some(content.trim().to_string());
        }
      }
    }
    None
  }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
  match text.char_indices().nth(max_chars) {
    Some((cut, _)) => {
      let mut text = text;
      text.truncate(cut);
      (text, true)
    }
    None => (text, false),
  }
}

fn decode_entities(text: &str) -> String {
  text
    .replace("&nbsp;", " ")
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&#x27;", "'")
    .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
  use pkgwatch_testing::package_page_html;
  use pretty_assertions::assert_eq;

  use super::*;

  fn scrubber() -> PageScrubber {
    PageScrubber::new().expect("patterns compile")
  }

  #[test]
  fn strips_non_content_regions_and_reads_metadata() {
    let html = package_page_html("left-pad", "1.3.0", "String left pad", "Pads strings. Very useful.");
    let page = scrubber().extract(&html, "left-pad", 4000);

    assert_eq!(page.name, "left-pad");
    assert_eq!(page.version.as_deref(), Some("1.3.0"));
    assert_eq!(page.description.as_deref(), Some("String left pad"));
    assert!(page.body.contains("Pads strings. Very useful."));
    assert!(!page.body.contains("trackUser"));
    assert!(!page.body.contains("Sign Up"));
    assert!(!page.body.contains(".hidden"));
    assert!(!page.truncated);
  }

  #[test]
  fn long_body_is_capped_with_marker() {
    let readme = "word ".repeat(5000);
    let html = package_page_html("big", "2.0.0", "Big readme", &readme);
    let page = scrubber().extract(&html, "big", 4000);

    assert!(page.truncated);
    assert_eq!(page.body.chars().count(), 4000);
    let rendered = page.render();
    assert!(rendered.starts_with("Package: big\nVersion: 2.0.0\nDescription: Big readme\n\n"));
    assert!(rendered.ends_with(TRUNCATION_MARKER));
  }

  #[test]
  fn truncation_respects_multibyte_characters() {
    let (text, truncated) = truncate_chars("héllo wörld".to_string(), 7);
    assert_eq!(text, "héllo w");
    assert!(truncated);
  }

  #[test]
  fn bare_html_falls_back_to_requested_name() {
    let page = scrubber().extract("<p>nothing &amp; more</p>", "@scope/pkg", 4000);
    assert_eq!(page.name, "@scope/pkg");
    assert_eq!(page.version, None);
    assert_eq!(page.description, None);
    assert_eq!(page.body, "nothing & more");
  }
}
