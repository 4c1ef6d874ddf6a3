use serde_json::{Map, Value};

use super::{ShapeLimits, take_last};

/// Fields kept on each retained version entry.
pub const DETAIL_VERSION_FIELDS: [&str; 7] = [
  "name",
  "version",
  "description",
  "main",
  "dependencies",
  "devDependencies",
  "peerDependencies",
];

/// Top-level packument fields carried into the detail view.
const DETAIL_TOP_LEVEL_FIELDS: [&str; 8] = [
  "name",
  "description",
  "dist-tags",
  "license",
  "homepage",
  "repository",
  "keywords",
  "author",
];

const TIME_ANCHORS: [&str; 2] = ["created", "modified"];

/// Reduce a full packument to a bounded detail record.
///
/// Keeps the last `max_detail_versions` entries of `versions` in upstream
/// insertion order, each stripped to [`DETAIL_VERSION_FIELDS`], and the
/// `created`/`modified` timestamps plus the last `max_time_entries` other
/// entries of `time`. The raw packument is consumed so it can be freed as soon
/// as shaping finishes.
pub fn shape_package_detail(packument: Value, limits: &ShapeLimits) -> Value {
  let Value::Object(mut raw) = packument else {
    return Value::Object(Map::new());
  };

  let mut shaped = Map::new();
  for field in DETAIL_TOP_LEVEL_FIELDS {
    if let Some(value) = raw.remove(field) {
      shaped.insert(field.to_string(), value);
    }
  }

  if let Some(Value::Object(versions)) = raw.remove("versions") {
    let retained: Map<String, Value> = take_last(versions.into_iter(), limits.max_detail_versions)
      .map(|(version, manifest)| (version, strip_version(manifest)))
      .collect();
    shaped.insert("versions".to_string(), Value::Object(retained));
  }

  if let Some(Value::Object(time)) = raw.remove("time") {
    shaped.insert(
      "time".to_string(),
      Value::Object(shape_time(time, limits.max_time_entries)),
    );
  }

  Value::Object(shaped)
}

fn strip_version(manifest: Value) -> Value {
  let Value::Object(mut manifest) = manifest else {
    return Value::Object(Map::new());
  };

  let mut kept = Map::new();
  for field in DETAIL_VERSION_FIELDS {
    if let Some(value) = manifest.remove(field) {
      kept.insert(field.to_string(), value);
    }
  }
  Value::Object(kept)
}

fn shape_time(time: Map<String, Value>, max_entries: usize) -> Map<String, Value> {
  let mut anchors = Map::new();
  let mut others = Vec::with_capacity(time.len());
  for (key, value) in time {
    if TIME_ANCHORS.contains(&key.as_str()) {
      anchors.insert(key, value);
    } else {
      others.push((key, value));
    }
  }

  let mut shaped = Map::new();
  for anchor in TIME_ANCHORS {
    if let Some(value) = anchors.remove(anchor) {
      shaped.insert(anchor.to_string(), value);
    }
  }
  shaped.extend(take_last(others.into_iter(), max_entries));
  shaped
}
