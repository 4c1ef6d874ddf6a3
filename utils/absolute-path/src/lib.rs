// Utils - Absolute Path
// Absolute path utilities

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` lexically, without touching the filesystem.
///
/// The result is absolute whenever `base` is, and `.`/`..` components are
/// folded so the path can be reported even when it does not exist.
pub fn resolve_against(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
  let path = path.as_ref();
  let joined = if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.as_ref().join(path)
  };
  normalize(&joined)
}

/// Resolve `path` against the process working directory.
pub fn resolve_from_cwd(path: impl AsRef<Path>) -> Result<PathBuf, anyhow::Error> {
  let cwd = std::env::current_dir()
    .map_err(|e| anyhow::anyhow!("Failed to read working directory: {}", e))?;
  Ok(resolve_against(cwd, path))
}

fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(component);
        }
      }
      other => out.push(other),
    }
  }
  out
}
