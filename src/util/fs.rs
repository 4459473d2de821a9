//! Filesystem and path utilities.
//!
//! Paths that end up in the packaging hand-off are kept as `/`-separated
//! strings relative to the project root; the helpers here convert between
//! those and native [`Path`]s and compare them segment by segment.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a single file, creating the destination's parent directories.
///
/// Returns `true` when a parent directory had to be created.
pub fn copy_file_with_parents(src: &Path, dst: &Path) -> Result<bool> {
    let mut created = false;
    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            ensure_dir(parent)?;
            created = true;
        }
    }
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(created)
}

/// Find files matching a glob pattern relative to a base directory, sorted.
pub fn glob_sorted(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    results.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    Ok(results)
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a path with `/` separators regardless of platform.
pub fn to_unix_path(path: &Path) -> String {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    // A leading root component renders as "/" and would double up.
    if path.has_root() && joined.starts_with("//") {
        joined[1..].to_string()
    } else {
        joined
    }
}

/// Normalize a user-supplied relative directory into `/`-form.
///
/// Backslashes become slashes, `.` segments and trailing separators are
/// dropped, and `"."` itself becomes the empty string.
pub fn normalize_rel_dir(dir: &str) -> String {
    dir.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip `prefix` from `path` when it covers whole leading segments.
///
/// An empty prefix matches every path. A path equal to the prefix is not
/// considered to be *under* it and yields `None`.
pub fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Check whether `path` starts with `prefix` on a segment boundary
/// (including equality).
pub fn starts_with_segments(path: &str, prefix: &str) -> bool {
    prefix.is_empty() || path == prefix || strip_segment_prefix(path, prefix).is_some()
}

/// Join two `/`-form relative paths, tolerating empty sides.
pub fn join_unix(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, rest),
    }
}

/// Parent directory of a `/`-form path, or `""` at the top level.
pub fn unix_parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
