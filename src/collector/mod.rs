//! Resource collection
//!
//! This module handles:
//! - Walking a retrieved tree into a flat set of path-addressed resources
//! - Applying ignore files
//! - Validating paths from disk and from in-memory archives alike
//!
//! Symlinks are never followed. A symlink to a file inside the root is read
//! as a file; one resolving outside the root is handled by [`PathPolicy`].

pub mod ignore;

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::PathPolicy;
use crate::domain::Resource;
use crate::error::{ResolveError, Result};
use ignore::IgnoreRules;

/// Directory that is never collected
const GIT_DIR: &str = ".git";

/// How [`collect_dir`] treats the tree it walks
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions<'a> {
    pub policy: PathPolicy,
    /// File name of per-directory ignore files; `None` disables them
    pub ignore_file: Option<&'a str>,
}

impl Default for CollectOptions<'_> {
    fn default() -> Self {
        Self {
            policy: PathPolicy::Reject,
            ignore_file: None,
        }
    }
}

/// Collect every regular file beneath `root`
///
/// Resources are returned in file name order per directory; the assembler
/// establishes the final bundle order.
pub fn collect_dir(root: &Path, options: &CollectOptions<'_>) -> Result<Vec<Resource>> {
    let canonical_root = dunce::canonicalize(root).map_err(|_| ResolveError::SourceNotFound {
        path: root.display().to_string(),
    })?;

    let ignore = match options.ignore_file {
        Some(file_name) => IgnoreRules::load(&canonical_root, file_name)?,
        None => IgnoreRules::default(),
    };

    let walker = WalkDir::new(&canonical_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_dir() && entry.file_name() == GIT_DIR {
                return false;
            }
            match relative_path(&canonical_root, entry.path()) {
                Ok(relative) => !ignore.is_ignored(&relative, entry.file_type().is_dir()),
                // Reported when the entry itself is visited
                Err(_) => true,
            }
        });

    let mut resources = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| ResolveError::FileReadFailed {
            path: e
                .path()
                .map_or_else(|| root.display().to_string(), |p| p.display().to_string()),
            reason: e.to_string(),
        })?;

        if let Some(resource) = collect_entry(&canonical_root, &entry, options.policy)? {
            resources.push(resource);
        }
    }

    debug!(
        root = %root.display(),
        resources = resources.len(),
        "collected resources"
    );
    Ok(resources)
}

fn collect_entry(root: &Path, entry: &DirEntry, policy: PathPolicy) -> Result<Option<Resource>> {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return Ok(None);
    }

    let relative = relative_path(root, entry.path())?;

    if file_type.is_symlink() {
        let Ok(target) = dunce::canonicalize(entry.path()) else {
            warn!(path = %relative, "skipping dangling symlink");
            return Ok(None);
        };
        if !target.starts_with(root) {
            return match policy {
                PathPolicy::Reject => Err(ResolveError::PathTraversal { path: relative }),
                PathPolicy::Skip => {
                    warn!(path = %relative, "skipping symlink that escapes the source root");
                    Ok(None)
                }
            };
        }
        if !target.is_file() {
            debug!(path = %relative, "skipping symlink to directory");
            return Ok(None);
        }
    } else if !file_type.is_file() {
        debug!(path = %relative, "skipping special file");
        return Ok(None);
    }

    let content = fs::read(entry.path()).map_err(|e| ResolveError::FileReadFailed {
        path: entry.path().display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(Resource::new(relative, content)))
}

/// `/`-separated path of `path` relative to `root`
fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ResolveError::PathTraversal {
            path: path.display().to_string(),
        })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| ResolveError::FileReadFailed {
                    path: path.display().to_string(),
                    reason: "path is not valid UTF-8".to_string(),
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(ResolveError::PathTraversal {
                    path: path.display().to_string(),
                });
            }
        }
    }
    Ok(parts.join("/"))
}

/// Validate a relative resource path and normalize it to `/` separators
///
/// Absolute paths, `..` components and empty paths are rejected with
/// [`ResolveError::PathTraversal`]; `.` components are dropped.
pub fn validate_relative_path(path: &str) -> Result<String> {
    let traversal = || ResolveError::PathTraversal {
        path: path.to_string(),
    };

    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') || Path::new(path).is_absolute() {
        return Err(traversal());
    }

    let mut parts = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(traversal()),
            // Windows drive prefix such as `C:`
            _ if part.len() == 2 && part.ends_with(':') => return Err(traversal()),
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        return Err(traversal());
    }
    Ok(parts.join("/"))
}

/// Turn in-memory `(path, content)` entries into resources under `prefix`
///
/// Entries pass through the same validation as files read from disk.
pub fn collect_entries(entries: Vec<(String, Vec<u8>)>, prefix: &str) -> Result<Vec<Resource>> {
    entries
        .into_iter()
        .map(|(path, content)| {
            let path = validate_relative_path(&path)?;
            Ok(Resource::new(format!("{prefix}{path}"), content))
        })
        .collect()
}

/// Resolve `sub_path` inside `root`
///
/// The result must stay inside the root, following symlinks, and must exist.
pub fn resolve_sub_path(root: &Path, sub_path: &str) -> Result<PathBuf> {
    let trimmed = sub_path.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        return Ok(root.to_path_buf());
    }

    let relative = validate_relative_path(trimmed)?;
    let joined = root.join(&relative);
    if !joined.exists() {
        return Err(ResolveError::SubPathNotFound { path: relative });
    }

    let canonical_root = dunce::canonicalize(root)?;
    let canonical = dunce::canonicalize(&joined)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(ResolveError::PathTraversal { path: relative });
    }
    if !canonical.is_dir() {
        return Err(ResolveError::SubPathNotFound { path: relative });
    }
    Ok(canonical)
}
