//! In-memory chart archive extraction
//!
//! Chart archives are gzip-compressed tarballs with a leading `<chart>/`
//! directory. Extraction never touches the file system: entries are read into
//! memory and validated like any other collected path.
//!
//! Rejected outright:
//! - Entries with `..` components or absolute paths
//! - Symlinks, hardlinks, devices and other non-regular entries
//! - Archives over the entry-count or extracted-size limit

use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::error::{ResolveError, Result};

/// Maximum number of entries allowed in a chart archive.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Extract every regular file of a chart archive
///
/// Returns `(path, content)` pairs with the leading chart directory stripped
/// and `/` as separator, in archive order.
pub fn extract_chart(data: &[u8], url: &str, max_bytes: u64) -> Result<Vec<(String, Vec<u8>)>> {
    let invalid = |reason: String| ResolveError::ChartArchiveInvalid {
        url: url.to_string(),
        reason,
    };

    let mut archive = Archive::new(GzDecoder::new(data));
    let mut files = Vec::new();
    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    let entries = archive
        .entries()
        .map_err(|e| invalid(format!("failed to read archive entries: {e}")))?;

    for entry_result in entries {
        let mut entry =
            entry_result.map_err(|e| invalid(format!("failed to read archive entry: {e}")))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(invalid(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let entry_path = entry
            .path()
            .map_err(|e| invalid(format!("failed to read entry path: {e}")))?
            .into_owned();
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            return Err(invalid(format!(
                "unsupported entry type {entry_type:?} for {}",
                entry_path.display()
            )));
        }
        if entry_type != EntryType::Regular {
            continue;
        }

        let entry_size = entry
            .header()
            .size()
            .map_err(|e| invalid(format!("failed to read entry size: {e}")))?;
        total_size = total_size.saturating_add(entry_size);
        if total_size > max_bytes {
            return Err(invalid(format!(
                "archive exceeds maximum extracted size ({max_bytes} bytes)"
            )));
        }

        let Some(relative) = strip_chart_prefix(&entry_path) else {
            // A regular file at the archive root has no chart directory
            continue;
        };

        let mut content = Vec::with_capacity(usize::try_from(entry_size).unwrap_or(0));
        entry
            .read_to_end(&mut content)
            .map_err(|e| invalid(format!("failed to read {}: {e}", entry_path.display())))?;

        files.push((relative, content));
    }

    if files.is_empty() {
        return Err(invalid("archive contains no files".to_string()));
    }

    Ok(files)
}

/// Check whether a tar entry type may appear in a chart archive.
///
/// Directories and metadata headers are tolerated and skipped; only regular
/// files produce resources.
fn is_safe_entry_type(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Regular
            | EntryType::Directory
            | EntryType::GNULongName
            | EntryType::XHeader
            | EntryType::XGlobalHeader
    )
}

/// Validate that an entry path has no traversal components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<()> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        });

    if escapes {
        return Err(ResolveError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Strip the leading `<chart>/` directory, joining the rest with `/`
fn strip_chart_prefix(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .skip(1)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
