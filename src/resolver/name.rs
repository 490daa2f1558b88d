//! Bundle naming
//!
//! An explicit name on the descriptor wins, then the release definition's
//! `name`, then a name derived from the location. Every name is sanitized to
//! lowercase `[a-z0-9.-]` so it can be used as an object name downstream.

use std::path::{Component, Path};

use crate::release::ReleaseDefinition;
use crate::source::{SourceDescriptor, SourceKind};

const FALLBACK_NAME: &str = "bundle";

/// Name of the bundle resolved from `source`
pub fn bundle_name(source: &SourceDescriptor, release: Option<&ReleaseDefinition>) -> String {
    let explicit = source
        .name
        .as_deref()
        .or_else(|| release.and_then(|r| r.name.as_deref()))
        .filter(|name| !name.trim().is_empty());

    match explicit {
        Some(name) => sanitize(name),
        None => sanitize(&derive_name(source)),
    }
}

fn derive_name(source: &SourceDescriptor) -> String {
    let mut parts: Vec<String> = match source.kind {
        SourceKind::Local => local_parts(&source.location),
        SourceKind::Git => repo_name(&source.location).into_iter().collect(),
        SourceKind::HelmRepo => source.chart.clone().into_iter().collect(),
    };

    if let Some(sub_path) = &source.sub_path {
        parts.extend(
            sub_path
                .split(['/', '\\'])
                .filter(|part| !part.is_empty() && *part != "." && *part != "..")
                .map(str::to_string),
        );
    }

    parts.join("-")
}

/// `assets/simple` → `[assets, simple]`; absolute paths keep only the last
/// component
fn local_parts(location: &str) -> Vec<String> {
    let path = Path::new(location);
    let normal: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if path.is_absolute() {
        normal.last().cloned().into_iter().collect()
    } else {
        normal
    }
}

/// `https://host/org/repo.git` → `repo`, `git@host:org/repo` → `repo`
fn repo_name(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .map(|last| last.trim_end_matches(".git").to_string())
        .filter(|name| !name.is_empty())
}

fn sanitize(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(c);
    }

    let trimmed = sanitized.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
