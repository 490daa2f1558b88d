//! URL handling for git operations
//!
//! This module handles:
//! - Detecting the transport a repository URL uses
//! - Normalizing SCP-style SSH URLs to ssh:// format
//! - Normalizing file:// URLs and absolute paths for libgit2

use std::borrow::Cow;
use std::path::Path;

use crate::error::{ResolveError, Result};

/// Transport used to reach a git repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `https://` or `http://`, authenticated with basic auth
    Https,
    /// `ssh://` or SCP-style `user@host:path`, authenticated with a key
    Ssh,
    /// `file://` or an absolute path; never authenticated
    Local,
}

impl Transport {
    /// Detect the transport of a repository URL
    pub fn detect(url: &str) -> Result<Self> {
        if url.starts_with("https://") || url.starts_with("http://") {
            Ok(Self::Https)
        } else if url.starts_with("ssh://") || is_scp_style(url) {
            Ok(Self::Ssh)
        } else if url.starts_with("file://") || Path::new(url).is_absolute() {
            Ok(Self::Local)
        } else {
            Err(ResolveError::UnsupportedLocation {
                location: url.to_string(),
            })
        }
    }

    /// Credential kind accepted by this transport, for error messages
    pub fn credential_kind(self) -> &'static str {
        match self {
            Self::Https => "basic",
            Self::Ssh => "ssh-key",
            Self::Local => "none",
        }
    }
}

/// Whether `url` is SCP-style (`user@host:path`)
fn is_scp_style(url: &str) -> bool {
    if url.contains("://") {
        return false;
    }
    match (url.find('@'), url.find(':')) {
        (Some(at), Some(colon)) => at < colon && colon + 1 < url.len(),
        _ => false,
    }
}

/// Normalize SSH URLs from SCP-style (user@host:path) to ssh:// format.
///
/// libgit2 may have issues with SCP-style SSH URLs, so we convert them to
/// the explicit ssh:// format for better compatibility.
pub fn normalize_ssh_url_for_clone(url: &str) -> Cow<'_, str> {
    if !is_scp_style(url) {
        return Cow::Borrowed(url);
    }

    // Find the colon that separates host from path
    if let Some(colon_pos) = url.find(':') {
        let host_part = &url[..colon_pos]; // user@host
        let path_part = &url[colon_pos + 1..]; // path/repo.git

        let normalized_path = if path_part.starts_with('/') {
            path_part.to_string()
        } else {
            format!("/{path_part}")
        };
        return Cow::Owned(format!("ssh://{host_part}{normalized_path}"));
    }

    Cow::Borrowed(url)
}

/// Normalize file:// URLs so libgit2 can resolve them on Unix.
pub fn normalize_file_url_for_clone(url: &str) -> Cow<'_, str> {
    if !url.starts_with("file://") {
        return Cow::Borrowed(url);
    }
    #[cfg(not(windows))]
    {
        let after = &url[7..]; // after "file://"
        if after.contains('\\') {
            let path = after.replace('\\', "/");
            return Cow::Owned(format!("file:///{path}"));
        }
        if !after.is_empty() && !after.starts_with('/') {
            return Cow::Owned(format!("file:///{after}"));
        }
    }
    Cow::Borrowed(url)
}

/// Apply every normalization libgit2 needs before cloning
pub fn normalize_for_clone(url: &str) -> String {
    let url = normalize_ssh_url_for_clone(url);
    normalize_file_url_for_clone(&url).into_owned()
}
