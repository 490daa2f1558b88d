//! Git error handling
//!
//! This module handles:
//! - Interpreting git2 errors into typed resolver errors
//! - Separating "no credential", "credential rejected" and "unreachable"

use std::time::Duration;

use git2::{Error, ErrorClass, ErrorCode};

use super::auth::AuthOutcome;
use crate::error::ResolveError;

/// Internal enum for error type classification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GitFailure {
    RepositoryNotFound,
    Authentication,
    PermissionDenied,
    Network,
    Timeout,
    Other,
}

type ErrorCheck = fn(&str, ErrorCode, ErrorClass) -> bool;

// Order matters - more specific patterns first
const ERROR_CLASSIFICATIONS: &[(ErrorCheck, GitFailure)] = &[
    (
        |msg, code, _| code == ErrorCode::Timeout || msg.contains("timed out"),
        GitFailure::Timeout,
    ),
    (
        |msg, code, _| {
            code == ErrorCode::Auth
                || msg.contains("authentication")
                || msg.contains("credentials")
                || msg.contains("401")
        },
        GitFailure::Authentication,
    ),
    (
        |msg, _, _| {
            msg.contains("permission denied")
                || msg.contains("access denied")
                || msg.contains("403")
        },
        GitFailure::PermissionDenied,
    ),
    (
        |msg, _, _| msg.contains("not found") || msg.contains("404"),
        GitFailure::RepositoryNotFound,
    ),
    (
        |msg, _, class| {
            class == ErrorClass::Net
                || msg.contains("connection")
                || msg.contains("network")
                || msg.contains("could not resolve")
                || msg.contains("failed to resolve")
                || msg.contains("failed to connect")
        },
        GitFailure::Network,
    ),
];

fn classify(err: &Error) -> GitFailure {
    let message = err.message().to_lowercase();
    ERROR_CLASSIFICATIONS
        .iter()
        .find(|(check, _)| check(&message, err.code(), err.class()))
        .map_or(GitFailure::Other, |(_, failure)| *failure)
}

/// Interpret a git2 clone error in light of what the auth callbacks saw
///
/// `timeout` is the server timeout configured for libgit2; a socket that
/// stays silent past it surfaces here as a timeout error.
pub fn interpret_clone_error(
    err: &Error,
    outcome: &AuthOutcome,
    url: &str,
    timeout: Duration,
) -> ResolveError {
    if let Some(host) = outcome.rejected_host() {
        return ResolveError::HostKeyVerificationFailed { host };
    }

    match classify(err) {
        GitFailure::Authentication | GitFailure::PermissionDenied if outcome.offered() => {
            ResolveError::AuthenticationRejected {
                url: url.to_string(),
            }
        }
        GitFailure::Authentication => ResolveError::AuthenticationRequired {
            url: url.to_string(),
        },
        GitFailure::PermissionDenied => ResolveError::AuthenticationRejected {
            url: url.to_string(),
        },
        GitFailure::Timeout => ResolveError::TransportTimeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        },
        GitFailure::Network => ResolveError::SourceUnreachable {
            url: url.to_string(),
            reason: err.message().to_string(),
        },
        GitFailure::RepositoryNotFound => ResolveError::GitCloneFailed {
            url: url.to_string(),
            reason: "Repository not found".to_string(),
        },
        GitFailure::Other => ResolveError::GitCloneFailed {
            url: url.to_string(),
            reason: format!("{}: {}", error_class_name(err.class()), err.message()),
        },
    }
}

/// Get display name for error class
fn error_class_name(class: ErrorClass) -> &'static str {
    match class {
        ErrorClass::Http => "HTTP error",
        ErrorClass::Ssh => "SSH error",
        ErrorClass::Ssl => "SSL error",
        ErrorClass::Net => "Network error",
        _ => "git error",
    }
}
