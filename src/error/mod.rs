//! Error types and handling for the bundle resolver
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Every variant renders as a single line that names the offending URL, path
//! or pattern. Credentials never appear in any variant.

use miette::Diagnostic;
use thiserror::Error;


/// Broad category of a [`ResolveError`], for callers that branch on the kind
/// of failure rather than on the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source demanded credentials, or rejected the ones supplied
    Authentication,
    /// Network, HTTP status or timeout failures
    Transport,
    /// Invalid caller-supplied configuration; detected before any network call
    Configuration,
    /// Path traversal or duplicate resource paths
    Integrity,
    /// The source content itself is missing or malformed
    Source,
    /// Local file system failures
    Io,
    /// The caller cancelled the resolution
    Cancelled,
}

/// Main error type for resolver operations
#[derive(Error, Diagnostic, Debug)]
pub enum ResolveError {
    // Authentication errors
    #[error("error cloning repo {url}: authentication required")]
    #[diagnostic(
        code(bundle_resolver::auth::required),
        help(
            "Supply a credential for this source, or check that the credential scope pattern matches its URL"
        )
    )]
    AuthenticationRequired { url: String },

    #[error("error cloning repo {url}: credentials were rejected")]
    #[diagnostic(
        code(bundle_resolver::auth::rejected),
        help("Check that the credential is valid and has read access to the repository")
    )]
    AuthenticationRejected { url: String },

    #[error("host key verification failed for {host}")]
    #[diagnostic(
        code(bundle_resolver::auth::host_key),
        help("Add the host key to the known hosts policy or pin its SHA256 fingerprint")
    )]
    HostKeyVerificationFailed { host: String },

    #[error("credential of type {found} cannot be used for {url} (expected {expected})")]
    #[diagnostic(code(bundle_resolver::auth::credential_mismatch))]
    CredentialMismatch {
        url: String,
        expected: String,
        found: String,
    },

    // Transport errors
    #[error("failed to read helm repo from {url}, error code: {status}, response body: {body}")]
    #[diagnostic(code(bundle_resolver::transport::upstream))]
    UpstreamTransport {
        url: String,
        status: u16,
        body: String,
    },

    #[error("source unreachable: {url}: {reason}")]
    #[diagnostic(
        code(bundle_resolver::transport::unreachable),
        help("Check the URL, DNS resolution and network connectivity")
    )]
    SourceUnreachable { url: String, reason: String },

    #[error("timed out after {timeout_secs}s while fetching {url}")]
    #[diagnostic(code(bundle_resolver::transport::timeout))]
    TransportTimeout { url: String, timeout_secs: u64 },

    // Configuration errors
    #[error("error parsing regexp: {reason}: `{pattern}`")]
    #[diagnostic(
        code(bundle_resolver::config::invalid_scope),
        help("The credential scope must be a valid regular expression")
    )]
    InvalidCredentialScope { pattern: String, reason: String },

    #[error("unsupported source location: {location}")]
    #[diagnostic(
        code(bundle_resolver::config::unsupported_location),
        help("Valid git locations: https://, http://, ssh://, git@host:path, file:// or an absolute path")
    )]
    UnsupportedLocation { location: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(bundle_resolver::config::invalid))]
    ConfigInvalid { message: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(bundle_resolver::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    // Integrity errors
    #[error("path escapes the source root: {path}")]
    #[diagnostic(code(bundle_resolver::integrity::path_traversal))]
    PathTraversal { path: String },

    #[error("duplicate resource path in bundle: {path}")]
    #[diagnostic(code(bundle_resolver::integrity::duplicate_path))]
    DuplicateResourcePath { path: String },

    // Source errors
    #[error("source not found: {path}")]
    #[diagnostic(code(bundle_resolver::source::not_found))]
    SourceNotFound { path: String },

    #[error("sub path not found in source: {path}")]
    #[diagnostic(code(bundle_resolver::source::sub_path_not_found))]
    SubPathNotFound { path: String },

    #[error("Failed to clone repository: {url}: {reason}")]
    #[diagnostic(
        code(bundle_resolver::git::clone_failed),
        help("Check that URL is correct and you have access to repository")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to resolve git ref '{git_ref}': {reason}")]
    #[diagnostic(code(bundle_resolver::git::ref_resolve_failed))]
    GitRefResolveFailed { git_ref: String, reason: String },

    #[error("Failed to checkout commit '{sha}': {reason}")]
    #[diagnostic(code(bundle_resolver::git::checkout_failed))]
    GitCheckoutFailed { sha: String, reason: String },

    #[error("chart {chart} (version {version}) not found in {url}")]
    #[diagnostic(code(bundle_resolver::helm::chart_not_found))]
    ChartNotFound {
        chart: String,
        version: String,
        url: String,
    },

    #[error("invalid chart archive from {url}: {reason}")]
    #[diagnostic(code(bundle_resolver::helm::archive_invalid))]
    ChartArchiveInvalid { url: String, reason: String },

    #[error("failed to parse helm repo index from {url}: {reason}")]
    #[diagnostic(code(bundle_resolver::helm::index_invalid))]
    IndexParseFailed { url: String, reason: String },

    #[error("invalid release definition {path}: {reason}")]
    #[diagnostic(code(bundle_resolver::release::invalid))]
    ReleaseDefinitionInvalid { path: String, reason: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bundle_resolver::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundle_resolver::fs::io_error))]
    IoError { message: String },

    #[error("resolution cancelled")]
    #[diagnostic(code(bundle_resolver::cancelled))]
    Cancelled,
}

impl ResolveError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationRequired { .. }
            | Self::AuthenticationRejected { .. }
            | Self::HostKeyVerificationFailed { .. } => ErrorKind::Authentication,
            Self::UpstreamTransport { .. }
            | Self::SourceUnreachable { .. }
            | Self::TransportTimeout { .. } => ErrorKind::Transport,
            Self::CredentialMismatch { .. }
            | Self::InvalidCredentialScope { .. }
            | Self::UnsupportedLocation { .. }
            | Self::ConfigInvalid { .. }
            | Self::ConfigParseFailed { .. } => ErrorKind::Configuration,
            Self::PathTraversal { .. } | Self::DuplicateResourcePath { .. } => {
                ErrorKind::Integrity
            }
            Self::SourceNotFound { .. }
            | Self::SubPathNotFound { .. }
            | Self::GitCloneFailed { .. }
            | Self::GitRefResolveFailed { .. }
            | Self::GitCheckoutFailed { .. }
            | Self::ChartNotFound { .. }
            | Self::ChartArchiveInvalid { .. }
            | Self::IndexParseFailed { .. }
            | Self::ReleaseDefinitionInvalid { .. } => ErrorKind::Source,
            Self::FileReadFailed { .. } | Self::IoError { .. } => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ResolveError {
    fn from(err: serde_yaml::Error) -> Self {
        ResolveError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, ResolveError>;
