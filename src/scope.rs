//! Credential scope rules
//!
//! A scope rule is a regular expression matched against the source location.
//! A supplied credential is only attached to sources whose location matches;
//! with no rule, an explicitly supplied credential is always attached.
//!
//! Compilation is separate from matching so that an invalid pattern fails
//! the resolution before any network call.

use regex::Regex;
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::source::Credential;

/// A compiled credential scope rule
#[derive(Debug, Clone)]
pub struct CredentialScope {
    pattern: String,
    regex: Regex,
}

impl CredentialScope {
    /// Compile a scope pattern
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ResolveError::InvalidCredentialScope {
            pattern: pattern.to_string(),
            reason: summarize_regex_error(&e),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern this rule was compiled from
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `location` is in scope (unanchored match)
    pub fn matches(&self, location: &str) -> bool {
        self.regex.is_match(location)
    }
}

/// Decide which credential, if any, is attached to `location`
pub fn effective_credential<'a>(
    credential: Option<&'a Credential>,
    scope: Option<&CredentialScope>,
    location: &str,
) -> Option<&'a Credential> {
    let credential = credential?;

    match scope {
        None => Some(credential),
        Some(rule) if rule.matches(location) => Some(credential),
        Some(rule) => {
            debug!(
                location,
                pattern = rule.pattern(),
                kind = credential.kind(),
                "credential withheld: location outside credential scope"
            );
            None
        }
    }
}

/// Reduce a multi-line regex syntax error to its final message line
///
/// `regex` renders syntax errors with a caret diagram spanning several
/// lines; only the trailing `error: ...` line is kept.
fn summarize_regex_error(err: &regex::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error: ").unwrap_or(line).to_string())
        .unwrap_or(rendered)
}
