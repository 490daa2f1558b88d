//! Resolver configuration
//!
//! Settings supplied by the host per invocation. They can be built in code or
//! loaded from a YAML document:
//!
//! ```yaml
//! timeout_secs: 30
//! credential_scope: "^https://charts\\.example\\.com/"
//! path_policy: reject
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// Default network timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Name of the release definition file looked up at the collection root
pub const DEFAULT_RELEASE_DEFINITION_FILE: &str = "fleet.yaml";

/// Name of the per-directory ignore file
pub const DEFAULT_IGNORE_FILE: &str = ".fleetignore";

/// Upper bound for the unpacked size of a chart archive (100 MB)
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 100 * 1024 * 1024;

/// What the collector does with an entry that resolves outside the root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathPolicy {
    /// Fail the resolution with `PathTraversal`
    #[default]
    Reject,
    /// Leave the entry out of the bundle and log a warning
    Skip,
}

/// Configuration for a [`crate::Resolver`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Timeout applied to every network operation
    pub timeout_secs: u64,

    /// Regular expression restricting which locations receive credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_scope: Option<String>,

    /// Handling of entries that escape the source root
    pub path_policy: PathPolicy,

    /// File name of the release definition at the collection root
    pub release_definition_file: String,

    /// File name of per-directory ignore files
    pub ignore_file: String,

    /// Maximum unpacked size of a single chart archive
    pub max_archive_bytes: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            credential_scope: None,
            path_policy: PathPolicy::default(),
            release_definition_file: DEFAULT_RELEASE_DEFINITION_FILE.to_string(),
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
        }
    }
}

impl ResolverConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ResolveError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self =
            serde_yaml::from_str(&yaml).map_err(|e| ResolveError::ConfigParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the credential scope pattern
    #[must_use]
    pub fn with_credential_scope(mut self, pattern: impl Into<String>) -> Self {
        self.credential_scope = Some(pattern.into());
        self
    }

    /// Set the network timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set the path policy
    #[must_use]
    pub fn with_path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    /// Network timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration
    ///
    /// The credential scope pattern is not compiled here; [`crate::Resolver::new`]
    /// compiles it, before any source is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ResolveError::ConfigInvalid {
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }
        validate_file_name("release_definition_file", &self.release_definition_file)?;
        validate_file_name("ignore_file", &self.ignore_file)?;
        if self.max_archive_bytes == 0 {
            return Err(ResolveError::ConfigInvalid {
                message: "max_archive_bytes must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_file_name(field: &str, name: &str) -> Result<()> {
    let is_plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\');
    if is_plain {
        Ok(())
    } else {
        Err(ResolveError::ConfigInvalid {
            message: format!("{field} must be a plain file name, got '{name}'"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ResolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.release_definition_file, "fleet.yaml");
        assert_eq!(config.path_policy, PathPolicy::Reject);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = ResolverConfig::from_yaml(
            "timeout_secs: 5\ncredential_scope: \"^https://charts\"\npath_policy: skip\n",
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.credential_scope.as_deref(), Some("^https://charts"));
        assert_eq!(config.path_policy, PathPolicy::Skip);
        assert_eq!(config.ignore_file, DEFAULT_IGNORE_FILE);
    }

    #[test]
    fn test_from_yaml_rejects_unknown_fields() {
        let result = ResolverConfig::from_yaml("timeout: 5\n");
        assert!(matches!(result, Err(ResolveError::ConfigParseFailed { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ResolverConfig::from_yaml("timeout_secs: 0\n");
        assert!(matches!(result, Err(ResolveError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_release_definition_must_be_file_name() {
        let config = ResolverConfig {
            release_definition_file: "../fleet.yaml".to_string(),
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("resolver.yaml");
        std::fs::write(&path, "ignore_file: .bundleignore\n").unwrap();

        let config = ResolverConfig::from_file(&path).unwrap();
        assert_eq!(config.ignore_file, ".bundleignore");
    }

    #[test]
    fn test_from_file_parse_error_names_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("resolver.yaml");
        std::fs::write(&path, "timeout_secs: [").unwrap();

        let err = ResolverConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("resolver.yaml"));
    }
}
