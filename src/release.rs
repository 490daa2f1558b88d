//! Release definition (`fleet.yaml`)
//!
//! The release definition sits at the collection root and may name a chart to
//! resolve in addition to the collected files. Only the fields the resolver
//! acts on are modeled; unknown keys are tolerated so that definitions written
//! for the downstream engine parse unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// Parsed release definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmOptions>,
}

/// `helm:` section of a release definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmOptions {
    /// Chart name in `repo`, a direct archive URL, or a local path
    #[serde(default)]
    pub chart: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Exact version or semver requirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,
}

/// Where the chart named by a release definition comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// Chart looked up in a repository index
    Repository {
        repo: String,
        chart: String,
        version: Option<String>,
    },
    /// Archive downloaded directly, without an index
    Archive { url: String },
}

impl ReleaseDefinition {
    /// Parse a release definition; `path` is only used in error messages
    ///
    /// An empty document is a valid, empty definition.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let definition: Self =
            serde_yaml::from_str(yaml).map_err(|e| ResolveError::ReleaseDefinitionInvalid {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        definition.validate(path)?;
        Ok(definition)
    }

    fn validate(&self, path: &str) -> Result<()> {
        if let Some(helm) = &self.helm {
            if helm.chart.trim().is_empty() && helm.repo.is_some() {
                return Err(ResolveError::ReleaseDefinitionInvalid {
                    path: path.to_string(),
                    reason: "helm.repo is set but helm.chart is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Chart that has to be fetched for this release, if any
    ///
    /// A chart without `repo` that is not a URL refers to a path inside the
    /// collected tree and needs no fetch.
    pub fn chart_source(&self) -> Option<ChartSource> {
        let helm = self.helm.as_ref()?;
        let chart = helm.chart.trim();
        if chart.is_empty() {
            return None;
        }

        match helm.repo.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(repo) => Some(ChartSource::Repository {
                repo: repo.to_string(),
                chart: chart.to_string(),
                version: helm.version.clone().filter(|v| !v.trim().is_empty()),
            }),
            None if is_remote_url(chart) => Some(ChartSource::Archive {
                url: chart.to_string(),
            }),
            None => None,
        }
    }
}

fn is_remote_url(chart: &str) -> bool {
    chart.starts_with("http://") || chart.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_chart() {
        let yaml = r"
defaultNamespace: helm-test
helm:
  chart: config-chart
  repo: http://localhost:3000
  version: 0.1.0
  releaseName: config
  values:
    replicas: 2
";
        let definition = ReleaseDefinition::from_yaml(yaml, "fleet.yaml").unwrap();
        assert_eq!(definition.default_namespace.as_deref(), Some("helm-test"));
        let helm = definition.helm.as_ref().unwrap();
        assert_eq!(helm.release_name.as_deref(), Some("config"));

        assert_eq!(
            definition.chart_source(),
            Some(ChartSource::Repository {
                repo: "http://localhost:3000".to_string(),
                chart: "config-chart".to_string(),
                version: Some("0.1.0".to_string()),
            })
        );
    }

    #[test]
    fn test_direct_archive_url() {
        let yaml = "helm:\n  chart: https://charts.example.com/config-chart-0.1.0.tgz\n";
        let definition = ReleaseDefinition::from_yaml(yaml, "fleet.yaml").unwrap();
        assert_eq!(
            definition.chart_source(),
            Some(ChartSource::Archive {
                url: "https://charts.example.com/config-chart-0.1.0.tgz".to_string()
            })
        );
    }

    #[test]
    fn test_local_chart_needs_no_fetch() {
        let yaml = "helm:\n  chart: ./chart\n";
        let definition = ReleaseDefinition::from_yaml(yaml, "fleet.yaml").unwrap();
        assert!(definition.chart_source().is_none());
    }

    #[test]
    fn test_no_helm_section() {
        let definition =
            ReleaseDefinition::from_yaml("defaultNamespace: simple\n", "fleet.yaml").unwrap();
        assert!(definition.helm.is_none());
        assert!(definition.chart_source().is_none());
    }

    #[test]
    fn test_empty_file() {
        let definition = ReleaseDefinition::from_yaml("  \n", "fleet.yaml").unwrap();
        assert_eq!(definition, ReleaseDefinition::default());
    }

    #[test]
    fn test_repo_without_chart_is_invalid() {
        let result = ReleaseDefinition::from_yaml("helm:\n  repo: http://x\n", "a/fleet.yaml");
        match result {
            Err(ResolveError::ReleaseDefinitionInvalid { path, .. }) => {
                assert_eq!(path, "a/fleet.yaml");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ReleaseDefinition::from_yaml("helm: [", "fleet.yaml");
        assert!(matches!(
            result,
            Err(ResolveError::ReleaseDefinitionInvalid { .. })
        ));
    }
}
