//! Chart repository index (`index.yaml`)
//!
//! Only the fields needed to locate a chart archive are modeled; everything
//! else in the index is ignored.

use std::collections::BTreeMap;

use semver::{Version, VersionReq};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{ResolveError, Result};

/// Parsed repository index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: Option<String>,

    /// Chart name to published versions
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

/// One published version of a chart
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChartVersion {
    pub name: String,
    pub version: String,

    /// Archive locations, absolute or relative to the repository base URL
    #[serde(default)]
    pub urls: Vec<String>,

    /// SHA-256 of the archive as published by the repository
    #[serde(default)]
    pub digest: Option<String>,
}

impl ChartVersion {
    fn semver(&self) -> Option<Version> {
        parse_version(&self.version)
    }

    /// Check a downloaded archive against the published digest
    ///
    /// Entries without a digest accept any archive.
    pub fn verify_digest(&self, archive: &[u8], url: &str) -> Result<()> {
        let Some(expected) = self.digest.as_deref().map(str::trim).filter(|d| !d.is_empty())
        else {
            return Ok(());
        };

        let actual = hex::encode(Sha256::digest(archive));
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(ResolveError::ChartArchiveInvalid {
                url: url.to_string(),
                reason: format!("digest mismatch: expected sha256 {expected}, got {actual}"),
            })
        }
    }
}

fn parse_version(version: &str) -> Option<Version> {
    Version::parse(version.trim_start_matches('v')).ok()
}

impl IndexFile {
    /// Parse an index document fetched from `url`
    pub fn from_yaml(yaml: &str, url: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ResolveError::IndexParseFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Select a chart version
    ///
    /// `version` is tried as an exact version first, then as a semver
    /// requirement such as `^1.2`. Without a version the highest semver
    /// version wins; versions that are not semver rank below all others.
    pub fn find(&self, chart: &str, version: Option<&str>) -> Option<&ChartVersion> {
        let versions = self.entries.get(chart)?;

        let Some(wanted) = version.map(str::trim).filter(|v| !v.is_empty()) else {
            return highest(versions.iter());
        };

        let exact = versions.iter().find(|candidate| {
            candidate.version == wanted
                || candidate.version.trim_start_matches('v') == wanted.trim_start_matches('v')
        });
        if exact.is_some() {
            return exact;
        }

        let requirement = VersionReq::parse(wanted).ok()?;
        versions
            .iter()
            .filter_map(|candidate| candidate.semver().map(|v| (v, candidate)))
            .filter(|(v, _)| requirement.matches(v))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, candidate)| candidate)
    }
}

fn highest<'a>(versions: impl Iterator<Item = &'a ChartVersion>) -> Option<&'a ChartVersion> {
    let versions: Vec<&ChartVersion> = versions.collect();
    versions
        .iter()
        .filter_map(|candidate| candidate.semver().map(|v| (v, *candidate)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, candidate)| candidate)
        .or_else(|| versions.first().copied())
}
