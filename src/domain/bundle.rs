//! Bundle model
//!
//! A **Bundle** is the result of one resolution: the source it came from
//! (without credentials), its resources sorted by path, and the release
//! definition if the source carried one. Bundles are only built by
//! [`crate::assembler::BundleAssembler`], which enforces ordering and path
//! uniqueness.

use serde::Serialize;

use super::resource::Resource;
use crate::error::{ResolveError, Result};
use crate::hash;
use crate::release::ReleaseDefinition;
use crate::source::SourceDescriptor;

/// Canonical, ordered, path-unique set of resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    name: String,
    source: SourceDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<ReleaseDefinition>,
    resources: Vec<Resource>,
}

impl Bundle {
    /// Only called by the assembler, after sorting and duplicate checks
    pub(crate) fn from_parts(
        name: String,
        source: SourceDescriptor,
        revision: Option<String>,
        release: Option<ReleaseDefinition>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            name,
            source,
            revision,
            release,
            resources,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source descriptor; never carries a credential
    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    /// Resolved git SHA or chart version
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn release(&self) -> Option<&ReleaseDefinition> {
        self.release.as_ref()
    }

    /// Resources sorted by path
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up a resource by path
    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.resources
            .binary_search_by(|resource| resource.path().cmp(path))
            .ok()
            .map(|index| &self.resources[index])
    }

    /// Resource paths in bundle order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(Resource::path)
    }

    /// BLAKE3 digest over every `(path, content)` pair in order
    ///
    /// Two bundles with the same resources have the same digest, whatever
    /// source they were resolved from.
    pub fn digest(&self) -> String {
        hash::hash_entries(
            self.resources
                .iter()
                .map(|resource| (resource.path(), resource.content())),
        )
    }

    /// Render as YAML for the downstream engine
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ResolveError::IoError {
            message: format!("failed to serialize bundle {}: {e}", self.name),
        })
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ResolveError::IoError {
            message: format!("failed to serialize bundle {}: {e}", self.name),
        })
    }
}
