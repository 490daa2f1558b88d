//! Bundle assembly
//!
//! The assembler is the only place a [`Bundle`] is built. It strips the
//! credential from the source descriptor, orders resources by path and
//! rejects duplicate paths, so every bundle it returns is canonical.

use crate::domain::{Bundle, Resource};
use crate::error::{ResolveError, Result};
use crate::release::ReleaseDefinition;
use crate::source::SourceDescriptor;

/// Collects the pieces of one resolution into a [`Bundle`]
#[derive(Debug)]
pub struct BundleAssembler {
    name: String,
    source: SourceDescriptor,
    revision: Option<String>,
    release: Option<ReleaseDefinition>,
    resources: Vec<Resource>,
}

impl BundleAssembler {
    pub fn new(name: impl Into<String>, source: &SourceDescriptor) -> Self {
        Self {
            name: name.into(),
            source: source.without_credential(),
            revision: None,
            release: None,
            resources: Vec::new(),
        }
    }

    pub fn add_resources(&mut self, resources: impl IntoIterator<Item = Resource>) {
        self.resources.extend(resources);
    }

    #[must_use]
    pub fn with_release(mut self, release: Option<ReleaseDefinition>) -> Self {
        self.release = release;
        self
    }

    /// Record the resolved git SHA or chart version
    #[must_use]
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Number of resources added so far
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Sort resources by path and build the bundle
    ///
    /// Fails with [`ResolveError::DuplicateResourcePath`] if two resources
    /// share a path.
    pub fn assemble(self) -> Result<Bundle> {
        let mut resources = self.resources;
        resources.sort_by(|a, b| a.path().cmp(b.path()));

        if let Some(pair) = resources
            .windows(2)
            .find(|pair| pair[0].path() == pair[1].path())
        {
            return Err(ResolveError::DuplicateResourcePath {
                path: pair[0].path().to_string(),
            });
        }

        Ok(Bundle::from_parts(
            self.name,
            self.source,
            self.revision,
            self.release,
            resources,
        ))
    }
}
