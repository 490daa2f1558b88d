//! Source descriptors
//!
//! A [`SourceDescriptor`] says where content comes from and how to
//! authenticate. It is built by the caller for one resolution and never
//! mutated by the resolver.

use serde::{Deserialize, Serialize};

use super::Credential;

/// Kind of content source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A git repository reached over HTTPS, SSH or `file://`
    Git,
    /// A Helm-style package repository serving `index.yaml`
    HelmRepo,
    /// A directory on the local file system
    Local,
}

/// Where to fetch content from and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    /// Source kind
    pub kind: SourceKind,

    /// Repository URL, package repository base URL, or directory path
    pub location: String,

    /// Path within the source that collection is restricted to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    /// Git ref (branch, tag, or SHA) or chart version requirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Chart name (package repositories only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Explicit bundle name, overriding the derived one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Credential supplied for this resolution
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl SourceDescriptor {
    fn new(kind: SourceKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            sub_path: None,
            revision: None,
            chart: None,
            name: None,
            credential: None,
        }
    }

    /// Describe a git repository
    pub fn git(url: impl Into<String>) -> Self {
        Self::new(SourceKind::Git, url)
    }

    /// Describe a chart in a package repository
    pub fn helm_repo(base_url: impl Into<String>, chart: impl Into<String>) -> Self {
        let mut source = Self::new(SourceKind::HelmRepo, base_url);
        source.chart = Some(chart.into());
        source
    }

    /// Describe a local directory
    pub fn local(path: impl Into<String>) -> Self {
        Self::new(SourceKind::Local, path)
    }

    /// Restrict collection to a path within the source
    #[must_use]
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    /// Set git ref or chart version
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Set an explicit bundle name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a credential
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Copy of this descriptor with the credential removed
    ///
    /// This is what gets frozen into a bundle.
    pub fn without_credential(&self) -> Self {
        Self {
            credential: None,
            ..self.clone()
        }
    }
}
