//! Bundle resolution
//!
//! This module handles:
//! - Compiling the credential scope before anything touches the network
//! - Fetching a source (git snapshot, chart repository or local directory)
//! - Collecting its files and fetching the chart named by its release
//!   definition
//! - Assembling the canonical bundle
//!
//! Each resolution runs synchronously on the calling thread and owns all of
//! its temporary state. A [`Resolver`] holds only immutable configuration and
//! can be shared between threads.

pub mod name;
pub mod state;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, info, info_span};

use crate::assembler::BundleAssembler;
use crate::cancel::{CancellationExt, CancellationToken};
use crate::collector::{
    CollectOptions, collect_dir, collect_entries, resolve_sub_path, validate_relative_path,
};
use crate::config::ResolverConfig;
use crate::domain::Bundle;
use crate::error::{ResolveError, Result};
use crate::git::{CloneRequest, fetch_snapshot, set_server_timeouts};
use crate::helm::{FetchedChart, HelmRepository, fetch_chart_archive};
use crate::release::{ChartSource, ReleaseDefinition};
use crate::scope::{CredentialScope, effective_credential};
use crate::source::{Credential, SourceDescriptor, SourceKind};
use name::bundle_name;
use state::{Resolution, ResolutionState};

/// Directory under which charts named by a release definition are merged
pub const CHART_DIR: &str = ".chart";

/// Resolves source descriptors into bundles
#[derive(Debug)]
pub struct Resolver {
    config: ResolverConfig,
    scope: Option<CredentialScope>,
}

impl Resolver {
    /// Create a resolver
    ///
    /// The configuration is validated and the credential scope compiled
    /// here, so an invalid pattern fails before any source is contacted.
    ///
    /// The configured timeout is also applied to libgit2's socket connect and
    /// read operations. libgit2 keeps these settings per process, so the
    /// most recently created resolver determines them for every git clone.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let scope = config
            .credential_scope
            .as_deref()
            .map(CredentialScope::compile)
            .transpose()?;
        set_server_timeouts(config.timeout())?;

        Ok(Self { config, scope })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve one source into a bundle
    pub fn resolve(&self, source: &SourceDescriptor) -> Result<Bundle> {
        self.resolve_with_cancel(source, &CancellationToken::new())
    }

    /// Resolve one source, stopping early once `cancel` is triggered
    ///
    /// A cancelled resolution returns [`ResolveError::Cancelled`] and no
    /// bundle; its temporary files are removed before this returns.
    pub fn resolve_with_cancel(
        &self,
        source: &SourceDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Bundle> {
        let span = info_span!("resolve", kind = ?source.kind, location = %source.location);
        let _guard = span.enter();

        let mut resolution = Resolution::new(&source.location);
        match self.run(source, cancel, &mut resolution) {
            Ok(bundle) => {
                resolution.advance(ResolutionState::Assembled);
                info!(
                    bundle = bundle.name(),
                    resources = bundle.len(),
                    digest = %bundle.digest(),
                    "bundle resolved"
                );
                Ok(bundle)
            }
            Err(e) => {
                resolution.fail(&e);
                Err(e)
            }
        }
    }

    /// Resolve several sources concurrently, one thread per source
    ///
    /// Results are returned in the order of `sources`.
    pub fn resolve_many(&self, sources: &[SourceDescriptor]) -> Vec<Result<Bundle>> {
        let cancel = CancellationToken::new();
        let cancel = &cancel;
        thread::scope(|scope| {
            let handles: Vec<_> = sources
                .iter()
                .map(|source| scope.spawn(move || self.resolve_with_cancel(source, cancel)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ResolveError::IoError {
                            message: "resolution thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        })
    }

    fn run(
        &self,
        source: &SourceDescriptor,
        cancel: &CancellationToken,
        resolution: &mut Resolution<'_>,
    ) -> Result<Bundle> {
        cancel.check()?;
        resolution.advance(ResolutionState::Fetching);

        match source.kind {
            SourceKind::Git => self.resolve_git(source, cancel, resolution),
            SourceKind::Local => self.resolve_local(source, cancel, resolution),
            SourceKind::HelmRepo => self.resolve_helm_repo(source, cancel, resolution),
        }
    }

    fn resolve_git(
        &self,
        source: &SourceDescriptor,
        cancel: &CancellationToken,
        resolution: &mut Resolution<'_>,
    ) -> Result<Bundle> {
        let credential = effective_credential(
            source.credential.as_ref(),
            self.scope.as_ref(),
            &source.location,
        );

        // The snapshot directory lives until the bundle is assembled
        let snapshot = fetch_snapshot(&CloneRequest {
            url: &source.location,
            revision: source.revision.as_deref(),
            credential,
            timeout: self.config.timeout(),
            cancel,
        })?;
        cancel.check()?;

        let root = collection_root(snapshot.root(), source.sub_path.as_deref())?;
        self.assemble_tree(
            source,
            &root,
            Some(snapshot.sha().to_string()),
            cancel,
            resolution,
        )
    }

    fn resolve_local(
        &self,
        source: &SourceDescriptor,
        cancel: &CancellationToken,
        resolution: &mut Resolution<'_>,
    ) -> Result<Bundle> {
        let path = Path::new(&source.location);
        if !path.is_dir() {
            return Err(ResolveError::SourceNotFound {
                path: source.location.clone(),
            });
        }

        let root = collection_root(path, source.sub_path.as_deref())?;
        self.assemble_tree(source, &root, None, cancel, resolution)
    }

    fn resolve_helm_repo(
        &self,
        source: &SourceDescriptor,
        cancel: &CancellationToken,
        resolution: &mut Resolution<'_>,
    ) -> Result<Bundle> {
        let chart = source
            .chart
            .as_deref()
            .map(str::trim)
            .filter(|chart| !chart.is_empty())
            .ok_or_else(|| ResolveError::ConfigInvalid {
                message: format!(
                    "chart repository source {} requires a chart name",
                    source.location
                ),
            })?;

        let credential = effective_credential(
            source.credential.as_ref(),
            self.scope.as_ref(),
            &source.location,
        );
        let repository = HelmRepository::new(
            &source.location,
            credential,
            self.config.timeout(),
            self.config.max_archive_bytes,
        )?;
        let fetched = repository.fetch_chart(chart, source.revision.as_deref())?;
        cancel.check()?;

        resolution.advance(ResolutionState::Collecting);
        let files = match source.sub_path.as_deref() {
            Some(sub_path) => restrict_to_sub_path(fetched.files, sub_path)?,
            None => fetched.files,
        };

        let mut assembler =
            BundleAssembler::new(bundle_name(source, None), source).with_revision(fetched.version);
        assembler.add_resources(collect_entries(files, "")?);

        cancel.check()?;
        assembler.assemble()
    }

    /// Collect a directory tree and whatever its release definition names
    fn assemble_tree(
        &self,
        source: &SourceDescriptor,
        root: &Path,
        revision: Option<String>,
        cancel: &CancellationToken,
        resolution: &mut Resolution<'_>,
    ) -> Result<Bundle> {
        resolution.advance(ResolutionState::Collecting);

        let options = CollectOptions {
            policy: self.config.path_policy,
            ignore_file: Some(&self.config.ignore_file),
        };
        let resources = collect_dir(root, &options)?;
        let release = self.read_release(root)?;
        let chart_source = release.as_ref().and_then(ReleaseDefinition::chart_source);

        let mut assembler = BundleAssembler::new(bundle_name(source, release.as_ref()), source)
            .with_revision(revision)
            .with_release(release);
        assembler.add_resources(resources);

        if let Some(chart_source) = chart_source {
            cancel.check()?;
            let chart = self.fetch_release_chart(&chart_source, source.credential.as_ref())?;
            let chart_dir = validate_relative_path(&chart.name)?;
            let prefix = format!("{CHART_DIR}/{chart_dir}/");
            assembler.add_resources(collect_entries(chart.files, &prefix)?);
        }

        cancel.check()?;
        assembler.assemble()
    }

    fn read_release(&self, root: &Path) -> Result<Option<ReleaseDefinition>> {
        let file_name = &self.config.release_definition_file;
        let path = root.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| ResolveError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        ReleaseDefinition::from_yaml(&content, file_name).map(Some)
    }

    /// Fetch the chart a release definition points at
    ///
    /// The scope is matched against the chart repository URL, not the URL of
    /// the source that carried the release definition. Only a basic auth
    /// credential is passed on; an SSH key meant for a git source is not.
    fn fetch_release_chart(
        &self,
        chart_source: &ChartSource,
        credential: Option<&Credential>,
    ) -> Result<FetchedChart> {
        let credential = credential.filter(|c| matches!(c, Credential::Basic { .. }));
        let timeout = self.config.timeout();
        let max_bytes = self.config.max_archive_bytes;

        match chart_source {
            ChartSource::Repository {
                repo,
                chart,
                version,
            } => {
                debug!(repo = %repo, chart = %chart, "fetching chart from release definition");
                let credential = effective_credential(credential, self.scope.as_ref(), repo);
                HelmRepository::new(repo, credential, timeout, max_bytes)?
                    .fetch_chart(chart, version.as_deref())
            }
            ChartSource::Archive { url } => {
                debug!(url = %url, "fetching chart archive from release definition");
                let credential = effective_credential(credential, self.scope.as_ref(), url);
                fetch_chart_archive(url, credential, timeout, max_bytes)
            }
        }
    }
}

fn collection_root(root: &Path, sub_path: Option<&str>) -> Result<PathBuf> {
    match sub_path {
        Some(sub_path) => resolve_sub_path(root, sub_path),
        None => Ok(root.to_path_buf()),
    }
}

/// Keep only the chart files below `sub_path`, relative to it
fn restrict_to_sub_path(
    files: Vec<(String, Vec<u8>)>,
    sub_path: &str,
) -> Result<Vec<(String, Vec<u8>)>> {
    let sub_path = validate_relative_path(sub_path)?;
    let prefix = format!("{sub_path}/");
    let restricted: Vec<_> = files
        .into_iter()
        .filter_map(|(path, content)| {
            path.strip_prefix(&prefix)
                .map(|rest| (rest.to_string(), content))
        })
        .collect();

    if restricted.is_empty() {
        return Err(ResolveError::SubPathNotFound { path: sub_path });
    }
    Ok(restricted)
}
