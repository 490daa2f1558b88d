//! Repository snapshots
//!
//! This module handles:
//! - Cloning a repository into an exclusively owned temp directory
//! - Bounding the transfer by a deadline and a cancellation token
//! - Applying libgit2's connect and read timeouts
//! - Checking out the requested revision

use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};

use git2::{FetchOptions, RemoteCallbacks, build::RepoBuilder};
use tempfile::TempDir;
use tracing::{debug, info};

use super::auth::{AuthOutcome, check_credential, setup_auth_callbacks};
use super::checkout::{checkout_commit, resolve_ref};
use super::error::interpret_clone_error;
use super::url::{Transport, normalize_for_clone};
use crate::cancel::{CancellationExt, CancellationToken};
use crate::error::{ResolveError, Result};
use crate::source::Credential;
use crate::temp;

/// What to clone and how
#[derive(Debug, Clone, Copy)]
pub struct CloneRequest<'a> {
    /// Repository URL as supplied by the caller
    pub url: &'a str,
    /// Branch, tag or SHA to check out; remote HEAD when absent
    pub revision: Option<&'a str>,
    /// Effective credential after scope matching
    pub credential: Option<&'a Credential>,
    /// Upper bound for the whole transfer
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
}

/// A checked-out repository owned by one resolution
///
/// The working directory is deleted when the snapshot is dropped.
#[derive(Debug)]
pub struct GitSnapshot {
    dir: TempDir,
    sha: String,
}

impl GitSnapshot {
    /// Repository root
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Full SHA of the checked-out commit
    pub fn sha(&self) -> &str {
        &self.sha
    }
}

/// Apply `timeout` to libgit2's socket connect and read operations
///
/// Progress callbacks only run while data arrives, so a server that accepts
/// the connection and then stays silent is bounded by these timeouts alone.
/// The setting is process-wide: it applies to every clone in the process,
/// and the most recent call wins.
pub fn set_server_timeouts(timeout: Duration) -> Result<()> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    let failed = |e: git2::Error| ResolveError::ConfigInvalid {
        message: format!("cannot apply git timeout: {}", e.message()),
    };

    // SAFETY: both options only store an integer in libgit2's global
    // settings, read when a socket is opened or polled.
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis).map_err(failed)?;
        git2::opts::set_server_timeout_in_milliseconds(millis).map_err(failed)?;
    }

    debug!(timeout_ms = millis, "git server timeouts applied");
    Ok(())
}

/// Aborts a transfer once the deadline passes or the caller cancels
struct TransferGuard<'a> {
    deadline: Instant,
    cancel: &'a CancellationToken,
    timed_out: Cell<bool>,
}

impl TransferGuard<'_> {
    /// Returns false when the transfer must stop
    fn keep_going(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if Instant::now() >= self.deadline {
            self.timed_out.set(true);
            return false;
        }
        true
    }
}

/// Clone `request.url` into a fresh snapshot directory and check out the
/// requested revision
pub fn fetch_snapshot(request: &CloneRequest<'_>) -> Result<GitSnapshot> {
    let transport = Transport::detect(request.url)?;
    let credential = check_credential(transport, request.credential, request.url)?;
    request.cancel.check()?;

    let dir = temp::snapshot_dir()?;
    let outcome = AuthOutcome::default();
    let guard = TransferGuard {
        deadline: Instant::now() + request.timeout,
        cancel: request.cancel,
        timed_out: Cell::new(false),
    };

    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks, credential, &outcome);
    callbacks.transfer_progress(|_progress| guard.keep_going());
    callbacks.sideband_progress(|_data| guard.keep_going());

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    // Shallow clones are only possible for remote transports, and only when
    // the remote HEAD is wanted; other revisions need the full history
    if request.revision.is_none() && transport != Transport::Local {
        fetch_options.depth(1);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    debug!(
        url = request.url,
        transport = ?transport,
        authenticated = credential.is_some(),
        "cloning repository"
    );

    let repo = builder
        .clone(&normalize_for_clone(request.url), dir.path())
        .map_err(|e| {
            if request.cancel.is_cancelled() {
                ResolveError::Cancelled
            } else if guard.timed_out.get() {
                ResolveError::TransportTimeout {
                    url: request.url.to_string(),
                    timeout_secs: request.timeout.as_secs(),
                }
            } else {
                interpret_clone_error(&e, &outcome, request.url, request.timeout)
            }
        })?;

    let sha = resolve_ref(&repo, request.revision)?;
    checkout_commit(&repo, &sha)?;
    drop(repo);

    info!(url = request.url, sha = %sha, "repository snapshot ready");

    Ok(GitSnapshot { dir, sha })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HostKeyPolicy;
    use git2::Repository;

    fn init_source_repo(files: &[(&str, &str)]) -> (TempDir, String) {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test user", "test@test.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "test commit", &tree, &[])
            .unwrap();
        let url = format!("file://{}", temp.path().display());
        (temp, url)
    }

    fn request<'a>(url: &'a str, cancel: &'a CancellationToken) -> CloneRequest<'a> {
        CloneRequest {
            url,
            revision: None,
            credential: None,
            timeout: Duration::from_secs(30),
            cancel,
        }
    }

    #[test]
    fn test_set_server_timeouts_accepts_large_values() {
        assert!(set_server_timeouts(Duration::from_secs(60)).is_ok());
        assert!(set_server_timeouts(Duration::from_secs(u64::from(u32::MAX))).is_ok());
    }

    #[test]
    fn test_fetch_snapshot_local_repo() {
        let (_source, url) = init_source_repo(&[("svc.yaml", "kind: Service\n")]);
        let cancel = CancellationToken::new();

        let snapshot = fetch_snapshot(&request(&url, &cancel)).unwrap();
        assert_eq!(snapshot.sha().len(), 40);
        assert_eq!(
            std::fs::read_to_string(snapshot.root().join("svc.yaml")).unwrap(),
            "kind: Service\n"
        );
    }

    #[test]
    fn test_snapshot_dir_removed_on_drop() {
        let (_source, url) = init_source_repo(&[("svc.yaml", "kind: Service\n")]);
        let cancel = CancellationToken::new();

        let snapshot = fetch_snapshot(&request(&url, &cancel)).unwrap();
        let root = snapshot.root().to_path_buf();
        assert!(root.exists());
        drop(snapshot);
        assert!(!root.exists());
    }

    #[test]
    fn test_fetch_snapshot_unknown_revision() {
        let (_source, url) = init_source_repo(&[("svc.yaml", "kind: Service\n")]);
        let cancel = CancellationToken::new();
        let mut req = request(&url, &cancel);
        req.revision = Some("does-not-exist");

        let result = fetch_snapshot(&req);
        assert!(matches!(result, Err(ResolveError::GitRefResolveFailed { .. })));
    }

    #[test]
    fn test_cancelled_before_clone() {
        let (_source, url) = init_source_repo(&[("svc.yaml", "kind: Service\n")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_snapshot(&request(&url, &cancel));
        assert!(matches!(result, Err(ResolveError::Cancelled)));
    }

    #[test]
    fn test_ssh_without_credential_fails_before_network() {
        let cancel = CancellationToken::new();
        // Port 1 is never contacted: the missing credential is detected first
        let result = fetch_snapshot(&request("ssh://git@127.0.0.1:1/test/test-repo", &cancel));
        assert!(matches!(
            result,
            Err(ResolveError::AuthenticationRequired { .. })
        ));
    }

    #[test]
    fn test_credential_mismatch_fails_before_network() {
        let cancel = CancellationToken::new();
        let credential =
            Credential::ssh_key("git", "not-a-key", HostKeyPolicy::InsecureAcceptAny);
        let mut req = request("https://127.0.0.1:1/test/test-repo", &cancel);
        req.credential = Some(&credential);

        let result = fetch_snapshot(&req);
        assert!(matches!(result, Err(ResolveError::CredentialMismatch { .. })));
    }

    #[test]
    fn test_unreachable_host() {
        let cancel = CancellationToken::new();
        let result = fetch_snapshot(&request("http://127.0.0.1:1/test/test-repo", &cancel));
        assert!(matches!(
            result,
            Err(ResolveError::SourceUnreachable { .. })
        ));
    }
}
