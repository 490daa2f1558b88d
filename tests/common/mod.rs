//! Common test utilities for bundle resolver integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use git2::{IndexAddOption, Repository, Signature};
use httpmock::prelude::*;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const HELM_USER: &str = "user";
pub const HELM_PASS: &str = "pass";
/// `Authorization` header for `user:pass`
pub const HELM_AUTH_HEADER: &str = "Basic dXNlcjpwYXNz";
pub const CHART_NAME: &str = "config-chart";
pub const CHART_VERSION: &str = "0.1.0";

/// Number of files in the test chart
pub const CHART_FILE_COUNT: usize = 9;

/// Path of a fixture under `tests/common/fixtures`
pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("common")
        .join("fixtures")
        .join(relative)
}

/// Route `tracing` output through the test harness; `RUST_LOG` filters it
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A scratch directory for a test
pub struct TestDir {
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestDir {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file, creating parent directories
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Copy a fixture directory into this directory
    pub fn copy_fixture(&self, fixture: &str, target: &str) -> PathBuf {
        let target_path = self.path.join(target);
        copy_dir_recursive(&fixture_path(fixture), &target_path)
            .expect("Failed to copy fixture");
        target_path
    }
}

/// Copy a directory recursively
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// A git repository built from fixture content, reachable over `file://`
pub struct TestRepo {
    pub dir: TestDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a repository whose first commit holds the fixture's files
    pub fn from_fixture(fixture: &str) -> Self {
        let dir = TestDir::new();
        copy_dir_recursive(&fixture_path(fixture), &dir.path).expect("Failed to copy fixture");
        let repo = Repository::init(&dir.path).expect("Failed to init repository");
        let test_repo = Self { dir, repo };
        test_repo.commit_all("initial commit");
        test_repo
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.dir.path.display())
    }

    pub fn write_file(&self, path: &str, content: &str) {
        self.dir.write_file(path, content);
    }

    /// Stage everything and commit; returns the commit SHA
    pub fn commit_all(&self, message: &str) -> String {
        let mut index = self.repo.index().expect("Failed to open index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("Failed to stage files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = Signature::now("Test user", "test@test.com").expect("Failed to sign");

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to commit")
            .to_string()
    }

    pub fn tag(&self, name: &str) {
        let head = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .expect("Failed to resolve HEAD");
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .expect("Failed to tag");
    }
}

/// Build a chart archive from `fixtures/helmrepository/testrepo`, with every
/// file under a leading `config-chart/` directory
pub fn chart_archive() -> Vec<u8> {
    let root = fixture_path("helmrepository/testrepo");
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.expect("Failed to walk chart fixture");
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&root)
            .expect("Failed to relativize chart path");
        builder
            .append_path_with_name(entry.path(), Path::new(CHART_NAME).join(relative))
            .expect("Failed to append chart file");
    }

    builder
        .into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip")
}

/// Chart fixture files as `(path, content)`, relative to the chart root
pub fn chart_files() -> Vec<(String, String)> {
    let root = fixture_path("helmrepository/testrepo");
    WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(&root)
                .expect("Failed to relativize chart path")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let content = std::fs::read_to_string(entry.path()).expect("Failed to read chart");
            (relative, content)
        })
        .collect()
}

/// Hex SHA-256 of `archive`, as chart repositories publish it
pub fn sha256_hex(archive: &[u8]) -> String {
    hex::encode(Sha256::digest(archive))
}

fn index_yaml(digest: &str) -> String {
    format!(
        "apiVersion: v1\n\
         entries:\n  \
           {CHART_NAME}:\n    \
             - name: {CHART_NAME}\n      \
               version: {CHART_VERSION}\n      \
               digest: {digest}\n      \
               urls:\n        \
                 - {CHART_NAME}-{CHART_VERSION}.tgz\n"
    )
}

fn has_no_authorization(req: &HttpMockRequest) -> bool {
    !req.headers.as_ref().is_some_and(|headers| {
        headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
    })
}

/// A chart repository served by `httpmock`
pub struct HelmRepoServer {
    pub server: MockServer,
    auth: bool,
}

impl HelmRepoServer {
    /// Serve `index.yaml` and the chart archive, optionally behind basic auth
    ///
    /// With auth enabled, requests without an `Authorization` header get
    /// `401 Unauthorised.`.
    pub fn start(auth: bool) -> Self {
        let archive = chart_archive();
        Self::start_with_digest(auth, &sha256_hex(&archive), archive)
    }

    /// Like [`HelmRepoServer::start`], but the index publishes `digest`
    /// for `archive`
    pub fn start_with_digest(auth: bool, digest: &str, archive: Vec<u8>) -> Self {
        let server = MockServer::start();
        let repo = Self { server, auth };
        repo.serve("/index.yaml", index_yaml(digest).into_bytes());
        repo.serve(&format!("/{CHART_NAME}-{CHART_VERSION}.tgz"), archive);
        repo
    }

    fn serve(&self, path: &str, body: Vec<u8>) {
        if self.auth {
            self.server.mock(|when, then| {
                when.method(GET)
                    .path(path)
                    .header("Authorization", HELM_AUTH_HEADER);
                then.status(200).body(body);
            });
            self.server.mock(|when, then| {
                when.method(GET).path(path).matches(has_no_authorization);
                then.status(401).body("Unauthorised.");
            });
        } else {
            self.server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            });
        }
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:41234`
    pub fn base_url(&self) -> String {
        self.server.base_url()
    }

    pub fn index_url(&self) -> String {
        self.server.url("/index.yaml")
    }
}

/// Directory with a `fleet.yaml` pointing at `repo_url`
pub fn helm_release_dir(repo_url: &str) -> TestDir {
    let dir = TestDir::new();
    dir.write_file(
        "assets/helm/fleet.yaml",
        &format!(
            "defaultNamespace: helm-test\nhelm:\n  chart: {CHART_NAME}\n  repo: {repo_url}\n  version: {CHART_VERSION}\n"
        ),
    );
    dir
}
