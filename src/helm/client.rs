//! HTTP client for chart repositories
//!
//! Every request (index and archive) carries the same basic auth header when
//! a credential is attached. Failures are never retried.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::{debug, info};
use url::Url;

use super::archive::extract_chart;
use super::index::{ChartVersion, IndexFile};
use crate::error::{ResolveError, Result};
use crate::source::Credential;

const INDEX_FILE: &str = "index.yaml";

/// Files of one fetched chart
#[derive(Debug, Clone)]
pub struct FetchedChart {
    pub name: String,
    pub version: Option<String>,
    /// `(path, content)` pairs relative to the chart root
    pub files: Vec<(String, Vec<u8>)>,
}

/// A chart repository reachable over HTTP(S)
pub struct HelmRepository {
    base_url: Url,
    client: Client,
    basic_auth: Option<(String, String)>,
    timeout: Duration,
    max_archive_bytes: u64,
}

impl fmt::Debug for HelmRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelmRepository")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.basic_auth.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HelmRepository {
    /// Create a client for the repository at `base_url`
    ///
    /// Only basic auth applies to chart repositories; an SSH key credential
    /// is rejected before any request is made.
    pub fn new(
        base_url: &str,
        credential: Option<&Credential>,
        timeout: Duration,
        max_archive_bytes: u64,
    ) -> Result<Self> {
        let basic_auth = match credential {
            None => None,
            Some(Credential::Basic { username, password }) => {
                Some((username.clone(), password.clone()))
            }
            Some(other) => {
                return Err(ResolveError::CredentialMismatch {
                    url: base_url.to_string(),
                    expected: "basic".to_string(),
                    found: other.kind().to_string(),
                });
            }
        };

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bundle-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolveError::ConfigInvalid {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
            basic_auth,
            timeout,
            max_archive_bytes,
        })
    }

    /// Base URL, always with a trailing slash
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Location of the repository index
    pub fn index_url(&self) -> Result<Url> {
        self.join(INDEX_FILE)
    }

    /// Fetch and parse `index.yaml`
    pub fn fetch_index(&self) -> Result<IndexFile> {
        let url = self.index_url()?;
        let body = self
            .get(&url)?
            .text()
            .map_err(|e| self.transport_error(&url, &e))?;
        IndexFile::from_yaml(&body, url.as_str())
    }

    /// Fetch a chart through the index and extract its files
    pub fn fetch_chart(&self, chart: &str, version: Option<&str>) -> Result<FetchedChart> {
        let index = self.fetch_index()?;
        let entry = index
            .find(chart, version)
            .ok_or_else(|| ResolveError::ChartNotFound {
                chart: chart.to_string(),
                version: version.unwrap_or("latest").to_string(),
                url: self.base_url.to_string(),
            })?;

        let files = self.download_chart(entry)?;
        info!(
            chart,
            version = %entry.version,
            files = files.len(),
            "chart fetched"
        );

        Ok(FetchedChart {
            name: chart.to_string(),
            version: Some(entry.version.clone()),
            files,
        })
    }

    /// Download and extract the archive of an index entry
    ///
    /// The first URL of the entry is used, resolved against the base URL.
    /// When the index publishes a digest, the archive must match it.
    pub fn download_chart(&self, entry: &ChartVersion) -> Result<Vec<(String, Vec<u8>)>> {
        let location = entry
            .urls
            .first()
            .ok_or_else(|| ResolveError::ChartNotFound {
                chart: entry.name.clone(),
                version: entry.version.clone(),
                url: self.base_url.to_string(),
            })?;
        let url = self.join(location)?;
        let bytes = self.fetch_bytes(&url)?;
        entry.verify_digest(&bytes, url.as_str())?;
        extract_chart(&bytes, url.as_str(), self.max_archive_bytes)
    }

    /// Download and extract an archive from an absolute URL
    pub fn download(&self, url: &Url) -> Result<Vec<(String, Vec<u8>)>> {
        let bytes = self.fetch_bytes(url)?;
        extract_chart(&bytes, url.as_str(), self.max_archive_bytes)
    }

    fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        self.get(url)?
            .bytes()
            .map(Vec::from)
            .map_err(|e| self.transport_error(url, &e))
    }

    fn join(&self, location: &str) -> Result<Url> {
        self.base_url
            .join(location)
            .map_err(|e| ResolveError::UnsupportedLocation {
                location: format!("{location}: {e}"),
            })
    }

    fn transport_error(&self, url: &Url, err: &reqwest::Error) -> ResolveError {
        if err.is_timeout() {
            ResolveError::TransportTimeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ResolveError::SourceUnreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// GET with auth; any non-success status is an upstream error
    fn get(&self, url: &Url) -> Result<Response> {
        debug!(url = %url, authenticated = self.basic_auth.is_some(), "GET");

        let mut request = self.client.get(url.clone());
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .map_err(|e| self.transport_error(url, &e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .bytes()
            .map_err(|e| self.transport_error(url, &e))?;
        Err(ResolveError::UpstreamTransport {
            url: url.to_string(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Fetch a chart from a direct archive URL, without an index
pub fn fetch_chart_archive(
    archive_url: &str,
    credential: Option<&Credential>,
    timeout: Duration,
    max_archive_bytes: u64,
) -> Result<FetchedChart> {
    let url = Url::parse(archive_url).map_err(|_| ResolveError::UnsupportedLocation {
        location: archive_url.to_string(),
    })?;
    let base = url
        .join(".")
        .map_err(|_| ResolveError::UnsupportedLocation {
            location: archive_url.to_string(),
        })?;
    let repository = HelmRepository::new(base.as_str(), credential, timeout, max_archive_bytes)?;
    let files = repository.download(&url)?;

    Ok(FetchedChart {
        name: chart_name_from_archive(&url),
        version: None,
        files,
    })
}

/// `https://host/charts/config-chart-0.1.0.tgz` → `config-chart-0.1.0`
fn chart_name_from_archive(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|file| {
            file.trim_end_matches(".tgz")
                .trim_end_matches(".tar.gz")
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "chart".to_string())
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let with_slash = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let url = Url::parse(&with_slash).map_err(|_| ResolveError::UnsupportedLocation {
        location: base_url.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ResolveError::UnsupportedLocation {
            location: base_url.to_string(),
        }),
    }
}
