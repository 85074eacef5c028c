//! HTTP access to the changelog site.
//!
//! Every artifact URL is derived from the base URL by plain concatenation so
//! it matches the site's layout byte for byte:
//!
//! - `<base>/releases/<network>/<version>/contracts.json`
//! - `<base>/releases/<network>/<version>/abi/<network>_abi_<version>.zip`

use crate::network::Network;
use crate::release::ContractsManifest;
use crate::version::ReleaseVersion;
use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Default changelog location.
pub const DEFAULT_BASE_URL: &str = "https://changelog.makerdao.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "mcd-changelog";

/// Errors from talking to the changelog site.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, timeout or body read failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status the caller cannot accept
    #[error("GET {url} returned {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    /// `contracts.json` was not a flat string-to-string object
    #[error("Failed to parse contracts manifest from {url}: {source}")]
    ManifestParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client for the changelog site rooted at a base URL.
#[derive(Debug, Clone)]
pub struct ChangelogClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl ChangelogClient {
    /// Creates a client for `base_url`. A trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: HttpClient::new(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the release's `contracts.json`.
    ///
    /// ## Examples
    ///
    /// ```
    /// use mcd_changelog_lib::client::ChangelogClient;
    /// use mcd_changelog_lib::network::Network;
    /// use mcd_changelog_lib::version::ReleaseVersion;
    ///
    /// let client = ChangelogClient::new("https://changelog.makerdao.com/");
    /// let version = ReleaseVersion::parse("1.0.4").unwrap();
    /// assert_eq!(
    ///     client.contracts_url(Network::Mainnet, &version),
    ///     "https://changelog.makerdao.com/releases/mainnet/1.0.4/contracts.json"
    /// );
    /// ```
    pub fn contracts_url(&self, network: Network, version: &ReleaseVersion) -> String {
        format!(
            "{}/releases/{}/{}/contracts.json",
            self.base_url, network, version
        )
    }

    /// URL of the release's ABI archive.
    pub fn abi_archive_url(&self, network: Network, version: &ReleaseVersion) -> String {
        format!(
            "{base}/releases/{network}/{version}/abi/{network}_abi_{version}.zip",
            base = self.base_url
        )
    }

    /// Fetches the changelog index page.
    ///
    /// ## Errors
    ///
    /// - `FetchError::Http` on transport failure
    /// - `FetchError::UnexpectedStatus` for anything but `200 OK`
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn fetch_page(&self) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/", self.base_url);
        let (status, body) = self.get(&url).await?;
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus { url, status });
        }
        Ok(body)
    }

    /// Fetches and parses the release's `contracts.json`.
    ///
    /// ## Errors
    ///
    /// - `FetchError::Http` on transport failure
    /// - `FetchError::UnexpectedStatus` for anything but `200 OK`
    /// - `FetchError::ManifestParse` if the body is not a string map
    pub async fn fetch_contracts(
        &self,
        network: Network,
        version: &ReleaseVersion,
    ) -> Result<ContractsManifest, FetchError> {
        let url = self.contracts_url(network, version);
        let (status, body) = self.get(&url).await?;
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus { url, status });
        }
        serde_json::from_slice(&body).map_err(|source| FetchError::ManifestParse { url, source })
    }

    /// Fetches the release's ABI archive.
    ///
    /// Returns `Ok(None)` when the server answers `404 Not Found`: older
    /// releases were published without ABIs.
    ///
    /// ## Errors
    ///
    /// - `FetchError::Http` on transport failure
    /// - `FetchError::UnexpectedStatus` for any status other than 200 or 404
    pub async fn fetch_abi_archive(
        &self,
        network: Network,
        version: &ReleaseVersion,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.abi_archive_url(network, version);
        let (status, body) = self.get(&url).await?;
        match status {
            StatusCode::OK => Ok(Some(body)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(FetchError::UnexpectedStatus { url, status }),
        }
    }

    async fn get(&self, url: &str) -> Result<(StatusCode, Vec<u8>), FetchError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(url, status = status.as_u16(), bytes = body.len(), "Response received");
        Ok((status, body))
    }
}
