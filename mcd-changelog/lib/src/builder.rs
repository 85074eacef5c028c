//! Turning a batch of release links into recorded releases.
//!
//! Each link is handled to completion before the next one starts: validate,
//! fetch `contracts.json`, fetch and unpack the ABI archive, record. The first
//! failure stops the batch; releases recorded before it stay in the
//! collection.

use crate::archive::{self, bundle_dir};
use crate::client::ChangelogClient;
use crate::error::ChangelogError;
use crate::link::{ReleaseLink, parse_release_link};
use crate::release::{Release, ReleaseCollection};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Builds releases against one changelog site, unpacking ABI bundles under
/// a fixed root directory.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseBuilder<'a> {
    client: &'a ChangelogClient,
    abi_root: &'a Path,
}

impl<'a> ReleaseBuilder<'a> {
    pub fn new(client: &'a ChangelogClient, abi_root: &'a Path) -> Self {
        Self { client, abi_root }
    }

    /// Validates and builds every link in `links`, appending to `releases`.
    ///
    /// A link naming a release that is already in `releases` is skipped
    /// without fetching anything.
    ///
    /// ## Errors
    ///
    /// - `ChangelogError::Link` if a link fails validation
    /// - `ChangelogError::Fetch` on transport failure or an unexpected status
    /// - `ChangelogError::Archive` if an ABI archive fails verification
    #[instrument(skip_all, fields(links = links.len()))]
    pub async fn build<S: AsRef<str>>(
        &self,
        links: &[S],
        releases: &mut ReleaseCollection,
    ) -> Result<(), ChangelogError> {
        for raw in links {
            let raw = raw.as_ref();
            let link = parse_release_link(raw)?;

            if releases.contains(link.network, &link.version) {
                debug!(link = raw, "Release already recorded, skipping");
                continue;
            }

            let release = self.build_release(link).await?;
            info!(release = %release, abi = release.abi_bundle().is_some(), "Recorded release");
            releases.push(release);
        }
        Ok(())
    }

    /// Fetches the artifacts for one validated link.
    pub async fn build_release(&self, link: ReleaseLink) -> Result<Release, ChangelogError> {
        let ReleaseLink { network, version } = link;

        let contracts = self.client.fetch_contracts(network, &version).await?;
        debug!(%network, %version, contracts = contracts.len(), "Fetched contracts manifest");

        let abi_bundle = match self.client.fetch_abi_archive(network, &version).await? {
            Some(bytes) => {
                let dest = bundle_dir(self.abi_root, network, &version);
                archive::unpack(&bytes, &dest).map_err(|source| ChangelogError::Archive {
                    release: format!("{network}/{version}"),
                    source,
                })?;
                Some(dest)
            }
            None => {
                warn!(%network, %version, "No ABI archive published for release");
                None
            }
        };

        Ok(Release::new(network, version, Some(contracts), abi_bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixtures::{corrupt, zip_bytes};
    use crate::network::Network;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_contracts(server: &MockServer, network: &str, version: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/releases/{network}/{version}/contracts.json")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"MCD_VAT": "0xvat-{version}"}}"#)),
            )
            .mount(server)
            .await;
    }

    async fn mount_abi(server: &MockServer, network: &str, version: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/releases/{network}/{version}/abi/{network}_abi_{version}.zip"
            )))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_build_records_releases_in_link_order() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        for version in ["1.0.4", "1.0.10"] {
            mount_contracts(&server, "mainnet", version).await;
            let zip = zip_bytes(&[("MCD_VAT.abi", version.as_bytes())]);
            mount_abi(&server, "mainnet", version, ResponseTemplate::new(200).set_body_bytes(zip))
                .await;
        }

        let client = ChangelogClient::new(server.uri());
        let builder = ReleaseBuilder::new(&client, temp.path());
        let mut releases = ReleaseCollection::new();
        builder
            .build(
                &[
                    "/releases/mainnet/1.0.4/contracts.json",
                    "/releases/mainnet/1.0.10/contracts.json",
                ],
                &mut releases,
            )
            .await
            .unwrap();

        let versions: Vec<&str> = releases.iter().map(|r| r.version().as_str()).collect();
        assert_eq!(versions, ["1.0.4", "1.0.10"]);

        let latest = releases.latest_for_network("mainnet").unwrap();
        assert_eq!(latest.contracts().unwrap()["MCD_VAT"], "0xvat-1.0.10");
        let bundle = latest.abi_bundle().unwrap();
        assert_eq!(bundle, temp.path().join("mainnet").join("1.0.10"));
        assert_eq!(fs::read_to_string(bundle.join("MCD_VAT.abi")).unwrap(), "1.0.10");
    }

    #[tokio::test]
    async fn test_missing_abi_archive_is_tolerated() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_contracts(&server, "kovan", "1.0.0").await;
        mount_abi(&server, "kovan", "1.0.0", ResponseTemplate::new(404)).await;
        mount_contracts(&server, "kovan", "1.0.1").await;
        mount_abi(
            &server,
            "kovan",
            "1.0.1",
            ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("A.abi", b"[]")])),
        )
        .await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        ReleaseBuilder::new(&client, temp.path())
            .build(
                &["/releases/kovan/1.0.0/", "/releases/kovan/1.0.1/"],
                &mut releases,
            )
            .await
            .unwrap();

        assert_eq!(releases.len(), 2);
        let first = releases.iter().next().unwrap();
        assert!(first.abi_bundle().is_none());
        assert!(first.contracts().is_some());
        assert!(!temp.path().join("kovan").join("1.0.0").exists());
    }

    #[tokio::test]
    async fn test_archive_server_error_aborts_batch() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_contracts(&server, "goerli", "1.0.0").await;
        mount_abi(&server, "goerli", "1.0.0", ResponseTemplate::new(404)).await;
        mount_contracts(&server, "goerli", "1.0.1").await;
        mount_abi(&server, "goerli", "1.0.1", ResponseTemplate::new(500)).await;
        mount_contracts(&server, "goerli", "1.0.2").await;
        mount_abi(&server, "goerli", "1.0.2", ResponseTemplate::new(404)).await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        let err = ReleaseBuilder::new(&client, temp.path())
            .build(
                &[
                    "/releases/goerli/1.0.0/",
                    "/releases/goerli/1.0.1/",
                    "/releases/goerli/1.0.2/",
                ],
                &mut releases,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ChangelogError::Fetch(_)));
        // The release before the failure stays, nothing after it is added.
        assert_eq!(releases.len(), 1);
        assert_eq!(releases.iter().next().unwrap().version().as_str(), "1.0.0");
    }

    #[tokio::test]
    async fn test_invalid_link_aborts_before_fetching() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        let err = ReleaseBuilder::new(&client, temp.path())
            .build(&["/releases/mainnet/v1.0.0/"], &mut releases)
            .await
            .unwrap_err();

        assert!(matches!(err, ChangelogError::Link(_)));
        assert!(releases.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_fatal() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_contracts(&server, "ropsten", "2.0.0").await;
        let zip = corrupt(zip_bytes(&[("V.abi", b"PAYLOAD-PAYLOAD")]), b"PAYLOAD-PAYLOAD");
        mount_abi(&server, "ropsten", "2.0.0", ResponseTemplate::new(200).set_body_bytes(zip))
            .await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        let err = ReleaseBuilder::new(&client, temp.path())
            .build(&["/releases/ropsten/2.0.0/"], &mut releases)
            .await
            .unwrap_err();

        match err {
            ChangelogError::Archive { release, .. } => assert_eq!(release, "ropsten/2.0.0"),
            other => panic!("expected archive error, got {other:?}"),
        }
        assert!(releases.is_empty());
        assert!(!temp.path().join("ropsten").join("2.0.0").exists());
    }

    #[tokio::test]
    async fn test_duplicate_links_fetch_once() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/releases/rinkeby/1.0.0/contracts.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        mount_abi(&server, "rinkeby", "1.0.0", ResponseTemplate::new(404)).await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        ReleaseBuilder::new(&client, temp.path())
            .build(
                &[
                    "/releases/rinkeby/1.0.0/",
                    "/releases/rinkeby/1.0.0/contracts.json",
                ],
                &mut releases,
            )
            .await
            .unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(
            releases.iter().next().unwrap().network(),
            Network::Rinkeby
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_logs_missing_archive() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_contracts(&server, "mainnet", "1.0.0").await;
        mount_abi(&server, "mainnet", "1.0.0", ResponseTemplate::new(404)).await;

        let client = ChangelogClient::new(server.uri());
        let mut releases = ReleaseCollection::new();
        ReleaseBuilder::new(&client, temp.path())
            .build(&["/releases/mainnet/1.0.0/"], &mut releases)
            .await
            .unwrap();

        assert!(logs_contain("No ABI archive published for release"));
        assert!(logs_contain("Recorded release"));
    }
}
