//! Release records and the ordered collection built by a scan.

use crate::network::Network;
use crate::version::ReleaseVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Contract name to deployed address, as published in `contracts.json`.
pub type ContractsManifest = BTreeMap<String, String>;

/// Errors from querying a [`ReleaseCollection`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("No releases recorded for network '{0}'")]
    NoReleases(Network),
}

/// One published release of the MCD deployment on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    network: Network,
    version: ReleaseVersion,
    contracts: Option<ContractsManifest>,
    abi_bundle: Option<PathBuf>,
}

impl Release {
    pub fn new(
        network: Network,
        version: ReleaseVersion,
        contracts: Option<ContractsManifest>,
        abi_bundle: Option<PathBuf>,
    ) -> Self {
        Self {
            network,
            version,
            contracts,
            abi_bundle,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// The release's `contracts.json`, if it was fetched.
    pub fn contracts(&self) -> Option<&ContractsManifest> {
        self.contracts.as_ref()
    }

    /// Directory the release's ABI archive was unpacked into.
    ///
    /// `None` when the changelog has no ABI archive for this release.
    pub fn abi_bundle(&self) -> Option<&Path> {
        self.abi_bundle.as_deref()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.version)
    }
}

/// Releases in discovery order.
///
/// A scan fills this network-major (all of one network's releases before the
/// next network's, in [`Network::ALL`] order) and, within a network, in the
/// order links appeared on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseCollection {
    releases: Vec<Release>,
}

impl ReleaseCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, release: Release) {
        self.releases.push(release);
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Release> {
        self.releases.iter()
    }

    /// Whether a release for `network` at `version` is already recorded.
    pub fn contains(&self, network: Network, version: &ReleaseVersion) -> bool {
        self.releases
            .iter()
            .any(|r| r.network == network && &r.version == version)
    }

    /// All releases for `network`, in collection order.
    ///
    /// ## Errors
    ///
    /// Returns [`QueryError::UnknownNetwork`] if `network` is not a recognized
    /// network name. An empty result is only possible for recognized networks.
    pub fn filter_by_network(&self, network: &str) -> Result<Vec<&Release>, QueryError> {
        let network = parse_network(network)?;
        Ok(self.for_network(network).collect())
    }

    /// The release with the highest version for `network`.
    ///
    /// Versions compare numerically per component, so `1.0.10` beats `1.0.4`.
    ///
    /// ## Errors
    ///
    /// - [`QueryError::UnknownNetwork`] if `network` is not recognized
    /// - [`QueryError::NoReleases`] if nothing is recorded for it
    pub fn latest_for_network(&self, network: &str) -> Result<&Release, QueryError> {
        let network = parse_network(network)?;
        self.for_network(network)
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or(QueryError::NoReleases(network))
    }

    fn for_network(&self, network: Network) -> impl Iterator<Item = &Release> {
        self.releases.iter().filter(move |r| r.network == network)
    }
}

fn parse_network(network: &str) -> Result<Network, QueryError> {
    network
        .parse()
        .map_err(|_| QueryError::UnknownNetwork(network.to_string()))
}

impl<'a> IntoIterator for &'a ReleaseCollection {
    type Item = &'a Release;
    type IntoIter = std::slice::Iter<'a, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.releases.iter()
    }
}

impl IntoIterator for ReleaseCollection {
    type Item = Release;
    type IntoIter = std::vec::IntoIter<Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.releases.into_iter()
    }
}

impl FromIterator<Release> for ReleaseCollection {
    fn from_iter<T: IntoIterator<Item = Release>>(iter: T) -> Self {
        Self {
            releases: iter.into_iter().collect(),
        }
    }
}
