//! MCD Changelog - an index of MakerDAO MCD releases
//!
//! Scrapes the changelog index page for per-network release links, fetches
//! each release's `contracts.json` and ABI archive, and keeps the result as a
//! versioned index that can be queried offline.
//!
//! ## Pipeline
//!
//! ```text
//! page -> scanner (per network) -> builder (per link) -> link parser
//!      -> contracts.json -> ABI archive -> ReleaseCollection -> releases.json
//! ```
//!
//! Fetches run strictly one after another in discovery order.

pub mod abi;
pub mod archive;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod link;
pub mod network;
pub mod release;
pub mod scanner;
pub mod store;
pub mod version;

pub use config::Config;
pub use error::ChangelogError;
pub use network::Network;
pub use release::{ContractsManifest, Release, ReleaseCollection};
pub use version::ReleaseVersion;

use crate::abi::AbiError;
use crate::builder::ReleaseBuilder;
use crate::link::SubstringMatcher;
use serde::Serialize;
use tracing::{info, instrument};

/// Result of a [`query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Latest release for the requested network
    pub release: Release,
    /// The requested ABI file, if one was asked for
    pub abi: Option<AbiFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiFile {
    pub name: String,
    pub contents: String,
}

/// Scans the changelog, fetches every release and persists the index.
///
/// The index on disk is only replaced when the whole scan succeeds.
///
/// ## Errors
///
/// Any page, validation, fetch, archive or store error. Nothing is persisted
/// in that case.
#[instrument(skip_all, fields(url = %config.base_url))]
pub async fn refresh(config: &Config) -> Result<ReleaseCollection, ChangelogError> {
    let client = config.client();
    let abi_root = config.abi_root();

    let page = client.fetch_page().await?;
    let builder = ReleaseBuilder::new(&client, &abi_root);
    let releases = scanner::scan(&page, &builder, &SubstringMatcher).await?;

    let index = config.index_path();
    store::save(&releases, &index)?;
    info!(releases = releases.len(), index = %index.display(), "Refresh complete");

    Ok(releases)
}

/// Loads the persisted index.
pub fn load_releases(config: &Config) -> Result<ReleaseCollection, ChangelogError> {
    Ok(store::load(&config.index_path())?)
}

/// Looks up the latest release for `network`, and optionally one of its ABI
/// files, from the persisted index.
///
/// ## Errors
///
/// - `ChangelogError::Store` if no index has been saved yet
/// - `ChangelogError::Query` for unknown networks or networks with no releases
/// - `ChangelogError::Abi` if `abi_name` is given but cannot be found
pub fn query(
    config: &Config,
    network: &str,
    abi_name: Option<&str>,
) -> Result<QueryResult, ChangelogError> {
    let releases = load_releases(config)?;
    let release = releases.latest_for_network(network)?.clone();

    let abi = match abi_name {
        Some(name) => {
            let bundle = release
                .abi_bundle()
                .ok_or_else(|| AbiError::NoBundle(release.to_string()))?;
            Some(AbiFile {
                name: name.to_string(),
                contents: abi::lookup(bundle, name)?,
            })
        }
        None => None,
    };

    Ok(QueryResult { release, abi })
}
