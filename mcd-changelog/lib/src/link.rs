//! Parsing release hyperlinks harvested from the changelog page.
//!
//! Release links on the page look like `/releases/<network>/<version>/` or
//! `/releases/<network>/<version>/contracts.json`. Both split on `/` into
//! exactly [`EXPECTED_SEGMENTS`] pieces.

use crate::network::Network;
use crate::version::ReleaseVersion;
use thiserror::Error;

/// Number of `/`-separated segments in a release link.
pub const EXPECTED_SEGMENTS: usize = 5;

/// Literal path segment that introduces every release link.
pub const RELEASES_SEGMENT: &str = "releases";

/// Reasons a hyperlink is rejected as a release link.
///
/// Rules are checked in declaration order and the first failure is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Link '{link}' has {found} path segments, expected {expected}", expected = EXPECTED_SEGMENTS)]
    SegmentCount { link: String, found: usize },

    #[error("Link '{0}' does not start with '/'")]
    MissingLeadingSlash(String),

    #[error("Link '{0}' is not under /{releases}/", releases = RELEASES_SEGMENT)]
    NotReleasesPath(String),

    #[error("Link '{link}' names unknown network '{network}'")]
    UnknownNetwork { link: String, network: String },

    #[error("Link '{link}' has malformed version '{version}', expected x.y.z")]
    MalformedVersion { link: String, version: String },
}

/// A validated release link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLink {
    pub network: Network,
    pub version: ReleaseVersion,
}

/// Parses a raw hyperlink target into its network and version.
///
/// ## Errors
///
/// Returns the [`LinkError`] for the first validation rule the link breaks.
///
/// ## Examples
///
/// ```
/// use mcd_changelog_lib::link::parse_release_link;
/// use mcd_changelog_lib::network::Network;
///
/// let link = parse_release_link("/releases/mainnet/1.0.4/contracts.json").unwrap();
/// assert_eq!(link.network, Network::Mainnet);
/// assert_eq!(link.version.as_str(), "1.0.4");
/// ```
pub fn parse_release_link(raw: &str) -> Result<ReleaseLink, LinkError> {
    let segments: Vec<&str> = raw.split('/').collect();

    if segments.len() != EXPECTED_SEGMENTS {
        return Err(LinkError::SegmentCount {
            link: raw.to_string(),
            found: segments.len(),
        });
    }
    if !segments[0].is_empty() {
        return Err(LinkError::MissingLeadingSlash(raw.to_string()));
    }
    if segments[1] != RELEASES_SEGMENT {
        return Err(LinkError::NotReleasesPath(raw.to_string()));
    }

    let network = segments[2]
        .parse::<Network>()
        .map_err(|_| LinkError::UnknownNetwork {
            link: raw.to_string(),
            network: segments[2].to_string(),
        })?;

    let version =
        ReleaseVersion::parse(segments[3]).map_err(|_| LinkError::MalformedVersion {
            link: raw.to_string(),
            version: segments[3].to_string(),
        })?;

    Ok(ReleaseLink { network, version })
}

/// Decides which hyperlinks on the page belong to a network's release set.
///
/// The scanner only uses this to group links into per-network batches; every
/// link in a batch is still validated by [`parse_release_link`].
pub trait LinkMatcher {
    /// Whether `link` is a release link at all.
    fn is_release_link(&self, link: &str) -> bool;

    /// Whether `link` belongs to `network`'s batch.
    fn belongs_to(&self, link: &str, network: Network) -> bool;
}

/// Groups links by substring containment.
///
/// Tolerates markup it does not understand, at the cost of false positives:
/// a link whose path mentions two network names is claimed by both.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl LinkMatcher for SubstringMatcher {
    fn is_release_link(&self, link: &str) -> bool {
        link.contains(RELEASES_SEGMENT)
    }

    fn belongs_to(&self, link: &str, network: Network) -> bool {
        link.contains(network.as_str())
    }
}
