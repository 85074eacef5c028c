//! Scanning the changelog index page for release links.
//!
//! The page is treated as a bag of hyperlinks: every `href` that looks like a
//! release link is grouped by network through a [`LinkMatcher`], and each
//! network's batch is handed to the [`ReleaseBuilder`] in [`Network::ALL`]
//! order.

use crate::builder::ReleaseBuilder;
use crate::error::ChangelogError;
use crate::link::{LinkMatcher, RELEASES_SEGMENT, parse_release_link};
use crate::network::Network;
use crate::release::ReleaseCollection;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

/// Every `href` on `<a>` elements, in document order.
pub fn extract_hrefs(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Release links grouped into per-network batches.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkBatches {
    /// One entry per recognized network, in scan order
    pub by_network: Vec<(Network, Vec<String>)>,
    /// Release links no network claimed
    pub unclaimed: Vec<String>,
}

/// Splits hyperlinks into per-network batches using `matcher`.
///
/// Links that are not release links are dropped. A link claimed by more than
/// one network appears in each of those batches.
pub fn group_links<M: LinkMatcher + ?Sized>(hrefs: &[String], matcher: &M) -> LinkBatches {
    let release_links: Vec<&String> = hrefs
        .iter()
        .filter(|href| matcher.is_release_link(href))
        .collect();

    let by_network = Network::ALL
        .into_iter()
        .map(|network| {
            let batch = release_links
                .iter()
                .filter(|link| matcher.belongs_to(link, network))
                .map(|link| link.to_string())
                .collect();
            (network, batch)
        })
        .collect();

    let unclaimed = release_links
        .iter()
        .filter(|link| !Network::ALL.iter().any(|n| matcher.belongs_to(link, *n)))
        .map(|link| link.to_string())
        .collect();

    LinkBatches {
        by_network,
        unclaimed,
    }
}

/// Whether `link` is a site-relative path under `/releases/`.
fn is_release_path(link: &str) -> bool {
    link.split('/').take(2).eq(["", RELEASES_SEGMENT])
}

/// Scans `markup` and builds every release it links to into `releases`.
///
/// Unclaimed links shaped like `/releases/...` are validated before anything
/// is fetched, so a link to an unknown network fails the scan up front. Other
/// unclaimed links (e.g. a GitHub releases page) are ignored.
///
/// ## Errors
///
/// The first error from validation or from the [`ReleaseBuilder`]. Releases
/// recorded before the failure remain in `releases`.
#[instrument(skip_all, fields(bytes = markup.len()))]
pub async fn scan_into<M: LinkMatcher + ?Sized>(
    markup: &[u8],
    builder: &ReleaseBuilder<'_>,
    matcher: &M,
    releases: &mut ReleaseCollection,
) -> Result<(), ChangelogError> {
    let markup = String::from_utf8_lossy(markup);
    let hrefs = extract_hrefs(&markup);
    let batches = group_links(&hrefs, matcher);
    debug!(hrefs = hrefs.len(), unclaimed = batches.unclaimed.len(), "Grouped page links");

    for link in &batches.unclaimed {
        if is_release_path(link) {
            parse_release_link(link)?;
        } else {
            debug!(link, "Ignoring unclaimed link outside /releases/");
        }
    }

    for (network, links) in &batches.by_network {
        if links.is_empty() {
            continue;
        }
        info!(%network, links = links.len(), "Building releases");
        builder.build(links, releases).await?;
    }
    Ok(())
}

/// Scans `markup` into a fresh collection.
pub async fn scan<M: LinkMatcher + ?Sized>(
    markup: &[u8],
    builder: &ReleaseBuilder<'_>,
    matcher: &M,
) -> Result<ReleaseCollection, ChangelogError> {
    let mut releases = ReleaseCollection::new();
    scan_into(markup, builder, matcher, &mut releases).await?;
    Ok(releases)
}
