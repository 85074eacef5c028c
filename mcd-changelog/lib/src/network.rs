//! The closed set of networks the changelog publishes releases for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a string does not name a recognized network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown network '{0}'")]
pub struct UnknownNetwork(pub String);

/// A chain the changelog publishes releases for.
///
/// The variant order is the order in which the scanner visits networks, and
/// therefore the network-major order of a [`ReleaseCollection`](crate::release::ReleaseCollection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Kovan,
    Rinkeby,
    Ropsten,
    Goerli,
}

impl Network {
    /// Every recognized network, in scan order.
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Kovan,
        Network::Rinkeby,
        Network::Ropsten,
        Network::Goerli,
    ];

    /// The identifier used in changelog paths (e.g. `mainnet`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Kovan => "kovan",
            Network::Rinkeby => "rinkeby",
            Network::Ropsten => "ropsten",
            Network::Goerli => "goerli",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    /// Matching is exact: `Mainnet` or ` mainnet` are not recognized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}
