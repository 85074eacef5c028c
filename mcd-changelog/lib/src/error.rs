use crate::abi::AbiError;
use crate::archive::ArchiveError;
use crate::client::FetchError;
use crate::link::LinkError;
use crate::release::QueryError;
use crate::store::StoreError;
use thiserror::Error;

/// Any failure of a refresh or query.
///
/// Nothing is retried: the first error aborts the operation. A missing ABI
/// archive is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// A release link on the page failed validation
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An ABI archive could not be verified or unpacked
    #[error("ABI archive for {release}: {source}")]
    Archive {
        release: String,
        #[source]
        source: ArchiveError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
