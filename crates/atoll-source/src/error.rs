//! Error types for server-list loading.

use atoll_ring::RingError;
use atoll_types::AddrError;

/// Errors that can occur while loading a server list.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading the server-list file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A non-comment line did not parse as `"<address>\t<weight>"`.
    #[error("malformed server definition at line {line}: {content:?}")]
    MalformedServer {
        /// 1-based line number within the source.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// A server address did not resolve.
    #[error("address error: {0}")]
    Addr(#[from] AddrError),

    /// Building the continuum from the parsed entries failed.
    #[error("ring error: {0}")]
    Ring(#[from] RingError),
}
