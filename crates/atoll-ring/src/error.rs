//! Error types for continuum construction and lookup.

/// Errors that can occur while building or querying a continuum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The entry list was empty, or the continuum holds no points.
    #[error("no valid server definitions found")]
    NoServers,

    /// The configured hasher yields fewer 32-bit words per digest than the
    /// weighted point scheme draws.
    #[error("hasher yields {words} words per digest, weighted rings need {needed}")]
    DigestTooNarrow {
        /// Words the hasher yields per digest.
        words: usize,
        /// Words the weighted scheme draws per hash step.
        needed: usize,
    },
}
