//! Failure taxonomy surfaced by the recommendation pipeline.

use thiserror::Error;

/// Errors that abort a recommendation request.
///
/// An empty request is not an error; it short-circuits to an empty result.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Exactly one of `user_comment` / `keywords` was supplied.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// The embedding backend failed or returned an unusable batch.
    #[error("embedding backend unavailable: {0:#}")]
    EmbeddingUnavailable(#[source] anyhow::Error),
    /// The article/comment store failed.
    #[error("data access failed: {0:#}")]
    DataAccess(#[source] anyhow::Error),
    /// A stored embedding and the query vector have different widths.
    #[error("{record} {id} has a {found}-dimensional embedding but the query has {expected}")]
    DimensionMismatch {
        /// `"article"` or `"comment"`.
        record: &'static str,
        /// Id of the offending record.
        id: i64,
        /// Width of the query vector.
        expected: usize,
        /// Width of the stored vector.
        found: usize,
    },
}

impl RecommendError {
    /// Whether the caller sent a malformed request, as opposed to a backend failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }
}
