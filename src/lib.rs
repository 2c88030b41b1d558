#![warn(missing_docs)]
//! Core library entry points for the comment recommender.
//!
//! A request carries the reader's draft comment plus a keyword string. The
//! keywords narrow the corpus to a handful of related articles, and the
//! comments under those articles are ranked against the draft.

pub mod api;
pub mod config;
pub mod embedder;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod similarity;
pub mod store;

pub use config::{RecommenderArgs, RecommenderConfig, DEFAULT_SIMILARITY_EPS, K_ARTICLES, K_RESULTS};
pub use embedder::{CachedEmbedder, Embedder, OpenAiEmbedder};
pub use error::RecommendError;
pub use model::{
    Article, Candidate, Comment, RecommendationItem, RecommendationQuery, RecommendationRequest,
    ScoredComment,
};
pub use pipeline::{collect_candidates, rank_candidates, select_articles, Recommender};
pub use similarity::cosine_similarity;
pub use store::{CommentStore, CorpusTables, MemoryCommentStore, PgCommentStore};
