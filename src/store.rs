//! Read-only access to the article/comment corpus.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;

use crate::model::{Article, Comment};

mod memory;
mod postgres;
mod schema;

pub use memory::MemoryCommentStore;
pub use postgres::PgCommentStore;
pub use schema::CorpusTables;

/// Data-access seam consumed by the pipeline.
///
/// Implementations must tolerate concurrent reads; the pipeline never writes.
pub trait CommentStore: Send + Sync {
    /// Every article, with embeddings, in a stable retrieval order.
    fn fetch_all_articles(&self) -> impl Future<Output = Result<Vec<Article>>> + Send;

    /// Every comment of `article`, with embeddings, in a stable order.
    fn fetch_comments_for_article(
        &self,
        article: &Article,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;
}

impl<S: CommentStore> CommentStore for Arc<S> {
    fn fetch_all_articles(&self) -> impl Future<Output = Result<Vec<Article>>> + Send {
        (**self).fetch_all_articles()
    }

    fn fetch_comments_for_article(
        &self,
        article: &Article,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send {
        (**self).fetch_comments_for_article(article)
    }
}
