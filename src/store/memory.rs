use std::collections::HashMap;

use anyhow::Result;

use super::CommentStore;
use crate::model::{Article, Comment};

/// Corpus held entirely in memory.
///
/// Articles come back in insertion order; comments are grouped by
/// `article_id` and keep their insertion order within each article.
#[derive(Debug, Clone, Default)]
pub struct MemoryCommentStore {
    articles: Vec<Article>,
    comments: HashMap<i64, Vec<Comment>>,
}

impl MemoryCommentStore {
    /// Builds a store from already-embedded records.
    pub fn new(articles: Vec<Article>, comments: Vec<Comment>) -> Self {
        let mut store = Self {
            articles,
            comments: HashMap::new(),
        };
        for comment in comments {
            store.push_comment(comment);
        }
        store
    }

    fn push_comment(&mut self, comment: Comment) {
        self.comments
            .entry(comment.article_id)
            .or_default()
            .push(comment);
    }
}

impl CommentStore for MemoryCommentStore {
    async fn fetch_all_articles(&self) -> Result<Vec<Article>> {
        Ok(self.articles.clone())
    }

    async fn fetch_comments_for_article(&self, article: &Article) -> Result<Vec<Comment>> {
        Ok(self.comments.get(&article.id).cloned().unwrap_or_default())
    }
}
