use std::sync::Arc;

use anyhow::{Context, Result};
use pgvector::Vector;
use tokio_postgres::{Client, NoTls, Row};

use super::{CommentStore, CorpusTables};
use crate::model::{Article, Comment};

/// Corpus stored in two pgvector tables.
#[derive(Clone)]
pub struct PgCommentStore {
    db: Arc<Client>,
    articles_sql: Arc<String>,
    comments_sql: Arc<String>,
}

impl PgCommentStore {
    /// Wraps an established client.
    pub fn new(db: Arc<Client>, tables: &CorpusTables) -> Self {
        Self {
            db,
            articles_sql: Arc::new(tables.select_articles_sql()),
            comments_sql: Arc::new(tables.select_comments_sql()),
        }
    }

    /// Connects to `database_url` and drives the connection on a background task.
    pub async fn connect(database_url: &str, tables: &CorpusTables) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .context("failed to connect to Postgres")?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection error");
            }
        });
        Ok(Self::new(Arc::new(client), tables))
    }
}

impl CommentStore for PgCommentStore {
    async fn fetch_all_articles(&self) -> Result<Vec<Article>> {
        let rows = self
            .db
            .query(self.articles_sql.as_str(), &[])
            .await
            .context("failed to query articles")?;
        rows.iter().map(article_from_row).collect()
    }

    async fn fetch_comments_for_article(&self, article: &Article) -> Result<Vec<Comment>> {
        let rows = self
            .db
            .query(self.comments_sql.as_str(), &[&article.id])
            .await
            .with_context(|| format!("failed to query comments for article {}", article.id))?;
        rows.iter().map(comment_from_row).collect()
    }
}

fn article_from_row(row: &Row) -> Result<Article> {
    let embedding: Vector = row.try_get("embedding").context("article embedding")?;
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        news_agency: row.try_get("news_agency")?,
        url: row.try_get("url")?,
        embedding: embedding.to_vec(),
    })
}

fn comment_from_row(row: &Row) -> Result<Comment> {
    let embedding: Vector = row.try_get("embedding").context("comment embedding")?;
    Ok(Comment {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        text: row.try_get("text")?,
        embedding: embedding.to_vec(),
    })
}
