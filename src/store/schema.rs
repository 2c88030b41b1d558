//! pgvector table names and the DDL that prepares them.

use anyhow::Result;

/// Quotes a Postgres identifier, doubling embedded quotes.
fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// The article and comment tables that make up one corpus, in one schema.
#[derive(Debug, Clone)]
pub struct CorpusTables {
    schema: String,
    articles: String,
    comments: String,
}

impl CorpusTables {
    /// Validates the names; quoting happens when SQL is rendered.
    pub fn new(schema: &str, articles: &str, comments: &str) -> Result<Self> {
        let names = [
            ("schema", schema),
            ("articles table", articles),
            ("comments table", comments),
        ];
        for (role, name) in names {
            anyhow::ensure!(!name.trim().is_empty(), "{role} name is required");
        }
        Ok(Self {
            schema: schema.to_string(),
            articles: articles.to_string(),
            comments: comments.to_string(),
        })
    }

    fn qualify(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    /// `"schema"."articles"`.
    pub fn articles_table(&self) -> String {
        self.qualify(&self.articles)
    }

    /// `"schema"."comments"`.
    pub fn comments_table(&self) -> String {
        self.qualify(&self.comments)
    }

    /// Reads every article in id order.
    pub fn select_articles_sql(&self) -> String {
        format!(
            "SELECT id, title, news_agency, url, embedding FROM {} ORDER BY id ASC",
            self.articles_table()
        )
    }

    /// Reads one article's comments in id order; `$1` is the article id.
    pub fn select_comments_sql(&self) -> String {
        format!(
            "SELECT id, article_id, text, embedding FROM {} WHERE article_id = $1 ORDER BY id ASC",
            self.comments_table()
        )
    }

    /// DDL for the article table with `dims`-wide embeddings.
    pub fn create_articles_ddl(&self, dims: usize) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                news_agency TEXT NOT NULL,
                url TEXT NOT NULL,
                embedding VECTOR({dims}) NOT NULL
            )",
            self.articles_table()
        )
    }

    /// DDL for the comment table with `dims`-wide embeddings.
    pub fn create_comments_ddl(&self, dims: usize) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT PRIMARY KEY,
                article_id BIGINT NOT NULL REFERENCES {} (id),
                text TEXT NOT NULL,
                embedding VECTOR({dims}) NOT NULL
            )",
            self.comments_table(),
            self.articles_table()
        )
    }

    /// Index backing `select_comments_sql`.
    pub fn create_comment_index_ddl(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (article_id)",
            quote_ident(&format!("{}_article_id_idx", self.comments)),
            self.comments_table()
        )
    }

    /// Insert (optionally upsert) statement for articles, `$1..$5`.
    pub fn insert_article_sql(&self, upsert: bool) -> String {
        let mut sql = format!(
            "INSERT INTO {} (id, title, news_agency, url, embedding) VALUES ($1, $2, $3, $4, $5)",
            self.articles_table()
        );
        if upsert {
            sql.push_str(
                " ON CONFLICT (id) DO UPDATE SET \
                    title = EXCLUDED.title, \
                    news_agency = EXCLUDED.news_agency, \
                    url = EXCLUDED.url, \
                    embedding = EXCLUDED.embedding",
            );
        }
        sql
    }

    /// Insert (optionally upsert) statement for comments, `$1..$4`.
    pub fn insert_comment_sql(&self, upsert: bool) -> String {
        let mut sql = format!(
            "INSERT INTO {} (id, article_id, text, embedding) VALUES ($1, $2, $3, $4)",
            self.comments_table()
        );
        if upsert {
            sql.push_str(
                " ON CONFLICT (id) DO UPDATE SET \
                    article_id = EXCLUDED.article_id, \
                    text = EXCLUDED.text, \
                    embedding = EXCLUDED.embedding",
            );
        }
        sql
    }
}
