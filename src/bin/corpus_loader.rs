use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use comment_recommender::logging::init_tracing;
use comment_recommender::{Article, Comment, CorpusTables};
use pgvector::Vector;
use serde::de::DeserializeOwned;
use tokio_postgres::{Client, NoTls};

#[derive(Parser, Debug)]
#[command(
    name = "recommender-load",
    about = "Load embedded articles and comments into pgvector-backed Postgres tables"
)]
struct LoadCli {
    /// JSONL file with one embedded article per line
    #[arg(long, env = "RECOMMENDER_ARTICLES_INPUT", default_value = "articles.jsonl")]
    articles: PathBuf,

    /// JSONL file with one embedded comment per line
    #[arg(long, env = "RECOMMENDER_COMMENTS_INPUT", default_value = "comments.jsonl")]
    comments: PathBuf,

    /// Postgres connection string (postgres://...)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Target schema for both tables
    #[arg(long, env = "RECOMMENDER_SCHEMA", default_value = "public")]
    schema: String,

    /// Article table name inside the schema
    #[arg(long, env = "RECOMMENDER_ARTICLES_TABLE", default_value = "articles")]
    articles_table: String,

    /// Comment table name inside the schema
    #[arg(long, env = "RECOMMENDER_COMMENTS_TABLE", default_value = "comments")]
    comments_table: String,

    /// Number of rows buffered per INSERT transaction
    #[arg(long, env = "RECOMMENDER_LOAD_BATCH", default_value_t = 128)]
    batch_size: usize,

    /// Create the vector extension and tables automatically if missing (true/false)
    #[arg(
        long,
        env = "RECOMMENDER_LOAD_PREPARE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    prepare_tables: bool,

    /// Upsert rows when the id already exists (true/false)
    #[arg(
        long,
        env = "RECOMMENDER_LOAD_UPSERT",
        default_value_t = true,
        action = ArgAction::Set
    )]
    upsert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("recommender-load");
    let cli = LoadCli::parse();
    let batch_size = cli.batch_size.max(1);
    let tables = CorpusTables::new(&cli.schema, &cli.articles_table, &cli.comments_table)?;

    let articles: Vec<Article> = read_jsonl(&cli.articles)?;
    let comments: Vec<Comment> = read_jsonl(&cli.comments)?;
    let Some(dims) = corpus_dimensions(&articles, &comments)? else {
        tracing::info!("no articles or comments to insert; nothing to do");
        return Ok(());
    };

    let (mut client, connection) = tokio_postgres::connect(&cli.database_url, NoTls)
        .await
        .context("failed to connect to Postgres")?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!(error = %err, "postgres connection error");
        }
    });

    if cli.prepare_tables {
        prepare_tables(&client, &tables, dims).await?;
    }

    let article_sql = tables.insert_article_sql(cli.upsert);
    for (idx, batch) in articles.chunks(batch_size).enumerate() {
        insert_articles(&mut client, &article_sql, batch).await?;
        tracing::info!(
            inserted = (idx * batch_size + batch.len()),
            total = articles.len(),
            "articles loaded"
        );
    }

    let comment_sql = tables.insert_comment_sql(cli.upsert);
    for (idx, batch) in comments.chunks(batch_size).enumerate() {
        insert_comments(&mut client, &comment_sql, batch).await?;
        tracing::info!(
            inserted = (idx * batch_size + batch.len()),
            total = comments.len(),
            "comments loaded"
        );
    }

    tracing::info!(
        articles = articles.len(),
        comments = comments.len(),
        articles_table = %tables.articles_table(),
        comments_table = %tables.comments_table(),
        "corpus load complete"
    );
    Ok(())
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).with_context(|| {
            format!("invalid record at {}:{}", path.display(), line_no + 1)
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Embedding width shared by every record, or `None` for an empty corpus.
fn corpus_dimensions(articles: &[Article], comments: &[Comment]) -> Result<Option<usize>> {
    let Some(first) = articles.first() else {
        anyhow::ensure!(
            comments.is_empty(),
            "{} comments supplied without any articles to attach them to",
            comments.len()
        );
        return Ok(None);
    };
    let dims = first.embedding.len();
    anyhow::ensure!(dims > 0, "article {} has an empty embedding", first.id);
    check_dimensions(articles, comments, dims)?;
    Ok(Some(dims))
}

fn check_dimensions(articles: &[Article], comments: &[Comment], dims: usize) -> Result<()> {
    if let Some(bad) = articles.iter().find(|a| a.embedding.len() != dims) {
        return Err(anyhow!(
            "article {} has {} dimensions, expected {}",
            bad.id,
            bad.embedding.len(),
            dims
        ));
    }
    if let Some(bad) = comments.iter().find(|c| c.embedding.len() != dims) {
        return Err(anyhow!(
            "comment {} has {} dimensions, expected {}",
            bad.id,
            bad.embedding.len(),
            dims
        ));
    }
    Ok(())
}

async fn prepare_tables(client: &Client, tables: &CorpusTables, dims: usize) -> Result<()> {
    client
        .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
        .await
        .context("failed to ensure pgvector extension")?;
    client
        .execute(&tables.create_articles_ddl(dims), &[])
        .await
        .context("failed to create article table")?;
    client
        .execute(&tables.create_comments_ddl(dims), &[])
        .await
        .context("failed to create comment table")?;
    client
        .execute(&tables.create_comment_index_ddl(), &[])
        .await
        .context("failed to create comment article_id index")?;
    Ok(())
}

async fn insert_articles(client: &mut Client, sql: &str, records: &[Article]) -> Result<()> {
    let transaction = client.transaction().await?;
    let statement = transaction.prepare(sql).await?;
    for record in records {
        let vector = Vector::from(record.embedding.clone());
        transaction
            .execute(
                &statement,
                &[
                    &record.id,
                    &record.title,
                    &record.news_agency,
                    &record.url,
                    &vector,
                ],
            )
            .await
            .with_context(|| format!("failed to insert article {}", record.id))?;
    }
    transaction.commit().await?;
    Ok(())
}

async fn insert_comments(client: &mut Client, sql: &str, records: &[Comment]) -> Result<()> {
    let transaction = client.transaction().await?;
    let statement = transaction.prepare(sql).await?;
    for record in records {
        let vector = Vector::from(record.embedding.clone());
        transaction
            .execute(
                &statement,
                &[&record.id, &record.article_id, &record.text, &vector],
            )
            .await
            .with_context(|| {
                format!(
                    "failed to insert comment {} for article {}",
                    record.id, record.article_id
                )
            })?;
    }
    transaction.commit().await?;
    Ok(())
}
