use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use comment_recommender::embedder::{CachedEmbedder, OpenAiEmbedder};
use comment_recommender::logging::init_tracing;
use comment_recommender::{api, CorpusTables, PgCommentStore, RecommenderArgs, Recommender};

#[derive(Parser, Debug)]
#[command(
    name = "recommender-api",
    about = "HTTP API that recommends existing comments similar to a reader's draft"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "RECOMMENDER_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Postgres connection string (postgres://...).
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Schema holding the article and comment tables.
    #[arg(long, env = "RECOMMENDER_SCHEMA", default_value = "public")]
    schema: String,

    /// Table storing embedded articles.
    #[arg(long, env = "RECOMMENDER_ARTICLES_TABLE", default_value = "articles")]
    articles_table: String,

    /// Table storing embedded comments.
    #[arg(long, env = "RECOMMENDER_COMMENTS_TABLE", default_value = "comments")]
    comments_table: String,

    /// API key for the embedding endpoint (optional for self-hosted servers).
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    openai_api_key: String,

    /// Embedding model identifier; must match the model that embedded the corpus.
    #[arg(
        long,
        env = "RECOMMENDER_OPENAI_MODEL",
        default_value = "text-embedding-3-small"
    )]
    openai_model: String,

    /// Optional embedding dimension override.
    #[arg(long, env = "RECOMMENDER_OPENAI_DIMENSIONS")]
    openai_dimensions: Option<usize>,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(
        long,
        env = "RECOMMENDER_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    openai_base_url: String,

    /// Max inputs per embedding request.
    #[arg(long, env = "RECOMMENDER_OPENAI_BATCH", default_value_t = 32)]
    batch_size: usize,

    /// Seconds before embedding requests time out.
    #[arg(long, env = "RECOMMENDER_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    openai_timeout_secs: u64,

    /// Attempts for transient embedding errors.
    #[arg(long, env = "RECOMMENDER_OPENAI_MAX_RETRIES", default_value_t = 3)]
    max_retries: usize,

    /// Max cached text embeddings kept in memory (0 disables caching).
    #[arg(long, env = "RECOMMENDER_EMBEDDING_CACHE", default_value_t = 1024)]
    embedding_cache_size: usize,

    #[command(flatten)]
    ranking: RecommenderArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("recommender-api");
    let cli = ApiCli::parse();

    let tables = CorpusTables::new(&cli.schema, &cli.articles_table, &cli.comments_table)?;
    let embedder = OpenAiEmbedder::new(
        &cli.openai_api_key,
        &cli.openai_base_url,
        cli.openai_model.clone(),
        cli.openai_dimensions,
        Duration::from_secs(cli.openai_timeout_secs.max(1)),
        cli.max_retries,
        cli.batch_size,
    )?;
    let embedder = Arc::new(CachedEmbedder::new(embedder, cli.embedding_cache_size));
    let store = PgCommentStore::connect(&cli.database_url, &tables)
        .await
        .with_context(|| format!("failed to open corpus at {}", tables.articles_table()))?;
    let config = cli.ranking.build_config();
    tracing::info!(
        model = %cli.openai_model,
        article_candidates = config.article_candidates(),
        max_results = config.max_results(),
        "recommender configured"
    );
    let recommender = Arc::new(Recommender::new(embedder, store, config));
    let app = api::router(recommender);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "recommender-api listening");
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}
