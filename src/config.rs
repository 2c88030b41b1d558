//! Ranking knobs shared by the pipeline and the binaries.

use clap::Args;

/// Articles kept by the keyword stage.
pub const K_ARTICLES: usize = 5;
/// Comments returned to the caller.
pub const K_RESULTS: usize = 6;
/// Floor applied to the cosine denominator so zero vectors score finitely.
pub const DEFAULT_SIMILARITY_EPS: f32 = 1e-6;

/// Tunable knobs that bound a recommendation request.
#[derive(Clone, Debug, PartialEq)]
pub struct RecommenderConfig {
    article_candidates: usize,
    max_results: usize,
    similarity_eps: f32,
}

impl RecommenderConfig {
    /// Constructs a new configuration. Zero limits are raised to one and a
    /// non-positive (or NaN) eps falls back to [`DEFAULT_SIMILARITY_EPS`].
    pub fn new(article_candidates: usize, max_results: usize, similarity_eps: f32) -> Self {
        let similarity_eps = if similarity_eps > 0.0 {
            similarity_eps
        } else {
            DEFAULT_SIMILARITY_EPS
        };
        Self {
            article_candidates: article_candidates.max(1),
            max_results: max_results.max(1),
            similarity_eps,
        }
    }

    /// Number of articles kept after keyword ranking.
    pub fn article_candidates(&self) -> usize {
        self.article_candidates
    }

    /// Number of comments returned per request.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Denominator floor for cosine similarity.
    pub fn similarity_eps(&self) -> f32 {
        self.similarity_eps
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            article_candidates: K_ARTICLES,
            max_results: K_RESULTS,
            similarity_eps: DEFAULT_SIMILARITY_EPS,
        }
    }
}

/// Command-line flags shared by binaries that run the ranking pipeline.
#[derive(Args, Debug, Clone)]
pub struct RecommenderArgs {
    /// Articles kept after ranking by keyword similarity
    #[arg(long, env = "RECOMMENDER_ARTICLE_CANDIDATES", default_value_t = K_ARTICLES)]
    pub article_candidates: usize,

    /// Comments returned per request
    #[arg(long, env = "RECOMMENDER_MAX_RESULTS", default_value_t = K_RESULTS)]
    pub max_results: usize,

    /// Denominator floor used by cosine similarity
    #[arg(long, env = "RECOMMENDER_SIMILARITY_EPS", default_value_t = DEFAULT_SIMILARITY_EPS)]
    pub similarity_eps: f32,
}

impl RecommenderArgs {
    /// Converts the parsed flags into a `RecommenderConfig`.
    pub fn build_config(&self) -> RecommenderConfig {
        RecommenderConfig::new(self.article_candidates, self.max_results, self.similarity_eps)
    }
}
