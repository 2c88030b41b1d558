//! Keyword-narrowed comment ranking.
//!
//! A request flows through four stages, each feeding the next:
//!
//! 1. embed `[user_comment, keywords]` in one batch,
//! 2. keep the articles closest to the keyword vector ([`select_articles`]),
//! 3. gather those articles' comments ([`collect_candidates`]),
//! 4. rank the comments against the draft vector ([`rank_candidates`]).

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;

use crate::config::RecommenderConfig;
use crate::embedder::Embedder;
use crate::error::RecommendError;
use crate::model::{
    Article, Candidate, RecommendationItem, RecommendationQuery, RecommendationRequest,
    ScoredComment,
};
use crate::similarity::cosine_similarity;
use crate::store::CommentStore;

/// Stable descending sort by score. NaN scores sink to the end.
fn sort_by_score_desc<T>(scored: &mut [(T, f32)]) {
    scored.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Scores one stored embedding, failing when its width differs from the query's.
fn score(
    record: &'static str,
    id: i64,
    embedding: &[f32],
    query: &[f32],
    eps: f32,
) -> Result<f32, RecommendError> {
    cosine_similarity(embedding, query, eps).ok_or(RecommendError::DimensionMismatch {
        record,
        id,
        expected: query.len(),
        found: embedding.len(),
    })
}

/// Keeps the `config.article_candidates()` articles closest to `keyword_vector`.
///
/// Ties keep retrieval order. An empty corpus yields an empty selection.
pub fn select_articles(
    articles: Vec<Article>,
    keyword_vector: &[f32],
    config: &RecommenderConfig,
) -> Result<Vec<Article>, RecommendError> {
    let eps = config.similarity_eps();
    let mut scored = articles
        .into_iter()
        .map(|article| {
            let score = score("article", article.id, &article.embedding, keyword_vector, eps)?;
            Ok((article, score))
        })
        .collect::<Result<Vec<(Article, f32)>, RecommendError>>()?;
    sort_by_score_desc(&mut scored);
    scored.truncate(config.article_candidates());
    Ok(scored.into_iter().map(|(article, _)| article).collect())
}

/// Pairs every comment of every selected article with that article.
///
/// Output follows article order, then the store's comment order.
pub async fn collect_candidates<'a, S>(
    store: &S,
    articles: &'a [Article],
) -> Result<Vec<Candidate<'a>>, RecommendError>
where
    S: CommentStore,
{
    let mut candidates = Vec::new();
    for article in articles {
        let comments = store
            .fetch_comments_for_article(article)
            .await
            .map_err(RecommendError::DataAccess)?;
        candidates.extend(
            comments
                .into_iter()
                .map(|comment| Candidate { comment, article }),
        );
    }
    Ok(candidates)
}

/// Scores candidates against the draft vector and keeps the best `config.max_results()`.
///
/// Equal scores keep candidate order.
pub fn rank_candidates(
    candidates: Vec<Candidate<'_>>,
    draft_vector: &[f32],
    config: &RecommenderConfig,
) -> Result<Vec<ScoredComment>, RecommendError> {
    let eps = config.similarity_eps();
    let mut scored = candidates
        .into_iter()
        .map(|candidate| {
            let comment = &candidate.comment;
            let score = score("comment", comment.id, &comment.embedding, draft_vector, eps)?;
            Ok((candidate, score))
        })
        .collect::<Result<Vec<(Candidate<'_>, f32)>, RecommendError>>()?;
    sort_by_score_desc(&mut scored);
    scored.truncate(config.max_results());
    Ok(scored
        .into_iter()
        .map(|(candidate, score)| ScoredComment::from_candidate(candidate, score))
        .collect())
}

/// Entry point that wires an embedder and a store into the ranking stages.
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct Recommender<E, S> {
    embedder: Arc<E>,
    store: S,
    config: RecommenderConfig,
}

impl<E, S> Recommender<E, S>
where
    E: Embedder + 'static,
    S: CommentStore,
{
    /// Builds a recommender.
    pub fn new(embedder: Arc<E>, store: S, config: RecommenderConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Active ranking configuration.
    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Recommends comments for a draft; the outbound view of [`Self::recommend_scored`].
    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<Vec<RecommendationItem>, RecommendError> {
        Ok(self
            .recommend_scored(request)
            .await?
            .into_iter()
            .map(|scored| scored.item)
            .collect())
    }

    /// Runs the full pipeline and keeps each result's similarity score.
    ///
    /// An empty request returns immediately without touching the embedder or
    /// the store.
    pub async fn recommend_scored(
        &self,
        request: RecommendationRequest,
    ) -> Result<Vec<ScoredComment>, RecommendError> {
        let Some(query) = request.into_query()? else {
            tracing::debug!("empty recommendation request");
            return Ok(Vec::new());
        };
        let start = Instant::now();

        let (draft_vector, keyword_vector) = self.embed_query(query).await?;

        let articles = self
            .store
            .fetch_all_articles()
            .await
            .map_err(RecommendError::DataAccess)?;
        let corpus_size = articles.len();
        let selected = select_articles(articles, &keyword_vector, &self.config)?;

        let candidates = collect_candidates(&self.store, &selected).await?;
        let candidate_count = candidates.len();
        let ranked = rank_candidates(candidates, &draft_vector, &self.config)?;

        tracing::info!(
            corpus_size,
            selected_articles = selected.len(),
            candidate_count,
            returned = ranked.len(),
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "recommendations ranked"
        );
        Ok(ranked)
    }

    /// Embeds draft and keywords together; the draft comes first.
    async fn embed_query(
        &self,
        query: RecommendationQuery,
    ) -> Result<(Vec<f32>, Vec<f32>), RecommendError> {
        let embedder = Arc::clone(&self.embedder);
        let vectors = tokio::task::spawn_blocking(move || {
            embedder.encode(&[query.user_comment.as_str(), query.keywords.as_str()])
        })
        .await
        .map_err(|err| {
            RecommendError::EmbeddingUnavailable(anyhow!("embedding task join error: {err}"))
        })?
        .map_err(RecommendError::EmbeddingUnavailable)?;

        let mut vectors = vectors.into_iter();
        match (vectors.next(), vectors.next(), vectors.next()) {
            (Some(draft), Some(keywords), None) => Ok((draft, keywords)),
            _ => Err(RecommendError::EmbeddingUnavailable(anyhow!(
                "embedder did not return exactly two vectors for draft and keywords"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Comment;
    use crate::store::MemoryCommentStore;
    use pretty_assertions::assert_eq;

    fn article(id: i64, embedding: Vec<f32>) -> Article {
        Article {
            id,
            title: format!("article {id}"),
            news_agency: "Agency".into(),
            url: format!("https://news.test/{id}"),
            embedding,
        }
    }

    fn comment(id: i64, article_id: i64, embedding: Vec<f32>) -> Comment {
        Comment {
            id,
            article_id,
            text: format!("comment {id}"),
            embedding,
        }
    }

    fn ids(articles: &[Article]) -> Vec<i64> {
        articles.iter().map(|a| a.id).collect()
    }

    #[test]
    fn selection_keeps_top_five_by_similarity() {
        let query: Vec<f32> = vec![1.0, 0.0];
        let articles: Vec<Article> = (0..8)
            .map(|i| {
                let angle = i as f32 * 0.2;
                article(i, vec![angle.cos(), angle.sin()])
            })
            .rev()
            .collect();
        let selected =
            select_articles(articles, &query, &RecommenderConfig::default()).expect("select");
        assert_eq!(ids(&selected), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn selection_ties_keep_retrieval_order() {
        let articles = vec![
            article(7, vec![0.0, 1.0]),
            article(3, vec![1.0, 0.0]),
            article(5, vec![2.0, 0.0]),
            article(1, vec![0.0, 0.0]),
        ];
        let selected =
            select_articles(articles, &[1.0, 0.0], &RecommenderConfig::default()).expect("select");
        assert_eq!(ids(&selected), vec![3, 5, 7, 1]);
    }

    #[test]
    fn selection_of_empty_corpus_is_empty() {
        let selected =
            select_articles(Vec::new(), &[1.0], &RecommenderConfig::default()).expect("select");
        assert!(selected.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn collection_follows_article_order() {
        let store = MemoryCommentStore::new(
            vec![article(1, vec![1.0]), article(2, vec![1.0])],
            vec![
                comment(10, 1, vec![1.0]),
                comment(20, 2, vec![1.0]),
                comment(11, 1, vec![1.0]),
                comment(30, 3, vec![1.0]),
            ],
        );
        let selected = vec![article(2, vec![1.0]), article(1, vec![1.0])];
        let candidates = collect_candidates(&store, &selected).await.expect("collect");
        let pairs: Vec<(i64, i64)> = candidates
            .iter()
            .map(|c| (c.article.id, c.comment.id))
            .collect();
        assert_eq!(pairs, vec![(2, 20), (1, 10), (1, 11)]);
    }

    #[test]
    fn ranking_truncates_and_orders() {
        let parent = article(1, vec![1.0, 0.0]);
        let candidates: Vec<Candidate<'_>> = (0..9)
            .map(|i| {
                let angle = i as f32 * 0.15;
                Candidate {
                    comment: comment(i, 1, vec![angle.cos(), angle.sin()]),
                    article: &parent,
                }
            })
            .rev()
            .collect();
        let ranked = rank_candidates(candidates, &[1.0, 0.0], &RecommenderConfig::default())
            .expect("rank");
        let texts: Vec<&str> = ranked.iter().map(|s| s.item.comment_text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["comment 0", "comment 1", "comment 2", "comment 3", "comment 4", "comment 5"]
        );
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn nan_scores_rank_last() {
        let parent = article(1, vec![1.0]);
        let candidates = vec![
            Candidate {
                comment: comment(1, 1, vec![f32::NAN]),
                article: &parent,
            },
            Candidate {
                comment: comment(2, 1, vec![1.0]),
                article: &parent,
            },
        ];
        let ranked =
            rank_candidates(candidates, &[1.0], &RecommenderConfig::default()).expect("rank");
        let texts: Vec<&str> = ranked.iter().map(|s| s.item.comment_text.as_str()).collect();
        assert_eq!(texts, vec!["comment 2", "comment 1"]);
    }

    #[test]
    fn ranking_ties_keep_candidate_order() {
        let parent = article(1, vec![1.0, 0.0]);
        let comments = [
            (4, vec![0.0, 1.0]),
            (9, vec![2.0, 0.0]),
            (2, vec![0.0, 3.0]),
            (6, vec![1.0, 0.0]),
        ];
        let candidates: Vec<Candidate<'_>> = comments
            .into_iter()
            .map(|(id, embedding)| Candidate {
                comment: comment(id, 1, embedding),
                article: &parent,
            })
            .collect();
        let ranked = rank_candidates(candidates, &[1.0, 0.0], &RecommenderConfig::default())
            .expect("rank");
        let texts: Vec<&str> = ranked.iter().map(|s| s.item.comment_text.as_str()).collect();
        assert_eq!(texts, vec!["comment 9", "comment 6", "comment 4", "comment 2"]);
    }

    #[test]
    fn mismatched_widths_abort_both_stages() {
        let err = select_articles(
            vec![article(1, vec![1.0, 0.0]), article(2, vec![1.0, 0.0, 0.0])],
            &[1.0, 0.0],
            &RecommenderConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RecommendError::DimensionMismatch {
                record: "article",
                id: 2,
                expected: 2,
                found: 3
            }
        ));

        let parent = article(1, vec![1.0]);
        let candidates = vec![Candidate {
            comment: comment(8, 1, vec![1.0, 0.0, 0.0]),
            article: &parent,
        }];
        let err = rank_candidates(candidates, &[1.0, 0.0], &RecommenderConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RecommendError::DimensionMismatch {
                record: "comment",
                id: 8,
                ..
            }
        ));
    }
}
