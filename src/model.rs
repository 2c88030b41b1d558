//! Corpus records and the request/response shapes of a recommendation call.

use serde::{Deserialize, Serialize};

use crate::error::RecommendError;

/// News article with its precomputed keyword-space embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Store-assigned identifier.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Publishing agency.
    pub news_agency: String,
    /// Canonical article URL.
    pub url: String,
    /// Embedding produced offline by the same model used for queries.
    pub embedding: Vec<f32>,
}

/// Reader comment attached to an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Store-assigned identifier.
    pub id: i64,
    /// Identifier of the owning [`Article`].
    pub article_id: i64,
    /// Comment body.
    pub text: String,
    /// Embedding produced offline by the same model used for queries.
    pub embedding: Vec<f32>,
}

/// A comment paired with the article it was collected from. Lives for one request.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Candidate comment.
    pub comment: Comment,
    /// Article the comment belongs to.
    pub article: &'a Article,
}

/// Inbound request body. Both fields absent means "nothing to recommend".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecommendationRequest {
    /// Draft comment the reader is writing.
    #[serde(default)]
    pub user_comment: Option<String>,
    /// Keyword string describing the article being commented on.
    #[serde(default)]
    pub keywords: Option<String>,
}

/// Validated pair of texts sent to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationQuery {
    /// Draft comment text.
    pub user_comment: String,
    /// Keyword text.
    pub keywords: String,
}

impl RecommendationRequest {
    /// Builds a request carrying both fields.
    pub fn new(user_comment: impl Into<String>, keywords: impl Into<String>) -> Self {
        Self {
            user_comment: Some(user_comment.into()),
            keywords: Some(keywords.into()),
        }
    }

    /// Checks field presence. `Ok(None)` is the empty request.
    pub fn into_query(self) -> Result<Option<RecommendationQuery>, RecommendError> {
        match (self.user_comment, self.keywords) {
            (None, None) => Ok(None),
            (Some(user_comment), Some(keywords)) => Ok(Some(RecommendationQuery {
                user_comment,
                keywords,
            })),
            (None, Some(_)) => Err(RecommendError::MissingField("user_comment")),
            (Some(_), None) => Err(RecommendError::MissingField("keywords")),
        }
    }
}

/// Outbound recommendation. The ranking score is intentionally not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    /// Body of the recommended comment.
    pub comment_text: String,
    /// Agency that published the parent article.
    pub source_agency: String,
    /// Parent article headline.
    pub article_title: String,
    /// Parent article URL.
    pub article_url: String,
}

/// Recommendation plus the similarity used to order it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredComment {
    /// Outbound record.
    pub item: RecommendationItem,
    /// Cosine similarity between the comment and the draft.
    pub score: f32,
}

impl ScoredComment {
    /// Scores a candidate, consuming its comment body.
    pub fn from_candidate(candidate: Candidate<'_>, score: f32) -> Self {
        let article = candidate.article;
        Self {
            item: RecommendationItem {
                comment_text: candidate.comment.text,
                source_agency: article.news_agency.clone(),
                article_title: article.title.clone(),
                article_url: article.url.clone(),
            },
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_body_is_empty_request() {
        let request: RecommendationRequest = serde_json::from_str("{}").expect("parses");
        assert_eq!(request.into_query().expect("valid"), None);
    }

    #[test]
    fn unknown_keys_do_not_count_as_input() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"article_id": 7}"#).expect("parses");
        assert_eq!(request.into_query().expect("valid"), None);
    }

    #[test]
    fn both_fields_produce_query() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"user_comment": "great read", "keywords": "election"}"#)
                .expect("parses");
        let query = request.into_query().expect("valid").expect("non-empty");
        assert_eq!(
            query,
            RecommendationQuery {
                user_comment: "great read".into(),
                keywords: "election".into(),
            }
        );
    }

    #[test]
    fn single_field_is_rejected() {
        let only_draft = RecommendationRequest {
            user_comment: Some("hi".into()),
            keywords: None,
        };
        match only_draft.into_query() {
            Err(RecommendError::MissingField(field)) => assert_eq!(field, "keywords"),
            other => panic!("expected missing keywords, got {other:?}"),
        }

        let only_keywords = RecommendationRequest {
            user_comment: None,
            keywords: Some("budget".into()),
        };
        match only_keywords.into_query() {
            Err(RecommendError::MissingField(field)) => assert_eq!(field, "user_comment"),
            other => panic!("expected missing user_comment, got {other:?}"),
        }
    }

    #[test]
    fn empty_strings_are_still_present() {
        let query = RecommendationRequest::new("", "")
            .into_query()
            .expect("valid")
            .expect("non-empty");
        assert_eq!(query.user_comment, "");
    }

    #[test]
    fn scored_comment_carries_article_context() {
        let article = Article {
            id: 1,
            title: "Rates rise".into(),
            news_agency: "Wire".into(),
            url: "https://news.test/rates".into(),
            embedding: vec![1.0],
        };
        let candidate = Candidate {
            comment: Comment {
                id: 9,
                article_id: 1,
                text: "About time".into(),
                embedding: vec![1.0],
            },
            article: &article,
        };
        let scored = ScoredComment::from_candidate(candidate, 0.5);
        assert_eq!(
            serde_json::to_value(&scored.item).expect("serializes"),
            serde_json::json!({
                "comment_text": "About time",
                "source_agency": "Wire",
                "article_title": "Rates rise",
                "article_url": "https://news.test/rates",
            })
        );
        assert_eq!(scored.score, 0.5);
    }
}
