use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use comment_recommender::api::{router, ErrorBody};
use comment_recommender::{
    Article, Comment, Embedder, MemoryCommentStore, RecommendationItem, Recommender,
    RecommenderConfig,
};
use tower::ServiceExt;

/// Maps every text containing "bike" to one axis and everything else to the other.
struct AxisEmbedder;

impl Embedder for AxisEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                if text.contains("bike") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
}

struct OfflineEmbedder;

impl Embedder for OfflineEmbedder {
    fn encode(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("model server offline"))
    }
}

fn corpus() -> MemoryCommentStore {
    MemoryCommentStore::new(
        vec![Article {
            id: 1,
            title: "City expands cycling network".into(),
            news_agency: "Metro Daily".into(),
            url: "https://metro.test/cycling".into(),
            embedding: vec![0.0, 1.0],
        }],
        vec![
            Comment {
                id: 1,
                article_id: 1,
                text: "Parking is already impossible".into(),
                embedding: vec![0.0, 1.0],
            },
            Comment {
                id: 2,
                article_id: 1,
                text: "Finally, safe bike lanes".into(),
                embedding: vec![1.0, 0.0],
            },
        ],
    )
}

fn app<E: Embedder + 'static>(embedder: E) -> axum::Router {
    let recommender = Recommender::new(Arc::new(embedder), corpus(), RecommenderConfig::default());
    router(Arc::new(recommender))
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/recommendations")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = app(AxisEmbedder)
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn recommendations_are_ranked_named_records() {
    let response = app(AxisEmbedder)
        .oneshot(post_json(
            r#"{"user_comment": "more bike lanes please", "keywords": "city cycling"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let items: Vec<RecommendationItem> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].comment_text, "Finally, safe bike lanes");
    assert_eq!(items[0].source_agency, "Metro Daily");
    assert_eq!(items[0].article_title, "City expands cycling network");
    assert_eq!(items[0].article_url, "https://metro.test/cycling");
}

#[tokio::test]
async fn empty_body_returns_empty_list() {
    let response = app(OfflineEmbedder).oneshot(post_json("{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"[]");
}

#[tokio::test]
async fn missing_field_is_bad_request() {
    let response = app(AxisEmbedder)
        .oneshot(post_json(r#"{"keywords": "cycling"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.message, "missing required field `user_comment`");
}

#[tokio::test]
async fn embedding_outage_is_bad_gateway() {
    let response = app(OfflineEmbedder)
        .oneshot(post_json(r#"{"user_comment": "x", "keywords": "y"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
