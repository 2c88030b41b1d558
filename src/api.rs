//! JSON-over-HTTP surface for the recommender.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::embedder::Embedder;
use crate::error::RecommendError;
use crate::model::{RecommendationItem, RecommendationRequest};
use crate::pipeline::Recommender;
use crate::store::CommentStore;

/// Error payload returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub message: String,
}

/// Builds the router: `GET /healthz` and `POST /v1/recommendations`.
pub fn router<E, S>(recommender: Arc<Recommender<E, S>>) -> Router
where
    E: Embedder + 'static,
    S: CommentStore + 'static,
{
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/recommendations", post(recommend_handler::<E, S>))
        .with_state(recommender)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn recommend_handler<E, S>(
    State(recommender): State<Arc<Recommender<E, S>>>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<Vec<RecommendationItem>>, (StatusCode, Json<ErrorBody>)>
where
    E: Embedder + 'static,
    S: CommentStore + 'static,
{
    recommender
        .recommend(request)
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(err: RecommendError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        RecommendError::MissingField(_) => StatusCode::BAD_REQUEST,
        RecommendError::EmbeddingUnavailable(_) => StatusCode::BAD_GATEWAY,
        RecommendError::DataAccess(_) | RecommendError::DimensionMismatch { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if err.is_client_error() {
        tracing::debug!(error = %err, "rejected recommendation request");
    } else {
        tracing::error!(error = %err, "recommendation request failed");
    }
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}
