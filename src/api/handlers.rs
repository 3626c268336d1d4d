//! API handlers

use super::models::*;
use crate::error::Error;
use crate::metrics::METRICS;
use crate::pipeline::QueryPipeline;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
    pub model: String,
}

/// Answer a question
///
/// POST /api/v1/ask
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ApiError>)> {
    let answer = state
        .pipeline
        .ask(&request.question, request.conversation_id, request.clear)
        .await
        .map_err(into_api_error)?;

    Ok(Json(AskResponse {
        conversation_id: answer.conversation_id,
        answer: answer.answer,
        chunks_used: answer.chunks_used,
        kg_facts: answer.kg_facts,
    }))
}

/// Readiness and active model
///
/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model,
        timestamp: chrono::Utc::now(),
    })
}

/// Prometheus exposition
///
/// GET /metrics
pub async fn metrics() -> Result<String, (StatusCode, Json<ApiError>)> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = METRICS.registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).map_err(|e| {
        error!("Metrics encoding failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new("INTERNAL_ERROR", e.to_string())),
        )
    })?;

    String::from_utf8(buffer).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new("INTERNAL_ERROR", e.to_string())),
        )
    })
}

fn into_api_error(e: Error) -> (StatusCode, Json<ApiError>) {
    match &e {
        Error::EmptyQuestion => (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("VALIDATION_ERROR", e.to_string())),
        ),
        Error::LanguageModel(_) => {
            error!("Answer generation failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::new("UPSTREAM_ERROR", e.to_string())),
            )
        }
        _ => {
            error!("Request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("INTERNAL_ERROR", e.to_string())),
            )
        }
    }
}
