//! Route handlers

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use studio_core::{ChapterRequest, OutlineRequest, StructureRequest, StudioError};
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;

const STRUCTURE_FAILED: &str = "Failed to generate structure";
const OUTLINE_FAILED: &str = "Failed to generate outline";
const CHAPTER_FAILED: &str = "Failed to generate chapter";

/// Turn a body extraction failure into a validation error
fn body<T>(
    payload: Result<Json<T>, JsonRejection>,
    summary: &'static str,
) -> Result<T, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| {
            ApiError::new(summary, StudioError::validation(rejection.body_text()))
        })
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/generate-structure`
pub async fn generate_structure(
    State(state): State<AppState>,
    payload: Result<Json<StructureRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload, STRUCTURE_FAILED)?;
    let structure = state
        .generator
        .generate_structure(&request)
        .await
        .map_err(|e| ApiError::new(STRUCTURE_FAILED, e))?;

    Ok(Json(json!({ "structure": structure })))
}

/// `POST /api/generate-outline`
pub async fn generate_outline(
    State(state): State<AppState>,
    payload: Result<Json<OutlineRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload, OUTLINE_FAILED)?;
    let chapters = state
        .generator
        .generate_outline(&request)
        .await
        .map_err(|e| ApiError::new(OUTLINE_FAILED, e))?;

    info!(count = chapters.len(), "Outline generated");
    Ok(Json(json!({ "chapters": chapters })))
}

/// `POST /api/generate-chapter`
///
/// Streams `data: {"content": ...}` events. Dropping the connection drops
/// the body stream and with it the upstream request.
pub async fn generate_chapter(
    State(state): State<AppState>,
    payload: Result<Json<ChapterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload, CHAPTER_FAILED)?;
    let stream = state
        .generator
        .generate_chapter(&request)
        .await
        .map_err(|e| ApiError::new(CHAPTER_FAILED, e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
