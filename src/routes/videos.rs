use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::{self, NewYoutubeVideo, VideoQuery};
use crate::error::{AppError, AppResult};
use crate::extractors::RequireCreator;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
    pub user: Option<String>,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub user: Option<String>,
    // Kept loose so an out-of-range or non-integer value maps to 400
    // instead of a body-deserialization rejection.
    pub value: Option<serde_json::Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/videos", get(list))
        .route("/api/videos/youtube", post(add_youtube))
        .route("/api/videos/{id}/like", post(like))
        .route("/api/videos/{id}/comments", post(comment))
        .route("/api/videos/{id}/ratings", post(rate))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let videos = catalog::list_videos(&conn, &query)?;
    Ok(Json(videos).into_response())
}

async fn add_youtube(
    State(state): State<AppState>,
    RequireCreator(user): RequireCreator,
    Json(req): Json<NewYoutubeVideo>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let detail = catalog::add_youtube_video(&conn, &req, user.id)?;
    tracing::info!("{} added video {}", user.username, detail.video.id);
    Ok((StatusCode::CREATED, Json(detail)).into_response())
}

async fn like(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let likes = catalog::like_video(&conn, id)?;
    Ok(Json(json!({ "likes": likes })).into_response())
}

async fn comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let detail = catalog::add_comment(
        &conn,
        id,
        req.user.as_deref(),
        req.text.as_deref().unwrap_or(""),
    )?;
    Ok(Json(detail).into_response())
}

async fn rate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RatingRequest>,
) -> AppResult<Response> {
    let value = req
        .value
        .as_ref()
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| AppError::InvalidInput("value 1..5 required".into()))?;

    let conn = state.db.get()?;
    let detail = catalog::rate_video(&conn, id, req.user.as_deref(), value)?;
    Ok(Json(detail).into_response())
}
