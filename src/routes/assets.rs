use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET / — the HTML client, served from the data directory.
pub async fn index(State(state): State<AppState>) -> AppResult<Response> {
    let bytes = tokio::fs::read(state.config.index_path())
        .await
        .map_err(|_| AppError::NotFound)?;
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        bytes,
    )
        .into_response())
}

/// GET /uploads/{filename} — passthrough from the uploads directory.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    // Single path segment only; reject anything that could escape the dir.
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(AppError::NotFound);
    }

    let path = state.config.uploads_path().join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound)?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok((
        [(header::CONTENT_TYPE, mime.essence_str().to_string())],
        bytes,
    )
        .into_response())
}
