pub mod assets;
pub mod auth;
pub mod videos;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::index))
        .route("/uploads/{filename}", get(assets::serve_upload))
        .merge(auth::router())
        .merge(videos::router())
}
