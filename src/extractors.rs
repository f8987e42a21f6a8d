use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::require_role;
use crate::db::models::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

/// The user the caller claims to be, resolved against the store.
/// Returns 401 when the identity header is missing or unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claim = parts
            .headers
            .get(state.config.auth.user_header.as_str())
            .and_then(|v| v.to_str().ok());

        let conn = state.db.get()?;
        let user = state.auth.resolve(&conn, claim)?;
        Ok(CurrentUser(user))
    }
}

/// CurrentUser plus a creator-role check. Returns 403 for consumers.
pub struct RequireCreator(pub User);

impl FromRequestParts<AppState> for RequireCreator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, Role::Creator)?;
        Ok(RequireCreator(user))
    }
}
