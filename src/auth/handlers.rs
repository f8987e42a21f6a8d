use axum::extract::State;
use axum::Json;
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{find_user, hash_password, verify_password};
use crate::db::models::Role;
use crate::db::now_utc;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/signup — create a user with a bcrypt-hashed password.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<Value>> {
    let username = req.username.as_deref().unwrap_or("").trim().to_string();
    let password = req.password.as_deref().unwrap_or("").trim().to_string();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "username, password, role(required)".into(),
        ));
    }
    let Some(role) = Role::parse(req.role.as_deref().unwrap_or("consumer").trim()) else {
        return Err(AppError::InvalidInput(
            "username, password, role(required)".into(),
        ));
    };

    let conn = state.db.get()?;
    if find_user(&conn, &username)?.is_some() {
        return Err(AppError::Conflict("username taken".into()));
    }

    let pw_hash = hash_password(&password)?;
    conn.execute(
        "INSERT INTO users (username, pw_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, pw_hash, role.as_str(), now_utc()],
    )?;

    tracing::info!("New {} signup: {}", role.as_str(), username);
    Ok(Json(
        json!({ "ok": true, "username": username, "role": role.as_str() }),
    ))
}

/// POST /auth/login — verify credentials; the client echoes the username
/// as its identity claim on later requests.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let username = req.username.as_deref().unwrap_or("").trim();
    let password = req.password.as_deref().unwrap_or("");

    let conn = state.db.get()?;
    let user = find_user(&conn, username)?
        .filter(|u| verify_password(password, &u.pw_hash))
        .ok_or_else(|| AppError::Unauthenticated("invalid credentials".into()))?;

    Ok(Json(
        json!({ "ok": true, "username": user.username, "role": user.role.as_str() }),
    ))
}
