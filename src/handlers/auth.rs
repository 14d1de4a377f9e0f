use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::json;

use crate::auth::{
    jwt::create_token,
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::error::{AppError, AppResult};
use crate::models::user::{LoginRequest, RegisterRequest, User, UserProfile};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        // Don't confirm the username exists.
        return Err(AppError::Validation("Username is invalid".into()));
    }

    let pwd_hash = hash_password(&body.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, role, first_name, last_name, email)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&body.username)
    .bind(&pwd_hash)
    .bind(body.role.unwrap_or(1))
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.email)
    .fetch_one(&state.db)
    .await?;

    let profile: UserProfile = user.into();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Registered {} successfully", profile.username),
            "user": profile,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = create_token(user.id, user.role, &state.config)?;
    let profile: UserProfile = user.into();

    Ok(Json(json!({
        "message": format!("Welcome, {}!", profile.username),
        "user": profile,
        "token": token,
        "expires_in": state.config.jwt_ttl_secs,
    })))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
