use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::user::{User, UserProfile};
use crate::AppState;

/// Admin-only: every registered user, sanitized.
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserProfile>>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// A user may fetch their own record; admins may fetch anyone's.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    if user_id != auth_user.id && !auth_user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
