use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::mood::MoodRecord;
use crate::AppState;

/// Raw mood records, ordered by sleep entry then slot. Regular users see
/// records joined through their own sleep entries; admins see all.
pub async fn list_moods(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<MoodRecord>>> {
    let moods = if auth_user.is_admin() {
        sqlx::query_as::<_, MoodRecord>(
            r#"SELECT * FROM mood ORDER BY sleep_id ASC, "order" ASC"#,
        )
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, MoodRecord>(
            r#"
            SELECT m.* FROM mood m
            JOIN sleep s ON s.id = m.sleep_id
            WHERE s.user_id = $1
            ORDER BY m.sleep_id ASC, m."order" ASC
            "#,
        )
        .bind(auth_user.id)
        .fetch_all(&state.db)
        .await?
    };

    Ok(Json(moods))
}

pub async fn get_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(mood_id): Path<i64>,
) -> AppResult<Json<MoodRecord>> {
    let mood = sqlx::query_as::<_, MoodRecord>(
        r#"
        SELECT m.* FROM mood m
        JOIN sleep s ON s.id = m.sleep_id
        WHERE m.id = $1 AND (s.user_id = $2 OR $3)
        "#,
    )
    .bind(mood_id)
    .bind(auth_user.id)
    .bind(auth_user.is_admin())
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Mood record not found".into()))?;

    Ok(Json(mood))
}
