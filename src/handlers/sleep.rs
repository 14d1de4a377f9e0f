use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::sleep::{
    CreateSleepRequest, FlattenedSleepView, NewSleep, SleepChanges, SleepFilter, SleepRangeQuery,
    UpdateSleepRequest,
};
use crate::sleep::SleepMoodAggregator;
use crate::store::PgRecordStore;
use crate::AppState;

fn aggregator(state: &AppState) -> SleepMoodAggregator<PgRecordStore> {
    SleepMoodAggregator::new(PgRecordStore::new(state.db.clone()))
}

fn can_access(auth_user: &AuthUser, owner_id: i64) -> bool {
    owner_id == auth_user.id || auth_user.is_admin()
}

/// Ownership gate for mutations: a single scalar fetch, no mood reads.
/// Non-admins get a 404 for entries they don't own, never a confirmation
/// that the id exists.
async fn ensure_owned(state: &AppState, auth_user: &AuthUser, sleep_id: i64) -> AppResult<()> {
    let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM sleep WHERE id = $1")
        .bind(sleep_id)
        .fetch_optional(&state.db)
        .await?;

    match owner {
        Some(owner_id) if can_access(auth_user, owner_id) => Ok(()),
        _ => Err(AppError::NotFound(format!(
            "Sleep entry {} not found",
            sleep_id
        ))),
    }
}

/// Flattened entries in the requested `sleep_start` range. Regular users
/// see their own data; admins see everyone's.
pub async fn list_sleep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<SleepRangeQuery>,
) -> AppResult<Json<Vec<FlattenedSleepView>>> {
    let mut filter = if auth_user.is_admin() {
        SleepFilter::default()
    } else {
        SleepFilter::by_user(auth_user.id)
    };
    if let Some(start) = query.start {
        filter.start_after = start;
    }
    if let Some(end) = query.end {
        filter.start_before = end;
    }

    let views = aggregator(&state).list_views(filter).await?;
    Ok(Json(views))
}

pub async fn get_sleep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(sleep_id): Path<i64>,
) -> AppResult<Json<FlattenedSleepView>> {
    // The view carries the owner, so no separate ownership fetch here.
    let view = aggregator(&state).view(sleep_id).await?;
    if !can_access(&auth_user, view.user_id) {
        return Err(AppError::NotFound(format!(
            "Sleep entry {} not found",
            sleep_id
        )));
    }
    Ok(Json(view))
}

pub async fn create_sleep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateSleepRequest>,
) -> AppResult<(StatusCode, Json<FlattenedSleepView>)> {
    let fields = NewSleep {
        sleep_start: body.sleep_start,
        sleep_end: body.sleep_end,
        sleep_goal: body.sleep_goal,
        user_id: auth_user.id,
    };

    let view = aggregator(&state)
        .create_with_moods(fields, body.moods)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_sleep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(sleep_id): Path<i64>,
    Json(body): Json<UpdateSleepRequest>,
) -> AppResult<Json<FlattenedSleepView>> {
    ensure_owned(&state, &auth_user, sleep_id).await?;

    let changes = SleepChanges {
        sleep_start: body.sleep_start,
        sleep_end: body.sleep_end,
        sleep_goal: body.sleep_goal,
    };

    let view = aggregator(&state)
        .update_with_moods(sleep_id, changes, body.moods)
        .await?;
    Ok(Json(view))
}

pub async fn delete_sleep(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(sleep_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    ensure_owned(&state, &auth_user, sleep_id).await?;

    aggregator(&state).delete(sleep_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
