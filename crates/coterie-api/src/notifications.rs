use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use coterie_types::api::{MAX_PAGE_SIZE, NotificationListQuery};
use coterie_types::models::Notification;

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_active};
use crate::{AppState, blocking};

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let notifications = blocking(move || {
        Ok(state
            .db
            .list_notifications(user_id, query.unread_only, query.skip, limit)?)
    })
    .await?;

    Ok(Json(notifications))
}

/// Owner-scoped: someone else's notification id comes back 404, same as an
/// unknown one.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    blocking(move || {
        if !state.db.mark_notification_read(id, user_id)? {
            return Err(ApiError::not_found("notification"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "notification marked read" })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let marked = blocking(move || Ok(state.db.mark_all_notifications_read(user_id)?)).await?;

    Ok(Json(json!({ "marked": marked })))
}
