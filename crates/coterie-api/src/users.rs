use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use coterie_types::api::{
    AdminUserListQuery, MAX_PAGE_SIZE, MeResponse, PublicUserResponse, SetUserStatusRequest,
    UpdateProfileRequest, UserResponse, UserSearchQuery,
};
use coterie_types::models::{Profile, UserRole, UserStatus};

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_active, require_role};
use crate::{AppState, blocking};

pub async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let profile = blocking(move || {
        state
            .db
            .get_profile(user_id)?
            .ok_or_else(|| ApiError::not_found("profile"))
    })
    .await?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
        profile,
    }))
}

/// Applies only the fields present in the request; account fields (email,
/// role, status) are not reachable from here.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    require_active(&user)?;
    if matches!(&req.display_name, Some(name) if name.trim().is_empty()) {
        return Err(ApiError::validation("display name must not be empty"));
    }

    let user_id = user.id;
    let profile = blocking(move || {
        let mut profile = state
            .db
            .get_profile(user_id)?
            .ok_or_else(|| ApiError::not_found("profile"))?;

        if let Some(v) = req.display_name {
            profile.display_name = v.trim().to_string();
        }
        if let Some(v) = req.bio {
            profile.bio = Some(v);
        }
        if let Some(v) = req.location {
            profile.location = Some(v);
        }
        if let Some(v) = req.avatar_url {
            profile.avatar_url = Some(v);
        }
        if let Some(v) = req.website_url {
            profile.website_url = Some(v);
        }
        if let Some(v) = req.niches {
            profile.niches = v;
        }
        if let Some(v) = req.languages {
            profile.languages = v;
        }
        if let Some(v) = req.platforms {
            profile.platforms = v;
        }
        if let Some(v) = req.rate_card {
            profile.rate_card = v;
        }
        if let Some(v) = req.portfolio_urls {
            profile.portfolio_urls = v;
        }
        if let Some(v) = req.company_name {
            profile.company_name = Some(v);
        }
        if let Some(v) = req.industry {
            profile.industry = Some(v);
        }
        profile.updated_at = Utc::now();

        state.db.save_profile(&profile)?;
        Ok(profile)
    })
    .await?;

    Ok(Json(profile))
}

/// Soft delete: the account flips to `inactive` and disappears from public
/// lookups, but rows referencing it stay intact.
pub async fn deactivate_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    blocking(move || {
        if !state
            .db
            .set_user_status(user_id, UserStatus::Inactive, Utc::now())?
        {
            return Err(ApiError::not_found("user"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "account deactivated" })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    require_active(&caller)?;

    let response = blocking(move || {
        let user = state
            .db
            .get_user_by_id(id)?
            .ok_or_else(|| ApiError::not_found("user"))?;
        if !user.is_active() {
            // Deactivated and suspended accounts are invisible, same as absent.
            return Err(ApiError::not_found("user"));
        }
        let profile = state
            .db
            .get_profile(id)?
            .ok_or_else(|| ApiError::not_found("user"))?;
        Ok(PublicUserResponse::from_parts(&user, profile))
    })
    .await?;

    Ok(Json(response))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    require_active(&caller)?;

    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let results = blocking(move || {
        Ok(state
            .db
            .search_users(query.q.as_deref(), query.role, query.skip, limit)?)
    })
    .await?;

    Ok(Json(
        results
            .into_iter()
            .map(|(user, profile)| PublicUserResponse::from_parts(&user, profile))
            .collect(),
    ))
}

pub async fn admin_list(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<AdminUserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_role(&caller, UserRole::Admin)?;

    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let users =
        blocking(move || Ok(state.db.list_users(query.status, query.skip, limit)?)).await?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn admin_set_status(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetUserStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_role(&caller, UserRole::Admin)?;

    let user = blocking(move || {
        if !state.db.set_user_status(id, req.status, Utc::now())? {
            return Err(ApiError::not_found("user"));
        }
        state
            .db
            .get_user_by_id(id)?
            .ok_or_else(|| ApiError::not_found("user"))
    })
    .await?;

    Ok(Json(UserResponse::from(&user)))
}
