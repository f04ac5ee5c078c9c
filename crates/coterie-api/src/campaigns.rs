use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use coterie_types::api::{
    CampaignListQuery, CampaignListResponse, CreateCampaignRequest, MAX_PAGE_SIZE,
    UpdateCampaignRequest,
};
use coterie_types::events::DomainEvent;
use coterie_types::models::{Application, Campaign, CampaignStatus, User, UserRole};

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_active, require_role};
use crate::{AppState, blocking, notify};

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    if req.budget_min < 0.0 || req.budget_max < req.budget_min {
        return Err(ApiError::validation("budget range is invalid"));
    }
    if let (Some(start), Some(end)) = (req.start_date, req.end_date) {
        if end < start {
            return Err(ApiError::validation("end date precedes start date"));
        }
    }

    let now = Utc::now();
    let campaign = Campaign {
        id: Uuid::new_v4(),
        brand_id: user.id,
        title,
        description: req.description,
        brief: req.brief,
        budget_min: req.budget_min,
        budget_max: req.budget_max,
        currency: req.currency.unwrap_or_else(|| "USD".to_string()),
        target_audience: req.target_audience.unwrap_or_default(),
        platforms: req.platforms.unwrap_or_default(),
        deliverables: req.deliverables.unwrap_or_default(),
        application_deadline: req.application_deadline,
        start_date: req.start_date,
        end_date: req.end_date,
        status: CampaignStatus::Draft,
        tags: req.tags.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let campaign = blocking(move || {
        state.db.insert_campaign(&campaign)?;
        Ok(campaign)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<CampaignListQuery>,
) -> Result<Json<CampaignListResponse>, ApiError> {
    require_active(&user)?;

    let skip = query.skip;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    // Brands browse their own catalogue across all statuses, admins see
    // everything, creators only the published board.
    let (brand_id, status) = match user.role {
        UserRole::Brand => (Some(user.id), query.status),
        UserRole::Admin => (None, query.status),
        UserRole::Creator => match query.status {
            None | Some(CampaignStatus::Published) => (None, Some(CampaignStatus::Published)),
            // Asking for a status creators may not browse yields an empty
            // page rather than an error.
            Some(_) => return Ok(Json(CampaignListResponse::new(vec![], 0, skip, limit))),
        },
    };

    let search = query.search;
    let (campaigns, total) = blocking(move || {
        Ok(state
            .db
            .list_campaigns(brand_id, status, search.as_deref(), skip, limit)?)
    })
    .await?;

    Ok(Json(CampaignListResponse::new(
        campaigns,
        total as i64,
        skip,
        limit,
    )))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let role = user.role;
    let campaign = blocking(move || {
        let campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;

        // Drafts are private to their owner; absent and invisible look alike.
        let visible = campaign.brand_id == user_id
            || role == UserRole::Admin
            || campaign.status != CampaignStatus::Draft;
        if !visible {
            return Err(ApiError::not_found("campaign"));
        }
        Ok(campaign)
    })
    .await?;

    Ok(Json(campaign))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    require_role(&user, UserRole::Brand)?;
    if matches!(&req.title, Some(t) if t.trim().is_empty()) {
        return Err(ApiError::validation("title must not be empty"));
    }

    let user_id = user.id;
    let campaign = blocking(move || {
        let mut campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the owning brand may update a campaign",
            ));
        }
        if campaign.status.is_terminal() {
            return Err(ApiError::validation("campaign can no longer be edited"));
        }

        let expected = campaign.status;
        if let Some(v) = req.title {
            campaign.title = v.trim().to_string();
        }
        if let Some(v) = req.description {
            campaign.description = v;
        }
        if let Some(v) = req.brief {
            campaign.brief = Some(v);
        }
        if let Some(v) = req.budget_min {
            campaign.budget_min = v;
        }
        if let Some(v) = req.budget_max {
            campaign.budget_max = v;
        }
        if let Some(v) = req.currency {
            campaign.currency = v;
        }
        if let Some(v) = req.target_audience {
            campaign.target_audience = v;
        }
        if let Some(v) = req.platforms {
            campaign.platforms = v;
        }
        if let Some(v) = req.deliverables {
            campaign.deliverables = v;
        }
        if let Some(v) = req.application_deadline {
            campaign.application_deadline = Some(v);
        }
        if let Some(v) = req.start_date {
            campaign.start_date = Some(v);
        }
        if let Some(v) = req.end_date {
            campaign.end_date = Some(v);
        }
        if let Some(v) = req.tags {
            campaign.tags = v;
        }

        if campaign.budget_min < 0.0 || campaign.budget_max < campaign.budget_min {
            return Err(ApiError::validation("budget range is invalid"));
        }
        if let (Some(start), Some(end)) = (campaign.start_date, campaign.end_date) {
            if end < start {
                return Err(ApiError::validation("end date precedes start date"));
            }
        }
        campaign.updated_at = Utc::now();

        // Guarded on the status we loaded: a concurrent publish/cancel wins
        // and this update reports the conflict instead of clobbering it.
        if !state.db.update_campaign(&campaign, expected)? {
            return Err(ApiError::conflict("campaign changed concurrently, retry"));
        }
        Ok(campaign)
    })
    .await?;

    Ok(Json(campaign))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let user_id = user.id;
    blocking(move || {
        let campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the owning brand may delete a campaign",
            ));
        }
        if campaign.status != CampaignStatus::Draft {
            return Err(ApiError::validation(
                "only draft campaigns can be deleted; cancel instead",
            ));
        }
        if state.db.count_applications_for_campaign(id)? > 0 {
            return Err(ApiError::validation(
                "campaign already has applications; cancel instead",
            ));
        }
        if !state.db.delete_draft_campaign(id)? {
            return Err(ApiError::conflict("campaign changed concurrently, retry"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "campaign deleted" })))
}

pub async fn publish(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    transition(state, user, id, CampaignStatus::Published).await
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    transition(state, user, id, CampaignStatus::Completed).await
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    transition(state, user, id, CampaignStatus::Cancelled).await
}

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Application>>, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let user_id = user.id;
    let applications = blocking(move || {
        let campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the owning brand may list applications",
            ));
        }
        Ok(state.db.list_applications_for_campaign(id)?)
    })
    .await?;

    Ok(Json(applications))
}

/// Owner-gated status change shared by publish/complete/cancel. Repeating
/// the current status is a conflict; an unreachable status is a validation
/// error; losing a race to another writer is a conflict.
async fn transition(
    state: AppState,
    user: User,
    id: Uuid,
    target: CampaignStatus,
) -> Result<Json<Campaign>, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let user_id = user.id;
    let campaign = blocking(move || {
        let campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the owning brand may change campaign status",
            ));
        }
        if campaign.status == target {
            return Err(ApiError::conflict(format!(
                "campaign is already {}",
                target.as_str()
            )));
        }
        if !campaign.status.can_transition_to(target) {
            return Err(ApiError::validation(format!(
                "cannot move a {} campaign to {}",
                campaign.status.as_str(),
                target.as_str()
            )));
        }

        if !state
            .db
            .set_campaign_status(id, &[campaign.status], target, Utc::now())?
        {
            return Err(ApiError::conflict(
                "campaign status changed concurrently, retry",
            ));
        }

        let event = DomainEvent::CampaignStatusChanged {
            campaign_id: id,
            campaign_title: campaign.title.clone(),
            brand_id: campaign.brand_id,
            status: target,
        };
        if let Err(e) = notify::fan_out(&state.db, &event) {
            warn!("notification fan-out failed: {e}");
        }

        state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))
    })
    .await?;

    Ok(Json(campaign))
}
