//! Collaboration lifecycle handlers. The status checks here give precise
//! error bodies; the matching `WHERE status = ...` guards in the queries
//! are what make two racing requests safe, so a handler that passed its
//! checks can still lose and report a conflict.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use coterie_db::Database;
use coterie_types::api::{
    DisputeResolution, PublishContentRequest, RateRequest, ReasonRequest, ResolveDisputeRequest,
    SubmitContentRequest,
};
use coterie_types::events::DomainEvent;
use coterie_types::models::{
    CampaignStatus, Collaboration, CollaborationStatus, PaymentStatus, User, UserRole,
};

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_active, require_role, require_verified};
use crate::{AppState, blocking, notify};

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Collaboration>>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let collaborations =
        blocking(move || Ok(state.db.list_collaborations_for_user(user_id)?)).await?;

    Ok(Json(collaborations))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let admin = user.role == UserRole::Admin;
    let collaboration = blocking(move || {
        let collaboration = state
            .db
            .get_collaboration(id)?
            .ok_or_else(|| ApiError::not_found("collaboration"))?;
        if !collaboration.is_participant(user_id) && !admin {
            return Err(ApiError::not_found("collaboration"));
        }
        Ok(collaboration)
    })
    .await?;

    Ok(Json(collaboration))
}

/// Records the caller's contract signature, once. The status stays
/// `negotiating` until both sides have signed and someone confirms.
pub async fn sign(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.status != CollaborationStatus::Negotiating {
            return Err(ApiError::validation(
                "signatures are collected while negotiating",
            ));
        }

        let as_brand = collaboration.brand_id == user_id;
        let already = if as_brand {
            collaboration.brand_signed_at
        } else {
            collaboration.creator_signed_at
        };
        if already.is_some() {
            return Err(ApiError::conflict("already signed"));
        }

        if !state.db.sign_collaboration(id, as_brand, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::Negotiating,
            Some("contract signed"),
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.status == CollaborationStatus::Confirmed {
            return Err(ApiError::conflict("collaboration is already confirmed"));
        }
        if collaboration.status != CollaborationStatus::Negotiating {
            return Err(ApiError::validation(format!(
                "cannot confirm a {} collaboration",
                collaboration.status.as_str()
            )));
        }
        if !collaboration.both_signed() {
            return Err(ApiError::validation(
                "both parties must sign before confirming",
            ));
        }

        if !state.db.confirm_collaboration(id, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::Confirmed,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn start(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.status == CollaborationStatus::InProgress {
            return Err(ApiError::conflict("collaboration is already in progress"));
        }
        if collaboration.status != CollaborationStatus::Confirmed {
            return Err(ApiError::validation(format!(
                "cannot start a {} collaboration",
                collaboration.status.as_str()
            )));
        }

        let campaign = state
            .db
            .get_campaign(collaboration.campaign_id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        let now = Utc::now();
        if let Some(start_date) = campaign.start_date {
            if now < start_date {
                return Err(ApiError::validation(
                    "campaign has not reached its start date",
                ));
            }
        }

        if !state.db.start_collaboration(id, now)? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        // First collaboration to start takes the campaign off the published
        // board; later ones find it already in_progress, which is fine.
        if let Err(e) = state.db.set_campaign_status(
            campaign.id,
            &[CampaignStatus::Published],
            CampaignStatus::InProgress,
            now,
        ) {
            warn!("campaign in_progress flip failed: {e}");
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::InProgress,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn submit_content(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitContentRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let urls = clean_urls(req.content_urls);
    if urls.is_empty() {
        return Err(ApiError::validation("at least one content URL is required"));
    }

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.creator_id != user_id {
            return Err(ApiError::authorization("only the creator submits content"));
        }
        if collaboration.status == CollaborationStatus::ContentSubmitted {
            return Err(ApiError::conflict("content is already submitted"));
        }
        if collaboration.status != CollaborationStatus::InProgress {
            return Err(ApiError::validation(format!(
                "cannot submit content on a {} collaboration",
                collaboration.status.as_str()
            )));
        }

        if !state.db.submit_collaboration_content(id, &urls, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::ContentSubmitted,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn approve_content(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.brand_id != user_id {
            return Err(ApiError::authorization("only the brand approves content"));
        }
        if collaboration.status == CollaborationStatus::ContentApproved {
            return Err(ApiError::conflict("content is already approved"));
        }
        if collaboration.status != CollaborationStatus::ContentSubmitted {
            return Err(ApiError::validation(format!(
                "cannot approve content on a {} collaboration",
                collaboration.status.as_str()
            )));
        }

        if !state.db.approve_collaboration_content(id, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::ContentApproved,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn publish_content(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishContentRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let urls = clean_urls(req.published_urls);
    if urls.is_empty() {
        return Err(ApiError::validation(
            "at least one published URL is required",
        ));
    }

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.creator_id != user_id {
            return Err(ApiError::authorization("only the creator publishes content"));
        }
        if collaboration.status == CollaborationStatus::ContentPublished {
            return Err(ApiError::conflict("content is already published"));
        }
        if collaboration.status != CollaborationStatus::ContentApproved {
            return Err(ApiError::validation(format!(
                "cannot publish content on a {} collaboration",
                collaboration.status.as_str()
            )));
        }

        if !state
            .db
            .publish_collaboration_content(id, &urls, Utc::now())?
        {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::ContentPublished,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the brand completes a collaboration",
            ));
        }
        if collaboration.status == CollaborationStatus::Completed {
            return Err(ApiError::conflict("collaboration is already completed"));
        }
        if collaboration.status != CollaborationStatus::ContentPublished {
            return Err(ApiError::validation(format!(
                "cannot complete a {} collaboration",
                collaboration.status.as_str()
            )));
        }

        if !state.db.complete_collaboration(id, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::Completed,
            None,
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

/// Marks the payment released. Also completes the collaboration when the
/// brand releases straight from `content_published`.
pub async fn release_payment(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.brand_id != user_id {
            return Err(ApiError::authorization("only the brand releases payment"));
        }
        if collaboration.payment_status == PaymentStatus::Released {
            return Err(ApiError::conflict("payment is already released"));
        }
        if !matches!(
            collaboration.status,
            CollaborationStatus::ContentPublished | CollaborationStatus::Completed
        ) {
            return Err(ApiError::validation(
                "payment is released once content is published",
            ));
        }

        if !state.db.release_collaboration_payment(id, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::Completed,
            Some("payment released"),
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    escape(state, user, id, CollaborationStatus::Cancelled, req.reason).await
}

pub async fn dispute(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    escape(state, user, id, CollaborationStatus::Disputed, req.reason).await
}

pub async fn rate(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::validation("rating must be between 1 and 5"));
    }

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.status != CollaborationStatus::Completed {
            return Err(ApiError::validation(
                "collaborations are rated after completion",
            ));
        }

        let as_brand = collaboration.brand_id == user_id;
        let already = if as_brand {
            collaboration.rating_by_brand
        } else {
            collaboration.rating_by_creator
        };
        if already.is_some() {
            return Err(ApiError::conflict("already rated"));
        }

        if !state.db.rate_collaboration(
            id,
            as_brand,
            req.rating,
            req.feedback.as_deref(),
            Utc::now(),
        )? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            CollaborationStatus::Completed,
            Some(&format!("rated {}/5", req.rating)),
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

/// Admin ruling on a disputed collaboration.
pub async fn resolve(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveDisputeRequest>,
) -> Result<Json<Collaboration>, ApiError> {
    require_role(&user, UserRole::Admin)?;

    let target = match req.resolution {
        DisputeResolution::Resume => CollaborationStatus::InProgress,
        DisputeResolution::Cancel => CollaborationStatus::Cancelled,
    };

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = state
            .db
            .get_collaboration(id)?
            .ok_or_else(|| ApiError::not_found("collaboration"))?;
        if collaboration.status != CollaborationStatus::Disputed {
            return Err(ApiError::validation(
                "only disputed collaborations can be resolved",
            ));
        }

        if !state
            .db
            .resolve_collaboration_dispute(id, target, req.note.as_deref(), Utc::now())?
        {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(
            &state.db,
            &collaboration,
            user_id,
            target,
            req.note.as_deref(),
        );
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

/// Cancel and dispute share one shape: participant, required reason,
/// escape from any non-terminal state.
async fn escape(
    state: AppState,
    user: User,
    id: Uuid,
    target: CollaborationStatus,
    reason: String,
) -> Result<Json<Collaboration>, ApiError> {
    require_verified(&user)?;

    let reason = reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::validation("a reason is required"));
    }

    let user_id = user.id;
    let collaboration = blocking(move || {
        let collaboration = load_participant(&state.db, id, user_id)?;
        if collaboration.status == target {
            return Err(ApiError::conflict(format!(
                "collaboration is already {}",
                target.as_str()
            )));
        }
        if !collaboration.status.can_transition_to(target) {
            return Err(ApiError::validation(format!(
                "cannot move a {} collaboration to {}",
                collaboration.status.as_str(),
                target.as_str()
            )));
        }

        if !state.db.escape_collaboration(id, target, &reason, Utc::now())? {
            return Err(ApiError::conflict(
                "collaboration changed concurrently, retry",
            ));
        }

        emit(&state.db, &collaboration, user_id, target, Some(&reason));
        reload(&state.db, id)
    })
    .await?;

    Ok(Json(collaboration))
}

/// Participant-or-404: outsiders cannot learn that the id exists.
fn load_participant(db: &Database, id: Uuid, user_id: Uuid) -> Result<Collaboration, ApiError> {
    let collaboration = db
        .get_collaboration(id)?
        .ok_or_else(|| ApiError::not_found("collaboration"))?;
    if !collaboration.is_participant(user_id) {
        return Err(ApiError::not_found("collaboration"));
    }
    Ok(collaboration)
}

fn reload(db: &Database, id: Uuid) -> Result<Collaboration, ApiError> {
    db.get_collaboration(id)?
        .ok_or_else(|| ApiError::not_found("collaboration"))
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

/// Best effort: a failed fan-out is logged, the transition that already
/// landed is still reported as success.
fn emit(
    db: &Database,
    collaboration: &Collaboration,
    actor_id: Uuid,
    status: CollaborationStatus,
    note: Option<&str>,
) {
    let campaign_title = match db.get_campaign(collaboration.campaign_id) {
        Ok(Some(campaign)) => campaign.title,
        Ok(None) => String::new(),
        Err(e) => {
            warn!("notification fan-out failed: {e}");
            return;
        }
    };

    let event = DomainEvent::CollaborationUpdated {
        collaboration_id: collaboration.id,
        campaign_title,
        brand_id: collaboration.brand_id,
        creator_id: collaboration.creator_id,
        actor_id,
        status,
        note: note.map(str::to_string),
    };
    if let Err(e) = notify::fan_out(db, &event) {
        warn!("notification fan-out failed: {e}");
    }
}
