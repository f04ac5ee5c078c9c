use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use coterie_types::api::ApplyRequest;
use coterie_types::events::DomainEvent;
use coterie_types::models::{
    Application, ApplicationStatus, Collaboration, CollaborationStatus, PaymentStatus, User,
    UserRole,
};

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_role};
use crate::{AppState, blocking, notify};

pub async fn apply(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&user, UserRole::Creator)?;

    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::validation(
            "application message must not be empty",
        ));
    }
    if req.ask_amount < 0.0 {
        return Err(ApiError::validation("ask amount must not be negative"));
    }

    let creator_id = user.id;
    let application = blocking(move || {
        let campaign = state
            .db
            .get_campaign(id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        let now = Utc::now();
        if !campaign.accepts_applications_at(now) {
            return Err(ApiError::validation(
                "campaign is not accepting applications",
            ));
        }

        let application = Application {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            creator_id,
            message,
            ask_amount: req.ask_amount,
            currency: req.currency.unwrap_or_else(|| campaign.currency.clone()),
            proposed_start_date: req.proposed_start_date,
            proposed_end_date: req.proposed_end_date,
            status: ApplicationStatus::Applied,
            applied_at: now,
            reviewed_at: None,
            updated_at: now,
        };
        if !state.db.create_application(&application)? {
            return Err(ApiError::conflict("already applied to this campaign"));
        }

        let creator_name = state
            .db
            .get_profile(creator_id)?
            .map(|p| p.display_name)
            .unwrap_or_else(|| "A creator".to_string());
        let event = DomainEvent::ApplicationReceived {
            application_id: application.id,
            campaign_id: campaign.id,
            campaign_title: campaign.title.clone(),
            brand_id: campaign.brand_id,
            creator_id,
            creator_name,
        };
        if let Err(e) = notify::fan_out(&state.db, &event) {
            warn!("notification fan-out failed: {e}");
        }

        Ok(application)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Application>>, ApiError> {
    require_role(&user, UserRole::Creator)?;

    let creator_id = user.id;
    let applications =
        blocking(move || Ok(state.db.list_applications_for_creator(creator_id)?)).await?;

    Ok(Json(applications))
}

pub async fn shortlist(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError> {
    review(state, user, id, ApplicationStatus::UnderReview).await
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError> {
    review(state, user, id, ApplicationStatus::Rejected).await
}

/// Acceptance flips the application and creates the collaboration in one
/// transaction; the response carries both.
pub async fn accept(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let user_id = user.id;
    let (application, collaboration) = blocking(move || {
        let application = state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))?;
        let campaign = state
            .db
            .get_campaign(application.campaign_id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the campaign's brand may review applications",
            ));
        }
        if application.status == ApplicationStatus::Accepted {
            return Err(ApiError::conflict("application is already accepted"));
        }
        if !application
            .status
            .can_transition_to(ApplicationStatus::Accepted)
        {
            return Err(ApiError::validation(format!(
                "cannot accept a {} application",
                application.status.as_str()
            )));
        }

        let now = Utc::now();
        // Initial agreed terms: the creator's ask and the campaign's
        // deliverables, renegotiable before signing.
        let collaboration = Collaboration {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            application_id: application.id,
            brand_id: campaign.brand_id,
            creator_id: application.creator_id,
            status: CollaborationStatus::Negotiating,
            agreed_rate: application.ask_amount,
            currency: application.currency.clone(),
            agreed_deliverables: campaign.deliverables.clone(),
            brand_signed_at: None,
            creator_signed_at: None,
            content_urls: vec![],
            content_submitted_at: None,
            content_approved_at: None,
            published_urls: vec![],
            content_published_at: None,
            payment_status: PaymentStatus::Pending,
            payment_released_at: None,
            rating_by_brand: None,
            feedback_by_brand: None,
            rating_by_creator: None,
            feedback_by_creator: None,
            status_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        if !state.db.accept_application(id, &collaboration, now)? {
            return Err(ApiError::conflict(
                "application changed concurrently, retry",
            ));
        }

        let event = DomainEvent::ApplicationStatusChanged {
            application_id: id,
            campaign_id: campaign.id,
            campaign_title: campaign.title.clone(),
            brand_id: campaign.brand_id,
            creator_id: application.creator_id,
            status: ApplicationStatus::Accepted,
        };
        if let Err(e) = notify::fan_out(&state.db, &event) {
            warn!("notification fan-out failed: {e}");
        }

        let application = state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))?;
        Ok((application, collaboration))
    })
    .await?;

    Ok(Json(json!({
        "application": application,
        "collaboration": collaboration,
    })))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError> {
    require_role(&user, UserRole::Creator)?;

    let user_id = user.id;
    let application = blocking(move || {
        let application = state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))?;
        if application.creator_id != user_id {
            return Err(ApiError::authorization("only the applicant may withdraw"));
        }
        if application.status == ApplicationStatus::Withdrawn {
            return Err(ApiError::conflict("application is already withdrawn"));
        }
        if !application
            .status
            .can_transition_to(ApplicationStatus::Withdrawn)
        {
            return Err(ApiError::validation(format!(
                "cannot withdraw a {} application",
                application.status.as_str()
            )));
        }

        let now = Utc::now();
        if !state.db.set_application_status(
            id,
            &[application.status],
            ApplicationStatus::Withdrawn,
            None,
            now,
        )? {
            return Err(ApiError::conflict(
                "application changed concurrently, retry",
            ));
        }

        if let Some(campaign) = state.db.get_campaign(application.campaign_id)? {
            let event = DomainEvent::ApplicationStatusChanged {
                application_id: id,
                campaign_id: campaign.id,
                campaign_title: campaign.title.clone(),
                brand_id: campaign.brand_id,
                creator_id: application.creator_id,
                status: ApplicationStatus::Withdrawn,
            };
            if let Err(e) = notify::fan_out(&state.db, &event) {
                warn!("notification fan-out failed: {e}");
            }
        }

        state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))
    })
    .await?;

    Ok(Json(application))
}

/// Brand-side review transitions (shortlist, reject) share one shape:
/// owner check, transition check, guarded flip, event.
async fn review(
    state: AppState,
    user: User,
    id: Uuid,
    target: ApplicationStatus,
) -> Result<Json<Application>, ApiError> {
    require_role(&user, UserRole::Brand)?;

    let user_id = user.id;
    let application = blocking(move || {
        let application = state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))?;
        let campaign = state
            .db
            .get_campaign(application.campaign_id)?
            .ok_or_else(|| ApiError::not_found("campaign"))?;
        if campaign.brand_id != user_id {
            return Err(ApiError::authorization(
                "only the campaign's brand may review applications",
            ));
        }
        if application.status == target {
            return Err(ApiError::conflict(format!(
                "application is already {}",
                target.as_str()
            )));
        }
        if !application.status.can_transition_to(target) {
            return Err(ApiError::validation(format!(
                "cannot move a {} application to {}",
                application.status.as_str(),
                target.as_str()
            )));
        }

        let now = Utc::now();
        if !state
            .db
            .set_application_status(id, &[application.status], target, Some(now), now)?
        {
            return Err(ApiError::conflict(
                "application changed concurrently, retry",
            ));
        }

        let event = DomainEvent::ApplicationStatusChanged {
            application_id: id,
            campaign_id: campaign.id,
            campaign_title: campaign.title.clone(),
            brand_id: campaign.brand_id,
            creator_id: application.creator_id,
            status: target,
        };
        if let Err(e) = notify::fan_out(&state.db, &event) {
            warn!("notification fan-out failed: {e}");
        }

        state
            .db
            .get_application(id)?
            .ok_or_else(|| ApiError::not_found("application"))
    })
    .await?;

    Ok(Json(application))
}
