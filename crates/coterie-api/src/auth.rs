use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use coterie_auth::{TokenKind, hash_password, verify_password};
use coterie_types::api::{
    LoginRequest, RefreshRequest, SignupRequest, TokenResponse, UserResponse, VerifyEmailRequest,
};
use coterie_types::models::{PlatformStats, Profile, RateCard, User, UserRole, UserStatus};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::{AppState, AppStateInner, blocking};

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::validation("invalid email address"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }
    if req.role == UserRole::Admin {
        return Err(ApiError::validation(
            "admin accounts cannot be self-registered",
        ));
    }
    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(ApiError::validation("display name must not be empty"));
    }

    let user = blocking(move || {
        if state.db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::conflict("email is already registered"));
        }

        let password_hash = hash_password(&req.password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role: req.role,
            status: if state.auto_verify {
                UserStatus::Active
            } else {
                UserStatus::PendingVerification
            },
            verified: state.auto_verify,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        let profile = Profile {
            user_id: user.id,
            display_name,
            bio: None,
            location: None,
            avatar_url: None,
            website_url: None,
            niches: vec![],
            languages: vec![],
            platforms: PlatformStats::new(),
            rate_card: RateCard::new(),
            portfolio_urls: vec![],
            company_name: None,
            industry: None,
            updated_at: now,
        };
        // Without auto-verify the account stays pending until the token
        // (normally delivered by mail) comes back through /auth/verify.
        let token = (!state.auto_verify).then(|| Uuid::new_v4().to_string());

        if !state.db.create_user(&user, &profile, token.as_deref())? {
            return Err(ApiError::conflict("email is already registered"));
        }
        Ok(user)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let state_for_db = state.clone();
    let user = blocking(move || {
        let user = state_for_db
            .db
            .get_user_by_email(&email)?
            .ok_or_else(|| ApiError::authentication("invalid credentials"))?;

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(ApiError::authentication("invalid credentials"));
        }
        match user.status {
            UserStatus::Inactive | UserStatus::Suspended => {
                return Err(ApiError::authentication("account is disabled"));
            }
            UserStatus::Active | UserStatus::PendingVerification => {}
        }

        state_for_db.db.touch_last_login(user.id, Utc::now())?;
        Ok(user)
    })
    .await?;

    Ok(Json(token_pair(&state, &user)?))
}

/// Rotation: a valid refresh token buys a brand-new pair for the same
/// subject. The old pair is not revoked (stateless tokens).
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let claims = state.tokens.verify(&req.refresh_token, TokenKind::Refresh)?;

    let state_for_db = state.clone();
    let user = blocking(move || {
        let user = state_for_db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::authentication("user no longer exists"))?;
        match user.status {
            UserStatus::Inactive | UserStatus::Suspended => {
                Err(ApiError::authentication("account is disabled"))
            }
            UserStatus::Active | UserStatus::PendingVerification => Ok(user),
        }
    })
    .await?;

    Ok(Json(token_pair(&state, &user)?))
}

pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = blocking(move || {
        state
            .db
            .consume_verification_token(&req.token, Utc::now())?
            .ok_or_else(|| ApiError::validation("invalid or already-used verification token"))
    })
    .await?;

    Ok(Json(UserResponse::from(&user)))
}

pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Tokens are stateless, so there is nothing to revoke server-side.
/// Clients drop their copy; the endpoint exists so they have a uniform
/// logout call.
pub async fn logout(Extension(AuthUser(_user)): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({ "message": "logged out" }))
}

fn token_pair(state: &AppStateInner, user: &User) -> Result<TokenResponse, ApiError> {
    Ok(TokenResponse {
        access_token: state.tokens.issue_access(user.id, &user.email)?,
        refresh_token: state.tokens.issue_refresh(user.id)?,
        token_type: "bearer".to_string(),
        expires_in: state.tokens.access_ttl_seconds(),
    })
}
