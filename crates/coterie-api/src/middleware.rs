use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use coterie_auth::TokenKind;
use coterie_types::models::{User, UserRole, UserStatus};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// The authenticated account, loaded fresh from the database on every
/// request so status changes (suspension, deactivation) bite immediately
/// instead of waiting for the token to expire.
#[derive(Clone)]
pub struct AuthUser(pub User);

/// Verifies the bearer token, loads the account, and stashes it as a
/// request extension for the handlers behind it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::authentication("missing authorization header"))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::authentication("malformed authorization header"))?;

    let claims = state.tokens.verify(token, TokenKind::Access)?;

    let user = blocking(move || {
        state
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::authentication("user no longer exists"))
    })
    .await?;

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}

/// Suspended and deactivated accounts hold a valid token but cannot act.
pub fn require_active(user: &User) -> Result<(), ApiError> {
    match user.status {
        UserStatus::Inactive | UserStatus::Suspended => {
            Err(ApiError::validation("account is disabled"))
        }
        UserStatus::Active | UserStatus::PendingVerification => Ok(()),
    }
}

/// Marketplace actions additionally need a verified email address.
pub fn require_verified(user: &User) -> Result<(), ApiError> {
    require_active(user)?;
    if !user.verified {
        return Err(ApiError::validation("email not verified"));
    }
    Ok(())
}

/// Verified account with exactly the given role.
pub fn require_role(user: &User, role: UserRole) -> Result<(), ApiError> {
    require_verified(user)?;
    if user.role != role {
        return Err(ApiError::authorization(format!(
            "requires the {} role",
            role.as_str()
        )));
    }
    Ok(())
}
