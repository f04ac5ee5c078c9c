//! HTTP surface of coterie: route table, shared state, and the handler
//! modules. Everything stateful lives in [`AppStateInner`]; handlers run
//! their rusqlite work on the blocking pool via [`blocking`].

pub mod applications;
pub mod auth;
pub mod campaigns;
pub mod collaborations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;
mod notify;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use coterie_auth::TokenService;
use coterie_db::Database;

use crate::error::ApiError;
use crate::middleware::require_auth;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    /// When set, signup creates active verified accounts and skips the
    /// email-verification token flow entirely.
    pub auto_verify: bool,
}

/// Builds the full application router. Auth endpoints and the health check
/// are public; everything else sits behind [`require_auth`].
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/verify", post(auth::verify))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/users/me", get(users::me))
        .route("/users/me", put(users::update_me))
        .route("/users/me", delete(users::deactivate_me))
        .route("/users/{id}", get(users::get_user))
        .route("/users", get(users::search))
        .route("/admin/users", get(users::admin_list))
        .route("/admin/users/{id}/status", put(users::admin_set_status))
        .route("/campaigns", post(campaigns::create))
        .route("/campaigns", get(campaigns::list))
        .route("/campaigns/{id}", get(campaigns::get))
        .route("/campaigns/{id}", put(campaigns::update))
        .route("/campaigns/{id}", delete(campaigns::remove))
        .route("/campaigns/{id}/publish", post(campaigns::publish))
        .route("/campaigns/{id}/complete", post(campaigns::complete))
        .route("/campaigns/{id}/cancel", post(campaigns::cancel))
        .route("/campaigns/{id}/applications", get(campaigns::list_applications))
        .route("/campaigns/{id}/apply", post(applications::apply))
        .route("/applications", get(applications::list_mine))
        .route("/applications/{id}/shortlist", post(applications::shortlist))
        .route("/applications/{id}/accept", post(applications::accept))
        .route("/applications/{id}/reject", post(applications::reject))
        .route("/applications/{id}/withdraw", post(applications::withdraw))
        .route("/collaborations", get(collaborations::list_mine))
        .route("/collaborations/{id}", get(collaborations::get))
        .route("/collaborations/{id}/sign", post(collaborations::sign))
        .route("/collaborations/{id}/confirm", post(collaborations::confirm))
        .route("/collaborations/{id}/start", post(collaborations::start))
        .route("/collaborations/{id}/submit-content", post(collaborations::submit_content))
        .route("/collaborations/{id}/approve-content", post(collaborations::approve_content))
        .route("/collaborations/{id}/publish-content", post(collaborations::publish_content))
        .route("/collaborations/{id}/complete", post(collaborations::complete))
        .route("/collaborations/{id}/release-payment", post(collaborations::release_payment))
        .route("/collaborations/{id}/cancel", post(collaborations::cancel))
        .route("/collaborations/{id}/dispute", post(collaborations::dispute))
        .route("/collaborations/{id}/rate", post(collaborations::rate))
        .route("/collaborations/{id}/resolve", post(collaborations::resolve))
        .route("/conversations", post(messages::open_conversation))
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/{id}/messages", get(messages::list_messages))
        .route("/conversations/{id}/messages", post(messages::send_message))
        .route("/conversations/{id}/read", post(messages::mark_read))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

/// Runs rusqlite work off the async runtime. The closure gets moved onto the
/// blocking pool, so callers clone the state handle in first.
pub(crate) async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))?
}
