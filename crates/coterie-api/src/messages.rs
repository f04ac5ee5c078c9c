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

use coterie_db::Database;
use coterie_types::api::{MAX_PAGE_SIZE, OpenConversationRequest, Pagination, SendMessageRequest};
use coterie_types::events::DomainEvent;
use coterie_types::models::{Conversation, Message};

use crate::error::ApiError;
use crate::middleware::{AuthUser, require_active};
use crate::{AppState, blocking, notify};

/// Finds or creates the thread for the pair: 200 with the existing
/// conversation, 201 for a fresh one.
pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    if req.user_id == user.id {
        return Err(ApiError::validation(
            "cannot open a conversation with yourself",
        ));
    }

    let user_id = user.id;
    let (conversation, created) = blocking(move || {
        let peer = state
            .db
            .get_user_by_id(req.user_id)?
            .ok_or_else(|| ApiError::not_found("user"))?;
        if !peer.is_active() {
            return Err(ApiError::not_found("user"));
        }
        Ok(state.db.open_conversation(user_id, peer.id, Utc::now())?)
    })
    .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(conversation)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let conversations =
        blocking(move || Ok(state.db.list_conversations_for_user(user_id)?)).await?;

    Ok(Json(conversations))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::validation("message body must not be empty"));
    }

    let user_id = user.id;
    let message = blocking(move || {
        let conversation = load_participant(&state.db, id, user_id)?;
        let recipient = conversation
            .peer_of(user_id)
            .ok_or_else(|| ApiError::not_found("conversation"))?;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            sender_id: user_id,
            body,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        state.db.insert_message(&message)?;

        let sender_name = state
            .db
            .get_profile(user_id)?
            .map(|p| p.display_name)
            .unwrap_or_else(|| "Someone".to_string());
        let event = DomainEvent::MessageSent {
            conversation_id: conversation.id,
            message_id: message.id,
            sender_id: user_id,
            sender_name,
            recipient_id: recipient,
        };
        if let Err(e) = notify::fan_out(&state.db, &event) {
            warn!("notification fan-out failed: {e}");
        }

        Ok(message)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let limit = page.limit.clamp(1, MAX_PAGE_SIZE);
    let messages = blocking(move || {
        load_participant(&state.db, id, user_id)?;
        Ok(state.db.list_messages(id, page.skip, limit)?)
    })
    .await?;

    Ok(Json(messages))
}

/// Marks everything the peer sent in this conversation as read.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_active(&user)?;

    let user_id = user.id;
    let marked = blocking(move || {
        load_participant(&state.db, id, user_id)?;
        Ok(state.db.mark_messages_read(id, user_id, Utc::now())?)
    })
    .await?;

    Ok(Json(json!({ "marked": marked })))
}

fn load_participant(db: &Database, id: Uuid, user_id: Uuid) -> Result<Conversation, ApiError> {
    let conversation = db
        .get_conversation(id)?
        .ok_or_else(|| ApiError::not_found("conversation"))?;
    if !conversation.is_participant(user_id) {
        return Err(ApiError::not_found("conversation"));
    }
    Ok(conversation)
}
