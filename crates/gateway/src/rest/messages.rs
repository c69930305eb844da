//! Message REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use courier_chats::{HideScope, MessageDescriptor, OutgoingContent, SendMessageRequest};
use courier_database::{FileRef, MediaKind};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRefBody {
    pub name: String,
    pub url: String,
    /// One of `image`, `video`, `audio`, `document`.
    pub media_kind: String,
}

impl From<FileRef> for FileRefBody {
    fn from(file: FileRef) -> Self {
        Self {
            name: file.name,
            url: file.url,
            media_kind: file.media_kind.as_str().to_string(),
        }
    }
}

impl From<FileRefBody> for FileRef {
    fn from(body: FileRefBody) -> Self {
        Self {
            media_kind: MediaKind::from(body.media_kind.as_str()),
            name: body.name,
            url: body.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub sender_identity: String,
    pub sender_name: String,
    /// `text` or `file`
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<FileRefBody>,
    pub timestamp: String,
    pub seq: i64,
    pub hidden_for_sender: bool,
    pub hidden_for_everyone: bool,
}

impl From<MessageDescriptor> for MessageResponse {
    fn from(message: MessageDescriptor) -> Self {
        Self {
            id: message.id,
            sender_identity: message.sender_identity,
            sender_name: message.sender_name,
            variant: message.variant.as_str().to_string(),
            text: message.text,
            file_ref: message.file_ref.map(FileRefBody::from),
            timestamp: format_time(message.timestamp),
            seq: message.seq,
            hidden_for_sender: message.hidden_for_sender,
            hidden_for_everyone: message.hidden_for_everyone,
        }
    }
}

pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    courier_database::types::format_timestamp(at)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub sender_identity: String,
    pub sender_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<FileRefBody>,
}

impl From<SendMessageBody> for SendMessageRequest {
    fn from(body: SendMessageBody) -> Self {
        Self {
            sender_identity: body.sender_identity,
            sender_name: body.sender_name,
            content: OutgoingContent {
                text: body.text,
                file: body.file.map(FileRef::from),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    /// The last stored message.
    pub message: MessageResponse,
    /// Every stored message in append order; a text and file send stores the file first.
    pub messages: Vec<MessageResponse>,
}

impl SendMessageResponse {
    pub(crate) fn from_stored(stored: Vec<MessageDescriptor>) -> GatewayResult<Self> {
        let messages: Vec<MessageResponse> =
            stored.into_iter().map(MessageResponse::from).collect();
        let message = messages
            .last()
            .cloned()
            .ok_or_else(|| GatewayError::InternalError("send stored no message".to_string()))?;

        Ok(Self { message, messages })
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListMessagesQuery {
    /// Drop messages hidden from this identity; must be a room member.
    pub viewer: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityScope {
    #[serde(rename = "self")]
    OnlyMe,
    Everyone,
}

impl From<VisibilityScope> for HideScope {
    fn from(scope: VisibilityScope) -> Self {
        match scope {
            VisibilityScope::OnlyMe => HideScope::OnlyMe,
            VisibilityScope::Everyone => HideScope::Everyone,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityBody {
    /// Must be the message's sender.
    pub requester: String,
    pub scope: VisibilityScope,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/rooms/:room_id/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/rooms/:room_id/messages/:message_id/visibility",
            patch(update_visibility),
        )
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}/messages",
    tag = "Messages",
    params(
        ("room_id" = String, Path, description = "Room public ID"),
        ListMessagesQuery
    ),
    responses(
        (status = 200, description = "Room timeline, oldest first", body = Vec<MessageResponse>),
        (status = 403, description = "Viewer is not a member", body = crate::error::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_messages(
    Path(room_id): Path<String>,
    Query(params): Query<ListMessagesQuery>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let messages = match params.viewer.as_deref() {
        Some(viewer) => state.chats().list_messages_for(&room_id, viewer).await?,
        None => state.chats().list_messages(&room_id).await?,
    };

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/rooms/{room_id}/messages",
    tag = "Messages",
    params(
        ("room_id" = String, Path, description = "Room public ID")
    ),
    request_body = SendMessageBody,
    responses(
        (status = 201, description = "Messages stored", body = SendMessageResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Sender is not a member", body = crate::error::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    Path(room_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<SendMessageBody>,
) -> GatewayResult<(StatusCode, Json<SendMessageResponse>)> {
    let outcome = state
        .chats()
        .send_message(&room_id, payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse::from_stored(outcome.messages)?),
    ))
}

#[utoipa::path(
    patch,
    path = "/rooms/{room_id}/messages/{message_id}/visibility",
    tag = "Messages",
    params(
        ("room_id" = String, Path, description = "Room public ID"),
        ("message_id" = String, Path, description = "Message public ID")
    ),
    request_body = VisibilityBody,
    responses(
        (status = 200, description = "Updated message", body = MessageResponse),
        (status = 403, description = "Requester did not send the message", body = crate::error::ErrorResponse),
        (status = 404, description = "Room or message not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_visibility(
    Path((room_id, message_id)): Path<(String, String)>,
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<VisibilityBody>,
) -> GatewayResult<Json<MessageResponse>> {
    let message = state
        .chats()
        .hide_message(&room_id, &message_id, &payload.requester, payload.scope.into())
        .await?;

    Ok(Json(message.into()))
}
