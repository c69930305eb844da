//! Room REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use courier_chats::{OutgoingContent, RoomListing, SendFirstMessageRequest};
use courier_database::{FileRef, LastMessage, RoomMember};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::messages::{format_time, FileRefBody, MessageResponse, SendMessageResponse};
use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirstMessageBody {
    pub sender_identity: String,
    pub sender_name: String,
    pub receiver_identity: String,
    pub receiver_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<FileRefBody>,
}

impl From<FirstMessageBody> for SendFirstMessageRequest {
    fn from(body: FirstMessageBody) -> Self {
        Self {
            sender_identity: body.sender_identity,
            sender_name: body.sender_name,
            receiver_identity: body.receiver_identity,
            receiver_name: body.receiver_name,
            content: OutgoingContent {
                text: body.text,
                file: body.file.map(FileRef::from),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirstMessageResponse {
    pub room_id: String,
    /// `true` when this request created the room.
    pub created: bool,
    /// The last stored message.
    pub message: MessageResponse,
    /// Every stored message in append order.
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub identity: String,
    pub display_name: String,
}

impl From<RoomMember> for MemberResponse {
    fn from(member: RoomMember) -> Self {
        Self {
            identity: member.identity,
            display_name: member.display_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageResponse {
    pub text: String,
    pub sender_identity: String,
    pub variant: String,
    pub sent_at: String,
}

impl From<LastMessage> for LastMessageResponse {
    fn from(last: LastMessage) -> Self {
        Self {
            text: last.text,
            sender_identity: last.sender_identity,
            variant: last.variant.as_str().to_string(),
            sent_at: format_time(last.sent_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub room_id: String,
    pub other_member: MemberResponse,
    pub last_message: Option<LastMessageResponse>,
    pub updated_at: String,
}

impl From<RoomListing> for RoomResponse {
    fn from(listing: RoomListing) -> Self {
        Self {
            room_id: listing.room_id,
            other_member: listing.other_member.into(),
            last_message: listing.last_message.map(LastMessageResponse::from),
            updated_at: format_time(listing.updated_at),
        }
    }
}

/// Create room routes
pub fn create_room_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/rooms/first-message", post(send_first_message))
        .route("/users/:identity/rooms", get(list_rooms))
}

#[utoipa::path(
    post,
    path = "/rooms/first-message",
    tag = "Rooms",
    request_body = FirstMessageBody,
    responses(
        (status = 201, description = "Message stored, room created if needed", body = FirstMessageResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_first_message(
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<FirstMessageBody>,
) -> GatewayResult<(StatusCode, Json<FirstMessageResponse>)> {
    let outcome = state.chats().send_first_message(payload.into()).await?;
    let SendMessageResponse { message, messages } =
        SendMessageResponse::from_stored(outcome.messages)?;

    Ok((
        StatusCode::CREATED,
        Json(FirstMessageResponse {
            room_id: outcome.room_id,
            created: outcome.created,
            message,
            messages,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{identity}/rooms",
    tag = "Rooms",
    params(
        ("identity" = String, Path, description = "Member identity")
    ),
    responses(
        (status = 200, description = "Rooms the identity belongs to, most recent first", body = Vec<RoomResponse>),
        (status = 400, description = "Invalid identity", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_rooms(
    Path(identity): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<RoomResponse>>> {
    let rooms = state.chats().list_rooms(&identity).await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}
