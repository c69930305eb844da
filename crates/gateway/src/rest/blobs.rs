//! Blob upload and download endpoints

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::messages::FileRefBody;
use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// Headroom for base64 inflation and the surrounding JSON.
const ENVELOPE_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadBlobBody {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64 of the file bytes.
    pub data: String,
}

/// Create blob routes; request bodies are capped just above `max_upload_bytes` once encoded.
pub fn create_blob_routes(max_upload_bytes: usize) -> Router<Arc<GatewayState>> {
    let body_limit = max_upload_bytes
        .saturating_mul(4)
        .saturating_div(3)
        .saturating_add(ENVELOPE_OVERHEAD);

    Router::new()
        .route(
            "/blobs",
            post(upload_blob).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/blobs/:key", get(download_blob))
}

#[utoipa::path(
    post,
    path = "/blobs",
    tag = "Blobs",
    request_body = UploadBlobBody,
    responses(
        (status = 201, description = "Stored; use the returned reference in a file message", body = FileRefBody),
        (status = 400, description = "Empty, undecodable or oversized upload", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_blob(
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<UploadBlobBody>,
) -> GatewayResult<(StatusCode, Json<FileRefBody>)> {
    let bytes = STANDARD
        .decode(payload.data.as_bytes())
        .map_err(|error| GatewayError::InvalidRequest(format!("data is not valid base64: {error}")))?;

    if bytes.len() > state.max_upload_bytes {
        return Err(GatewayError::InvalidRequest(format!(
            "upload of {} bytes exceeds the {} byte limit",
            bytes.len(),
            state.max_upload_bytes
        )));
    }

    let file = state
        .blobs
        .put(&payload.file_name, &payload.content_type, Bytes::from(bytes))
        .await?;

    Ok((StatusCode::CREATED, Json(file.into())))
}

#[utoipa::path(
    get,
    path = "/blobs/{key}",
    tag = "Blobs",
    params(
        ("key" = String, Path, description = "Last segment of a blob URL")
    ),
    responses(
        (status = 200, description = "Raw file bytes"),
        (status = 404, description = "No such blob", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_blob(
    Path(key): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<impl IntoResponse> {
    let bytes = state
        .blobs
        .get(&key)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("blob {key}")))?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
