//! # Courier Gateway Crate
//!
//! HTTP and websocket surface for Courier direct messaging. Every handler is a thin
//! translation between JSON bodies and [`courier_chats::ChatGateway`] calls.
//!
//! ## Architecture
//!
//! - **REST**: rooms, messages, blobs and health, documented with OpenAPI
//! - **WebSocket**: `/ws` push channel backed by the presence registry
//! - **State**: the chat gateway, blob store and upload limit shared by all handlers
//! - **Middleware**: CORS and request logging
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use courier_chats::{ChatGateway, LocalBlobStore, MessageStore, PresenceChannel};
//! use courier_gateway::{create_router, GatewayState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = courier_database::initialize_database(&courier_config::DatabaseConfig::default()).await?;
//! let chats = ChatGateway::new(MessageStore::new(pool), PresenceChannel::new(64));
//! let blobs = Arc::new(LocalBlobStore::new("data/blobs", "http://127.0.0.1:7070/blobs"));
//! let app = create_router(GatewayState::new(chats, blobs, 10 * 1024 * 1024));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use middleware::logging_middleware;
pub use state::GatewayState;

pub use create_router as build_router;

use std::sync::Arc;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    let arc_state = Arc::new(state);

    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_rest_routes(max_upload_bytes).with_state(arc_state.clone()))
        .merge(websocket::create_websocket_routes().with_state(arc_state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    #[cfg(debug_assertions)]
    {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}

#[cfg(debug_assertions)]
#[derive(OpenApi)]
#[openapi(
    paths(
        rest::health::health_check,
        rest::rooms::send_first_message,
        rest::rooms::list_rooms,
        rest::messages::list_messages,
        rest::messages::send_message,
        rest::messages::update_visibility,
        rest::blobs::upload_blob,
        rest::blobs::download_blob,
    ),
    components(
        schemas(
            error::ErrorResponse,
            rest::health::HealthResponse,
            rest::rooms::FirstMessageBody,
            rest::rooms::FirstMessageResponse,
            rest::rooms::MemberResponse,
            rest::rooms::LastMessageResponse,
            rest::rooms::RoomResponse,
            rest::messages::FileRefBody,
            rest::messages::MessageResponse,
            rest::messages::SendMessageBody,
            rest::messages::SendMessageResponse,
            rest::messages::VisibilityScope,
            rest::messages::VisibilityBody,
            rest::blobs::UploadBlobBody,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Rooms", description = "Two-party rooms and first messages"),
        (name = "Messages", description = "Room timelines and sending"),
        (name = "Blobs", description = "File uploads referenced by file messages"),
    )
)]
struct ApiDoc;
