//! WebSocket endpoints for the gateway

pub mod presence;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(presence::presence_websocket_handler))
}

pub use presence::*;
