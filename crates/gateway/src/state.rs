//! Shared application state for the gateway

use std::sync::Arc;

use courier_chats::{BlobStore, ChatGateway, PresenceChannel};

/// Everything a handler can reach. Cheap to clone; the router holds it in an `Arc`.
#[derive(Clone)]
pub struct GatewayState {
    /// Chat operations and the presence channel they push through
    pub chats: ChatGateway,
    /// Where uploaded file bytes go
    pub blobs: Arc<dyn BlobStore>,
    /// Largest decoded upload accepted by `POST /blobs`
    pub max_upload_bytes: usize,
}

impl GatewayState {
    pub fn new(chats: ChatGateway, blobs: Arc<dyn BlobStore>, max_upload_bytes: usize) -> Self {
        Self {
            chats,
            blobs,
            max_upload_bytes,
        }
    }

    pub fn chats(&self) -> &ChatGateway {
        &self.chats
    }

    pub fn presence(&self) -> &PresenceChannel {
        self.chats.presence()
    }
}
