//! Entry point for every chat operation.
//!
//! Validates input, drives the registry and the store, and hands pushes to the presence
//! channel on a detached task. Durability lives in the store alone: once an append has
//! committed, nothing that happens on the push path can fail or undo the send.

use courier_database::{LastMessage, MessageFlags, Room, RoomMember, StoredMessage};
use tracing::{debug, info, warn};

use super::message_store::MessageStore;
use super::presence::PresenceChannel;
use super::reconstructor::MessageReconstructor;
use super::room_registry::RoomRegistry;
use crate::types::{
    ChatError, ChatResult, HideScope, MessageDescriptor, OutgoingContent, PresenceEvent,
    RoomListing, SendFirstMessageRequest, SendMessageRequest, SendOutcome,
};
use crate::utils::Validator;

#[derive(Clone)]
pub struct ChatGateway {
    store: MessageStore,
    registry: RoomRegistry,
    reconstructor: MessageReconstructor,
    presence: PresenceChannel,
}

impl ChatGateway {
    pub fn new(store: MessageStore, presence: PresenceChannel) -> Self {
        Self {
            registry: RoomRegistry::new(store.clone()),
            reconstructor: MessageReconstructor::new(store.clone()),
            store,
            presence,
        }
    }

    pub fn presence(&self) -> &PresenceChannel {
        &self.presence
    }

    /// Start (or continue) a conversation with someone, creating the room on first use.
    pub async fn send_first_message(
        &self,
        request: SendFirstMessageRequest,
    ) -> ChatResult<SendOutcome> {
        Validator::identity("senderIdentity", &request.sender_identity)?;
        Validator::display_name("senderName", &request.sender_name)?;
        Validator::identity("receiverIdentity", &request.receiver_identity)?;
        Validator::display_name("receiverName", &request.receiver_name)?;
        Validator::content(&request.content)?;

        let sender = RoomMember::new(request.sender_identity, request.sender_name);
        let receiver = RoomMember::new(request.receiver_identity, request.receiver_name);

        let (room, created) = self.registry.find_or_create(&sender, &receiver).await?;
        self.deliver(&room, &sender, request.content, created).await
    }

    /// Send into an existing room.
    pub async fn send_message(
        &self,
        room_id: &str,
        request: SendMessageRequest,
    ) -> ChatResult<SendOutcome> {
        Validator::identity("senderIdentity", &request.sender_identity)?;
        Validator::display_name("senderName", &request.sender_name)?;
        Validator::content(&request.content)?;

        let room = self.store.find_room(room_id).await?;
        if !room.is_member(&request.sender_identity) {
            warn!(room_id, sender = %request.sender_identity, "send rejected for non-member");
            return Err(ChatError::authorization(format!(
                "{} is not a member of room {}",
                request.sender_identity, room_id
            )));
        }

        let sender = RoomMember::new(request.sender_identity, request.sender_name);
        self.deliver(&room, &sender, request.content, false).await
    }

    pub async fn list_rooms(&self, identity: &str) -> ChatResult<Vec<RoomListing>> {
        Validator::identity("identity", identity)?;
        self.store.list_rooms_for(identity).await
    }

    pub async fn list_messages(&self, room_id: &str) -> ChatResult<Vec<MessageDescriptor>> {
        self.reconstructor.build(room_id).await
    }

    /// Like [`list_messages`](Self::list_messages), minus what `viewer` should not see.
    pub async fn list_messages_for(
        &self,
        room_id: &str,
        viewer: &str,
    ) -> ChatResult<Vec<MessageDescriptor>> {
        Validator::identity("viewer", viewer)?;
        self.reconstructor.build_for(room_id, viewer).await
    }

    /// Hide a message for its sender only, or for both members. Only the sender may do this.
    pub async fn hide_message(
        &self,
        room_id: &str,
        message_id: &str,
        requester: &str,
        scope: HideScope,
    ) -> ChatResult<MessageDescriptor> {
        Validator::identity("requester", requester)?;

        let room = self.store.find_room(room_id).await?;
        let mut message = self.store.find_message(&room, message_id).await?;
        if message.sender_identity != requester {
            return Err(ChatError::authorization(
                "only the sender can change a message's visibility",
            ));
        }

        let flags = match scope {
            HideScope::OnlyMe => MessageFlags {
                hidden_for_sender: true,
                ..message.flags
            },
            HideScope::Everyone => MessageFlags {
                hidden_for_everyone: true,
                ..message.flags
            },
        };
        self.store.set_message_flags(&message, flags).await?;
        message.flags = flags;

        info!(room_id, message_id, ?scope, "message hidden");
        Ok(MessageDescriptor::from_stored(
            &message,
            sender_name(&room, &message),
        ))
    }

    /// Append, refresh the room summary, then notify the other member.
    async fn deliver(
        &self,
        room: &Room,
        sender: &RoomMember,
        content: OutgoingContent,
        created: bool,
    ) -> ChatResult<SendOutcome> {
        let bodies = content.into_bodies();
        let stored = self
            .store
            .append_all(&room.public_id, &sender.identity, &bodies)
            .await?;

        let Some(last) = stored.last() else {
            return Err(ChatError::validation(
                "A message needs text or a file attachment",
            ));
        };

        let summary = LastMessage {
            text: last.body.summary().to_string(),
            sender_identity: sender.identity.clone(),
            variant: last.variant(),
            sent_at: last.sent_at,
        };
        // The summary is derived data; the messages are already durable.
        if let Err(error) = self.store.update_last_message(&room.public_id, &summary).await {
            warn!(room_id = %room.public_id, %error, "failed to refresh last message summary");
        }

        let messages: Vec<_> = stored
            .iter()
            .map(|message| MessageDescriptor::from_stored(message, &sender.display_name))
            .collect();

        if let Some(recipient) = room.other_member(&sender.identity) {
            self.notify(
                recipient.identity.clone(),
                PresenceEvent::NewMessageReceived {
                    room_id: room.public_id.clone(),
                    sender_identity: sender.identity.clone(),
                    message: MessageDescriptor::from_stored(last, &sender.display_name),
                    messages: if messages.len() > 1 {
                        messages.clone()
                    } else {
                        Vec::new()
                    },
                },
            );
        }

        Ok(SendOutcome {
            room_id: room.public_id.clone(),
            created,
            messages,
        })
    }

    /// Fire-and-forget; the caller never waits on delivery.
    fn notify(&self, recipient: String, event: PresenceEvent) {
        let presence = self.presence.clone();
        tokio::spawn(async move {
            let delivered = presence.push(&recipient, event).await;
            debug!(recipient = %recipient, delivered, "presence push finished");
        });
    }
}

fn sender_name<'a>(room: &'a Room, message: &'a StoredMessage) -> &'a str {
    room.member(&message.sender_identity)
        .map(|member| member.display_name.as_str())
        .unwrap_or(message.sender_identity.as_str())
}
