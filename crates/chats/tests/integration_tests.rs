//! End-to-end behaviour of the chat gateway over a real SQLite database.

use std::time::Duration;

use courier_chats::{
    ChatError, ChatGateway, HideScope, MessageStore, OutgoingContent, PresenceChannel,
    PresenceEvent, SendFirstMessageRequest, SendMessageRequest, TemporaryRoom,
};
use courier_config::DatabaseConfig;
use courier_database::{
    initialize_database, types::format_timestamp, FileRef, MediaKind, MessageVariant, RoomMember,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct TestContext {
    gateway: ChatGateway,
    store: MessageStore,
    pool: SqlitePool,
    _db_dir: TempDir,
}

impl TestContext {
    async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_dir.path().join("chats.db").display()),
            max_connections: 5,
        };
        let pool = initialize_database(&config).await.expect("initialise database");
        let store = MessageStore::new(pool.clone());
        let gateway = ChatGateway::new(store.clone(), PresenceChannel::new(16));

        Self {
            gateway,
            store,
            pool,
            _db_dir: db_dir,
        }
    }

    async fn first_message(&self, from: &str, to: &str, content: OutgoingContent) -> String {
        self.gateway
            .send_first_message(first(from, to, content))
            .await
            .expect("first message")
            .room_id
    }
}

fn first(from: &str, to: &str, content: OutgoingContent) -> SendFirstMessageRequest {
    SendFirstMessageRequest {
        sender_identity: from.to_string(),
        sender_name: display(from),
        receiver_identity: to.to_string(),
        receiver_name: display(to),
        content,
    }
}

fn reply(from: &str, content: OutgoingContent) -> SendMessageRequest {
    SendMessageRequest {
        sender_identity: from.to_string(),
        sender_name: display(from),
        content,
    }
}

fn display(identity: &str) -> String {
    let mut chars = identity.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn photo(name: &str) -> FileRef {
    FileRef {
        name: name.to_string(),
        url: format!("https://blobs.example/{name}"),
        media_kind: MediaKind::Image,
    }
}

#[tokio::test]
async fn first_message_creates_room_visible_to_both_members() {
    let ctx = TestContext::new().await;

    let outcome = ctx
        .gateway
        .send_first_message(first("alice", "bob", OutgoingContent::text("hi")))
        .await
        .unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.message().unwrap().text.as_deref(), Some("hi"));

    let messages = ctx.gateway.list_messages(&outcome.room_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_identity, "alice");
    assert_eq!(messages[0].variant, MessageVariant::Text);
    assert_eq!(messages[0].text.as_deref(), Some("hi"));

    let bobs_rooms = ctx.gateway.list_rooms("bob").await.unwrap();
    assert_eq!(bobs_rooms.len(), 1);
    assert_eq!(bobs_rooms[0].room_id, outcome.room_id);
    assert_eq!(bobs_rooms[0].other_member.identity, "alice");
    assert_eq!(bobs_rooms[0].last_message.as_ref().unwrap().text, "hi");

    let alices_rooms = ctx.gateway.list_rooms("alice").await.unwrap();
    assert_eq!(alices_rooms[0].other_member.display_name, "Bob");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_first_messages_share_one_room() {
    let ctx = TestContext::new().await;

    let from_alice = {
        let gateway = ctx.gateway.clone();
        tokio::spawn(async move {
            gateway
                .send_first_message(first("alice", "bob", OutgoingContent::text("hey bob")))
                .await
        })
    };
    let from_bob = {
        let gateway = ctx.gateway.clone();
        tokio::spawn(async move {
            gateway
                .send_first_message(first("bob", "alice", OutgoingContent::text("hey alice")))
                .await
        })
    };

    let a = from_alice.await.unwrap().unwrap();
    let b = from_bob.await.unwrap().unwrap();

    assert_eq!(a.room_id, b.room_id);
    assert_eq!(usize::from(a.created) + usize::from(b.created), 1);
    assert_eq!(ctx.gateway.list_rooms("alice").await.unwrap().len(), 1);

    let texts: Vec<_> = ctx
        .gateway
        .list_messages(&a.room_id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.text)
        .collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.contains(&"hey bob".to_string()));
    assert!(texts.contains(&"hey alice".to_string()));
}

#[tokio::test]
async fn earlier_file_precedes_later_text() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("opening"))
        .await;

    ctx.gateway
        .send_message(&room_id, reply("bob", OutgoingContent::file(photo("t1.png"))))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    ctx.gateway
        .send_message(&room_id, reply("alice", OutgoingContent::text("nice picture")))
        .await
        .unwrap();

    let messages = ctx.gateway.list_messages(&room_id).await.unwrap();
    let file_at = messages
        .iter()
        .position(|m| m.variant == MessageVariant::File)
        .unwrap();
    let text_at = messages
        .iter()
        .position(|m| m.text.as_deref() == Some("nice picture"))
        .unwrap();
    assert!(file_at < text_at);
    assert_eq!(messages[file_at].sender_identity, "bob");
    assert_eq!(messages[file_at].file_ref.as_ref().unwrap().name, "t1.png");
}

#[tokio::test]
async fn non_member_cannot_send_and_nothing_is_appended() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("private"))
        .await;

    let err = ctx
        .gateway
        .send_message(&room_id, reply("mallory", OutgoingContent::text("let me in")))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Authorization { .. }));

    let messages = ctx.gateway.list_messages(&room_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(ctx.gateway.list_rooms("mallory").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_room_is_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx
        .gateway
        .send_message("missing-room", reply("alice", OutgoingContent::text("hello?")))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::RoomNotFound { .. }));

    let err = ctx.gateway.list_messages("missing-room").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn validation_happens_before_any_persistence() {
    let ctx = TestContext::new().await;

    let empty = ctx
        .gateway
        .send_first_message(first("alice", "bob", OutgoingContent::default()))
        .await
        .unwrap_err();
    assert!(matches!(empty, ChatError::Validation { .. }));

    let no_receiver = ctx
        .gateway
        .send_first_message(first("alice", "", OutgoingContent::text("hi")))
        .await
        .unwrap_err();
    assert!(matches!(no_receiver, ChatError::Validation { .. }));

    let no_sender = ctx
        .gateway
        .send_first_message(first("", "bob", OutgoingContent::text("hi")))
        .await
        .unwrap_err();
    assert!(matches!(no_sender, ChatError::Validation { .. }));

    assert!(ctx.gateway.list_rooms("alice").await.unwrap().is_empty());
    assert!(ctx.gateway.list_rooms("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn timeline_is_non_decreasing_and_shows_each_append() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("0"))
        .await;

    for i in 1..20 {
        let sender = if i % 3 == 0 { "bob" } else { "alice" };
        let content = if i % 5 == 0 {
            OutgoingContent::file(photo(&format!("{i}.png")))
        } else {
            OutgoingContent::text(i.to_string())
        };
        let outcome = ctx
            .gateway
            .send_message(&room_id, reply(sender, content))
            .await
            .unwrap();

        let messages = ctx.gateway.list_messages(&room_id).await.unwrap();
        assert_eq!(messages.len(), i + 1);
        assert_eq!(messages.last().unwrap().id, outcome.message().unwrap().id);
        assert!(messages
            .windows(2)
            .all(|pair| (pair[0].timestamp, pair[0].seq) < (pair[1].timestamp, pair[1].seq)));
    }
}

#[tokio::test]
async fn padded_identity_cannot_open_a_second_room() {
    let ctx = TestContext::new().await;
    ctx.first_message("alice", "bob", OutgoingContent::text("hi")).await;

    let err = ctx
        .gateway
        .send_first_message(first(" alice", "bob", OutgoingContent::text("again")))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }), "{err:?}");

    let err = ctx
        .gateway
        .send_first_message(first("alice", "bob ", OutgoingContent::text("again")))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }), "{err:?}");

    assert_eq!(ctx.gateway.list_rooms("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn clock_skew_keeps_partitions_and_timeline_ordered() {
    let ctx = TestContext::new().await;
    let first = ctx
        .gateway
        .send_first_message(first("alice", "bob", OutgoingContent::text("a1")))
        .await
        .unwrap();
    let room_id = first.room_id.clone();
    let a1 = first.message().unwrap().id.clone();

    let ahead = chrono::Utc::now() + chrono::Duration::hours(1);
    sqlx::query("UPDATE room_messages SET sent_at = ? WHERE public_id = ?")
        .bind(format_timestamp(ahead))
        .bind(&a1)
        .execute(&ctx.pool)
        .await
        .unwrap();

    ctx.gateway
        .send_message(&room_id, reply("alice", OutgoingContent::text("a2")))
        .await
        .unwrap();
    ctx.gateway
        .send_message(&room_id, reply("bob", OutgoingContent::text("b1")))
        .await
        .unwrap();

    let messages = ctx.gateway.list_messages(&room_id).await.unwrap();
    let texts: Vec<_> = messages
        .iter()
        .map(|m| m.text.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["b1", "a1", "a2"]);
    assert!(messages
        .windows(2)
        .all(|pair| (pair[0].timestamp, pair[0].seq) < (pair[1].timestamp, pair[1].seq)));
    assert!(messages[2].timestamp >= messages[1].timestamp);
}

#[tokio::test]
async fn appending_to_one_partition_leaves_the_other_untouched() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("a1"))
        .await;
    ctx.gateway
        .send_message(&room_id, reply("bob", OutgoingContent::text("b1")))
        .await
        .unwrap();

    let bob_before = ctx
        .store
        .list_partitions(&room_id)
        .await
        .unwrap()
        .partitions
        .into_iter()
        .find(|p| p.sender_identity == "bob")
        .unwrap();

    for text in ["a2", "a3"] {
        ctx.gateway
            .send_message(&room_id, reply("alice", OutgoingContent::text(text)))
            .await
            .unwrap();
    }

    let after = ctx.store.list_partitions(&room_id).await.unwrap();
    let bob_after = after
        .partitions
        .iter()
        .find(|p| p.sender_identity == "bob")
        .unwrap();
    let alice_after = after
        .partitions
        .iter()
        .find(|p| p.sender_identity == "alice")
        .unwrap();

    assert_eq!(&bob_before, bob_after);
    let positions: Vec<_> = alice_after.text.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn text_and_file_in_one_send_are_both_stored() {
    let ctx = TestContext::new().await;

    let outcome = ctx
        .gateway
        .send_first_message(first(
            "alice",
            "bob",
            OutgoingContent {
                text: Some("caption".to_string()),
                file: Some(photo("beach.jpg")),
            },
        ))
        .await
        .unwrap();

    assert_eq!(outcome.messages.len(), 2);
    assert_eq!(outcome.messages[0].variant, MessageVariant::File);
    assert_eq!(outcome.message().unwrap().text.as_deref(), Some("caption"));

    let listed = ctx.gateway.list_rooms("bob").await.unwrap();
    assert_eq!(listed[0].last_message.as_ref().unwrap().text, "caption");
}

#[tokio::test]
async fn receiver_gets_exactly_one_push_per_send() {
    let ctx = TestContext::new().await;
    let mut bob = ctx.gateway.presence().subscribe("bob").await.unwrap();
    let mut alice = ctx.gateway.presence().subscribe("alice").await.unwrap();

    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("ping"))
        .await;

    let event = tokio::time::timeout(Duration::from_secs(2), bob.receiver.recv())
        .await
        .expect("push should arrive")
        .expect("channel open");
    match event {
        PresenceEvent::NewMessageReceived {
            room_id: pushed_room,
            sender_identity,
            message,
            messages,
        } => {
            assert_eq!(pushed_room, room_id);
            assert_eq!(sender_identity, "alice");
            assert_eq!(message.text.as_deref(), Some("ping"));
            assert!(messages.is_empty());
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(bob.receiver.try_recv().is_err());
    assert!(alice.receiver.try_recv().is_err());
}

#[tokio::test]
async fn sends_succeed_with_nobody_listening() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("alice", "bob", OutgoingContent::text("anyone?"))
        .await;

    let subscription = ctx.gateway.presence().subscribe("bob").await.unwrap();
    drop(subscription);

    ctx.gateway
        .send_message(&room_id, reply("alice", OutgoingContent::text("still durable")))
        .await
        .unwrap();
    assert_eq!(ctx.gateway.list_messages(&room_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn hidden_messages_are_filtered_per_viewer() {
    let ctx = TestContext::new().await;
    let outcome = ctx
        .gateway
        .send_first_message(first("alice", "bob", OutgoingContent::text("oops")))
        .await
        .unwrap();
    let room_id = outcome.room_id.clone();
    let oops = outcome.message().unwrap().id.clone();
    let kept = ctx
        .gateway
        .send_message(&room_id, reply("bob", OutgoingContent::text("kept")))
        .await
        .unwrap();
    let bob_msg = kept.message().unwrap().id.clone();

    let err = ctx
        .gateway
        .hide_message(&room_id, &oops, "bob", HideScope::Everyone)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Authorization { .. }));

    let hidden = ctx
        .gateway
        .hide_message(&room_id, &oops, "alice", HideScope::OnlyMe)
        .await
        .unwrap();
    assert!(hidden.hidden_for_sender);

    let for_alice = ctx.gateway.list_messages_for(&room_id, "alice").await.unwrap();
    assert_eq!(for_alice.len(), 1);
    let for_bob = ctx.gateway.list_messages_for(&room_id, "bob").await.unwrap();
    assert_eq!(for_bob.len(), 2);

    ctx.gateway
        .hide_message(&room_id, &bob_msg, "bob", HideScope::Everyone)
        .await
        .unwrap();
    let for_bob = ctx.gateway.list_messages_for(&room_id, "bob").await.unwrap();
    assert_eq!(for_bob.len(), 1);

    // Unfiltered history still carries everything, in the same order.
    let all = ctx.gateway.list_messages(&room_id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, oops);

    let outsider = ctx
        .gateway
        .list_messages_for(&room_id, "mallory")
        .await
        .unwrap_err();
    assert!(matches!(outsider, ChatError::Authorization { .. }));

    let missing = ctx
        .gateway
        .hide_message(&room_id, "no-such-message", "alice", HideScope::OnlyMe)
        .await
        .unwrap_err();
    assert!(matches!(missing, ChatError::MessageNotFound { .. }));
}

#[tokio::test]
async fn temporary_room_promotes_into_the_existing_room() {
    let ctx = TestContext::new().await;
    let room_id = ctx
        .first_message("bob", "alice", OutgoingContent::text("hello"))
        .await;

    let draft = TemporaryRoom::new(
        RoomMember::new("alice", "Alice"),
        RoomMember::new("bob", "Bob"),
    );
    let promoted = ctx
        .gateway
        .send_first_message(draft.into_first_message(OutgoingContent::text("hi back")))
        .await
        .unwrap();

    assert!(!promoted.created);
    assert_eq!(promoted.room_id, room_id);
}
