//! Partitioned message log.
//!
//! A partition is the `(room, sender, variant)` triple. Appends only ever touch the
//! sender's own partition; reads return rows grouped by partition in append order.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::entities::{
    FileRef, MediaKind, MessageBody, MessageFlags, MessageVariant, StoredMessage,
};
use crate::types::{format_timestamp, now_timestamp, parse_timestamp, StoreError, StoreResult};

const MESSAGE_COLUMNS: &str = "id, public_id, room_id, sender_identity, variant, position, seq, \
     content, file_name, file_url, media_kind, hidden_for_sender, hidden_for_everyone, sent_at";

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append `body` to `sender_identity`'s partition of the room `room_public_id`.
    pub async fn append(
        &self,
        room_public_id: &str,
        sender_identity: &str,
        body: &MessageBody,
    ) -> StoreResult<StoredMessage> {
        let mut stored = self
            .append_all(room_public_id, sender_identity, std::slice::from_ref(body))
            .await?;
        stored
            .pop()
            .ok_or_else(|| StoreError::corrupt("append produced no message"))
    }

    /// Append several bodies, in order, to the sender's partitions.
    ///
    /// Runs as one transaction whose first statement takes the write lock by bumping the
    /// room's sequence counter. Either every message commits with its position, sequence
    /// number and timestamp, or nothing is written.
    pub async fn append_all(
        &self,
        room_public_id: &str,
        sender_identity: &str,
        bodies: &[MessageBody],
    ) -> StoreResult<Vec<StoredMessage>> {
        if bodies.is_empty() {
            return Ok(Vec::new());
        }
        let count = i64::try_from(bodies.len())
            .map_err(|_| StoreError::corrupt("too many messages in one append"))?;

        let mut tx = self.pool.begin().await?;

        let bumped: Option<(i64, i64)> = sqlx::query_as(
            "UPDATE rooms SET message_seq = message_seq + ?
             WHERE public_id = ? AND (member_a_identity = ? OR member_b_identity = ?)
             RETURNING id, message_seq",
        )
        .bind(count)
        .bind(room_public_id)
        .bind(sender_identity)
        .bind(sender_identity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((room_id, last_seq)) = bumped else {
            let exists = sqlx::query("SELECT 1 FROM rooms WHERE public_id = ?")
                .bind(room_public_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();

            return Err(if exists {
                StoreError::NotAMember {
                    room_id: room_public_id.to_string(),
                    identity: sender_identity.to_string(),
                }
            } else {
                StoreError::RoomNotFound(room_public_id.to_string())
            });
        };

        let now = now_timestamp();
        let mut stored = Vec::with_capacity(bodies.len());

        for (offset, body) in (0..count).zip(bodies) {
            let seq = last_seq - count + 1 + offset;
            let variant = body.variant();

            let (last_position, last_sent_at): (i64, Option<String>) = sqlx::query_as(
                "SELECT COALESCE(MAX(position), 0), MAX(sent_at) FROM room_messages
                 WHERE room_id = ? AND sender_identity = ? AND variant = ?",
            )
            .bind(room_id)
            .bind(sender_identity)
            .bind(variant.as_str())
            .fetch_one(&mut *tx)
            .await?;

            // Clock steps backwards must not reorder a partition.
            let mut sent_at = now;
            if let Some(last) = last_sent_at.as_deref() {
                let last = parse_timestamp(last)?;
                if last > sent_at {
                    sent_at = last;
                }
            }

            let public_id = cuid2::cuid();
            let position = last_position + 1;
            let (content, file_name, file_url, media_kind) = match body {
                MessageBody::Text { content } => (Some(content.as_str()), None, None, None),
                MessageBody::File(file) => (
                    None,
                    Some(file.name.as_str()),
                    Some(file.url.as_str()),
                    Some(file.media_kind.as_str()),
                ),
            };

            let result = sqlx::query(
                "INSERT INTO room_messages (public_id, room_id, sender_identity, variant, position,
                                            seq, content, file_name, file_url, media_kind, sent_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&public_id)
            .bind(room_id)
            .bind(sender_identity)
            .bind(variant.as_str())
            .bind(position)
            .bind(seq)
            .bind(content)
            .bind(file_name)
            .bind(file_url)
            .bind(media_kind)
            .bind(format_timestamp(sent_at))
            .execute(&mut *tx)
            .await?;

            stored.push(StoredMessage {
                id: result.last_insert_rowid(),
                public_id,
                room_id,
                sender_identity: sender_identity.to_string(),
                body: body.clone(),
                position,
                seq,
                sent_at,
                flags: MessageFlags::default(),
            });
        }

        tx.commit().await?;

        for message in &stored {
            info!(
                room_id = %room_public_id,
                message_id = %message.public_id,
                sender = %sender_identity,
                variant = %message.variant(),
                seq = message.seq,
                "appended message"
            );
        }

        Ok(stored)
    }

    /// Every message of a room, grouped by sender then variant, each group in append order.
    pub async fn list_for_room(&self, room_id: i64) -> StoreResult<Vec<StoredMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM room_messages
             WHERE room_id = ?
             ORDER BY sender_identity, variant, position"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    pub async fn find_by_public_id(
        &self,
        room_id: i64,
        public_id: &str,
    ) -> StoreResult<Option<StoredMessage>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM room_messages WHERE room_id = ? AND public_id = ?"
        ))
        .bind(room_id)
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// Replace the status flags in place. Position, sequence and timestamp stay untouched.
    pub async fn set_flags(&self, message_id: i64, flags: MessageFlags) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE room_messages SET hidden_for_sender = ?, hidden_for_everyone = ? WHERE id = ?",
        )
        .bind(flags.hidden_for_sender)
        .bind(flags.hidden_for_everyone)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MessageNotFound(message_id.to_string()));
        }
        Ok(())
    }
}

fn message_from_row(row: &SqliteRow) -> StoreResult<StoredMessage> {
    let variant: String = row.try_get("variant")?;
    let variant = MessageVariant::parse(&variant)
        .ok_or_else(|| StoreError::corrupt(format!("unknown variant {variant:?}")))?;

    let body = match variant {
        MessageVariant::Text => MessageBody::Text {
            content: row
                .try_get::<Option<String>, _>("content")?
                .ok_or_else(|| StoreError::corrupt("text message without content"))?,
        },
        MessageVariant::File => {
            let name: Option<String> = row.try_get("file_name")?;
            let url: Option<String> = row.try_get("file_url")?;
            let media_kind: Option<String> = row.try_get("media_kind")?;
            match (name, url) {
                (Some(name), Some(url)) => MessageBody::File(FileRef {
                    name,
                    url,
                    media_kind: media_kind
                        .as_deref()
                        .map(MediaKind::from)
                        .unwrap_or(MediaKind::Document),
                }),
                _ => return Err(StoreError::corrupt("file message without reference")),
            }
        }
    };

    let sent_at: String = row.try_get("sent_at")?;

    Ok(StoredMessage {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        room_id: row.try_get("room_id")?,
        sender_identity: row.try_get("sender_identity")?,
        body,
        position: row.try_get("position")?,
        seq: row.try_get("seq")?,
        sent_at: parse_timestamp(&sent_at)?,
        flags: MessageFlags {
            hidden_for_sender: row.try_get("hidden_for_sender")?,
            hidden_for_everyone: row.try_get("hidden_for_everyone")?,
        },
    })
}
