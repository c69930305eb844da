//! Room rows: creation, pair lookups and the last-message summary.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::entities::{LastMessage, MessageVariant, NewRoom, PairKey, Room, RoomMember};
use crate::types::{format_timestamp, now_timestamp, parse_timestamp, StoreError, StoreResult};

const ROOM_COLUMNS: &str = "id, public_id, pair_key, member_a_identity, member_a_name, \
     member_b_identity, member_b_name, last_message_text, last_message_sender, \
     last_message_variant, last_message_at, created_at, updated_at";

#[derive(Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a room. A second insert for the same member pair fails with
    /// [`StoreError::DuplicateRoom`] thanks to the unique pair key.
    pub async fn create(&self, request: &NewRoom) -> StoreResult<Room> {
        let public_id = cuid2::cuid();
        let pair_key = request.pair_key();
        let now = now_timestamp();
        let stamp = format_timestamp(now);

        let result = sqlx::query(
            "INSERT INTO rooms (public_id, pair_key, member_a_identity, member_a_name,
                                member_b_identity, member_b_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(pair_key.as_str())
        .bind(&request.member_a.identity)
        .bind(&request.member_a.display_name)
        .bind(&request.member_b.identity)
        .bind(&request.member_b.display_name)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::DuplicateRoom(pair_key.to_string())
            }
            other => StoreError::Database(other),
        })?;

        let id = result.last_insert_rowid();
        info!(room_id = %public_id, "created room");

        Ok(Room {
            id,
            public_id,
            pair_key,
            members: [request.member_a.clone(), request.member_b.clone()],
            last_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    pub async fn find_by_pair_key(&self, pair_key: &PairKey) -> StoreResult<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE pair_key = ?"))
            .bind(pair_key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    /// Rooms containing `identity`, most recently active first.
    pub async fn list_for_member(&self, identity: &str) -> StoreResult<Vec<Room>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE member_a_identity = ? OR member_b_identity = ?
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(identity)
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(room_from_row).collect()
    }

    /// Overwrite the summary unless a newer one is already stored.
    ///
    /// Returns `false` when the stored summary was newer and left alone.
    pub async fn update_last_message(
        &self,
        public_id: &str,
        summary: &LastMessage,
    ) -> StoreResult<bool> {
        let sent_at = format_timestamp(summary.sent_at);

        let result = sqlx::query(
            "UPDATE rooms
             SET last_message_text = ?, last_message_sender = ?, last_message_variant = ?,
                 last_message_at = ?, updated_at = ?
             WHERE public_id = ? AND (last_message_at IS NULL OR last_message_at <= ?)",
        )
        .bind(&summary.text)
        .bind(&summary.sender_identity)
        .bind(summary.variant.as_str())
        .bind(&sent_at)
        .bind(&sent_at)
        .bind(public_id)
        .bind(&sent_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists = sqlx::query("SELECT 1 FROM rooms WHERE public_id = ?")
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !exists {
            return Err(StoreError::RoomNotFound(public_id.to_string()));
        }

        debug!(room_id = %public_id, "kept newer last message summary");
        Ok(false)
    }
}

fn room_from_row(row: &SqliteRow) -> StoreResult<Room> {
    let last_text: Option<String> = row.try_get("last_message_text")?;
    let last_sender: Option<String> = row.try_get("last_message_sender")?;
    let last_variant: Option<String> = row.try_get("last_message_variant")?;
    let last_at: Option<String> = row.try_get("last_message_at")?;

    let last_message = match (last_text, last_sender, last_variant, last_at) {
        (Some(text), Some(sender_identity), Some(variant), Some(at)) => Some(LastMessage {
            text,
            sender_identity,
            variant: MessageVariant::parse(&variant)
                .ok_or_else(|| StoreError::corrupt(format!("unknown variant {variant:?}")))?,
            sent_at: parse_timestamp(&at)?,
        }),
        _ => None,
    };

    let pair_key: String = row.try_get("pair_key")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Room {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        pair_key: PairKey::from_stored(pair_key),
        members: [
            RoomMember::new(
                row.try_get::<String, _>("member_a_identity")?,
                row.try_get::<String, _>("member_a_name")?,
            ),
            RoomMember::new(
                row.try_get::<String, _>("member_b_identity")?,
                row.try_get::<String, _>("member_b_name")?,
            ),
        ],
        last_message,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
