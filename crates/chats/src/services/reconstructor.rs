//! Read-side merge of a room's partitions into one timeline.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use courier_database::{RoomPartitions, StoredMessage};

use super::message_store::MessageStore;
use crate::types::{ChatError, ChatResult, MessageDescriptor};

#[derive(Clone)]
pub struct MessageReconstructor {
    store: MessageStore,
}

impl MessageReconstructor {
    pub fn new(store: MessageStore) -> Self {
        Self { store }
    }

    /// The full ordered history of a room.
    pub async fn build(&self, room_id: &str) -> ChatResult<Vec<MessageDescriptor>> {
        let partitions = self.store.list_partitions(room_id).await?;
        Ok(timeline(partitions))
    }

    /// The history as `viewer` sees it: hidden entries are dropped.
    pub async fn build_for(
        &self,
        room_id: &str,
        viewer: &str,
    ) -> ChatResult<Vec<MessageDescriptor>> {
        let partitions = self.store.list_partitions(room_id).await?;
        if !partitions.room.is_member(viewer) {
            return Err(ChatError::authorization(format!(
                "{viewer} is not a member of room {room_id}"
            )));
        }

        let mut entries = timeline(partitions);
        entries.retain(|entry| entry.visible_to(viewer));
        Ok(entries)
    }
}

/// Merge every text and file sub-sequence of the room and attach sender names.
pub fn timeline(partitions: RoomPartitions) -> Vec<MessageDescriptor> {
    let RoomPartitions { room, partitions } = partitions;

    let runs = partitions
        .into_iter()
        .flat_map(|partition| [partition.text, partition.files])
        .collect();

    merge_runs(runs)
        .iter()
        .map(|message| {
            let sender_name = room
                .member(&message.sender_identity)
                .map(|member| member.display_name.as_str())
                .unwrap_or(message.sender_identity.as_str());
            MessageDescriptor::from_stored(message, sender_name)
        })
        .collect()
}

type MergeKey = (DateTime<Utc>, i64, usize);

fn merge_key(message: &StoredMessage, run: usize) -> Reverse<MergeKey> {
    Reverse((message.sent_at, message.seq, run))
}

/// k-way merge of runs that are each already ordered by `(sent_at, seq)`.
///
/// The heap holds at most one head per run. Equal timestamps fall back to the room-wide
/// sequence number, so the result is deterministic.
pub fn merge_runs(runs: Vec<Vec<StoredMessage>>) -> Vec<StoredMessage> {
    let total = runs.iter().map(Vec::len).sum();
    let mut cursors: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();
    let mut heads: Vec<Option<StoredMessage>> = cursors.iter_mut().map(Iterator::next).collect();

    let mut heap = BinaryHeap::with_capacity(heads.len());
    for (run, head) in heads.iter().enumerate() {
        if let Some(message) = head {
            heap.push(merge_key(message, run));
        }
    }

    let mut merged = Vec::with_capacity(total);
    while let Some(Reverse((_, _, run))) = heap.pop() {
        if let Some(message) = heads[run].take() {
            merged.push(message);
        }
        heads[run] = cursors[run].next();
        if let Some(next) = &heads[run] {
            heap.push(merge_key(next, run));
        }
    }

    merged
}
