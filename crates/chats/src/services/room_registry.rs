//! At most one room per unordered member pair.

use std::collections::HashMap;
use std::sync::Arc;

use courier_database::{PairKey, Room, RoomMember};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::message_store::MessageStore;
use crate::types::{ChatError, ChatResult};
use crate::utils::Validator;

/// Indexes rooms by their normalized member pair and creates them on first use.
///
/// Callers for the same pair are serialized by a per-pair lock; the unique pair key in
/// storage covers writers outside this process. A lost insert race is resolved by
/// re-reading the winner.
#[derive(Clone)]
pub struct RoomRegistry {
    store: MessageStore,
    pair_locks: Arc<Mutex<HashMap<PairKey, Arc<Mutex<()>>>>>,
}

impl RoomRegistry {
    pub fn new(store: MessageStore) -> Self {
        Self {
            store,
            pair_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the room for `{member_a, member_b}`, creating it if needed.
    ///
    /// The flag is `true` when this call created the room.
    pub async fn find_or_create(
        &self,
        member_a: &RoomMember,
        member_b: &RoomMember,
    ) -> ChatResult<(Room, bool)> {
        Validator::identity("memberA identity", &member_a.identity)?;
        Validator::identity("memberB identity", &member_b.identity)?;
        if member_a.identity == member_b.identity {
            return Err(ChatError::validation(
                "A room needs two different members",
            ));
        }

        let pair_key = PairKey::new(&member_a.identity, &member_b.identity);
        let pair_lock = self.lock_for(&pair_key).await;

        let outcome = {
            let _guard = pair_lock.lock().await;
            self.resolve(&pair_key, member_a, member_b).await
        };

        self.release(&pair_key, pair_lock).await;
        outcome
    }

    async fn resolve(
        &self,
        pair_key: &PairKey,
        member_a: &RoomMember,
        member_b: &RoomMember,
    ) -> ChatResult<(Room, bool)> {
        if let Some(room) = self.store.find_room_by_pair(pair_key).await? {
            debug!(room_id = %room.public_id, "reusing existing room");
            return Ok((room, false));
        }

        match self
            .store
            .create_room(member_a.clone(), member_b.clone())
            .await
        {
            Ok(room) => {
                info!(
                    room_id = %room.public_id,
                    member_a = %member_a.identity,
                    member_b = %member_b.identity,
                    "room created"
                );
                Ok((room, true))
            }
            Err(ChatError::Conflict { .. }) => {
                let room = self.store.find_room_by_pair(pair_key).await?.ok_or_else(|| {
                    ChatError::storage(format!("room for {pair_key} vanished after conflict"))
                })?;
                info!(room_id = %room.public_id, "lost room creation race, using winner");
                Ok((room, false))
            }
            Err(other) => Err(other),
        }
    }

    async fn lock_for(&self, pair_key: &PairKey) -> Arc<Mutex<()>> {
        let mut locks = self.pair_locks.lock().await;
        Arc::clone(locks.entry(pair_key.clone()).or_default())
    }

    /// Drop the pair's lock entry once no other caller holds a handle to it.
    async fn release(&self, pair_key: &PairKey, pair_lock: Arc<Mutex<()>>) {
        let mut locks = self.pair_locks.lock().await;
        // The map and `pair_lock` account for two references.
        if Arc::strong_count(&pair_lock) == 2 {
            locks.remove(pair_key);
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked_pairs(&self) -> usize {
        self.pair_locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::create_test_store;

    fn member(identity: &str) -> RoomMember {
        RoomMember::new(identity, identity.to_uppercase())
    }

    #[tokio::test]
    async fn same_pair_resolves_to_one_room_in_either_order() {
        let (store, _dir) = create_test_store().await;
        let registry = RoomRegistry::new(store);

        let (first, created) = registry
            .find_or_create(&member("alice"), &member("bob"))
            .await
            .unwrap();
        assert!(created);

        let (second, created_again) = registry
            .find_or_create(&member("bob"), &member("alice"))
            .await
            .unwrap();
        assert!(!created_again);
        assert_eq!(first.public_id, second.public_id);
        assert_eq!(registry.tracked_pairs().await, 0);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_room() {
        let (store, _dir) = create_test_store().await;
        let registry = RoomRegistry::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 {
                    (member("alice"), member("bob"))
                } else {
                    (member("bob"), member("alice"))
                };
                registry.find_or_create(&a, &b).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        let mut creations = 0;
        for handle in handles {
            let (room, created) = handle.await.unwrap();
            ids.push(room.public_id);
            creations += usize::from(created);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(creations, 1);
    }

    #[tokio::test]
    async fn rooms_created_by_another_writer_are_reused() {
        let (store, _dir) = create_test_store().await;
        let registry = RoomRegistry::new(store.clone());

        // A second registry stands in for another process: it has its own lock table.
        let other_process = RoomRegistry::new(store.clone());
        let (winner, _) = other_process
            .find_or_create(&member("alice"), &member("bob"))
            .await
            .unwrap();

        let pair_key = PairKey::new("alice", "bob");
        let conflict = store.create_room(member("bob"), member("alice")).await;
        assert!(matches!(conflict, Err(ChatError::Conflict { .. })));

        let (resolved, created) = registry
            .resolve(&pair_key, &member("bob"), &member("alice"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(resolved.public_id, winner.public_id);
    }

    #[tokio::test]
    async fn rejects_missing_or_identical_identities() {
        let (store, _dir) = create_test_store().await;
        let registry = RoomRegistry::new(store);

        let blank = RoomMember::new("", "Nobody");
        assert!(matches!(
            registry.find_or_create(&blank, &member("bob")).await,
            Err(ChatError::Validation { .. })
        ));
        assert!(matches!(
            registry.find_or_create(&member("bob"), &blank).await,
            Err(ChatError::Validation { .. })
        ));
        assert!(matches!(
            registry.find_or_create(&member("bob"), &member("bob")).await,
            Err(ChatError::Validation { .. })
        ));
    }
}
