//! In-process [`RecordStore`] backend.
//!
//! Backs feature-less builds and the integration test suite. Data lives in
//! concurrent maps and does not survive a restart.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, PlayerEntity};
use crate::dao::record_store::RecordStore;
use crate::dao::storage::StorageResult;

/// Volatile record store keyed by entity ids.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    players: DashMap<Uuid, PlayerEntity>,
    matches: DashMap<Uuid, MatchEntity>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn matches_sorted(&self) -> Vec<MatchEntity> {
        let mut records: Vec<MatchEntity> = self
            .inner
            .matches
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| (record.created_at, record.id));
        records
    }
}

impl RecordStore for MemoryRecordStore {
    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.players.insert(player.id, player);
            Ok(())
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.create_player(player)
    }

    fn find_player_by_chat_id(
        &self,
        chat_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .players
                .iter()
                .find(|entry| entry.value().chat_id == chat_id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn find_players_by_game_name(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .players
                .iter()
                .filter(|entry| entry.value().game_name == game_name)
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(
            async move { Ok(store.inner.players.get(&id).map(|entry| entry.value().clone())) },
        )
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players: Vec<PlayerEntity> = store
                .inner
                .players
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            players.sort_by(|a, b| a.game_name.cmp(&b.game_name));
            Ok(players)
        })
    }

    fn create_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.matches.insert(record.id, record);
            Ok(())
        })
    }

    fn find_incomplete_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches_sorted()
                .into_iter()
                .filter(|record| !record.completed)
                .collect())
        })
    }

    fn find_open_match(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches_sorted()
                .into_iter()
                .find(|record| !record.completed && record.tracks_player(player_id)))
        })
    }

    fn list_matches(
        &self,
        offset: u64,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches_sorted()
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        })
    }

    fn save_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.create_match(record)
    }

    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.matches.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
