use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, PlayerEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for players and tracked matches.
///
/// Implementations must uphold the store-level invariants the lifecycle
/// relies on: `find_open_match` returns at most one record per player, and
/// deletes of already-deleted records are a no-op rather than an error.
pub trait RecordStore: Send + Sync {
    /// Insert a newly registered player.
    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist updated counters / ladder score for an existing player.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look up a player by the owning chat identity.
    fn find_player_by_chat_id(
        &self,
        chat_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Look up players by their external game display name.
    fn find_players_by_game_name(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Look up a player by internal id.
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// All registered players.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;

    /// Insert a freshly created match record.
    fn create_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Every match with `completed == false`.
    fn find_incomplete_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    /// The single open (incomplete) match tracking `player_id`, if any.
    fn find_open_match(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Page through matches ordered by creation time, newest last.
    fn list_matches(
        &self,
        offset: u64,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    /// Persist a mutated match record.
    fn save_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a match record; returns whether a record was deleted.
    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// Cheap connectivity probe used by the supervisor and health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
