use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    models::{MatchEntity, PlayerEntity},
    record_store::RecordStore,
    storage::{StorageError, StorageResult},
};

const PLAYER_COLLECTION_NAME: &str = "players";
const MATCH_COLLECTION_NAME: &str = "matches";

#[derive(Clone)]
pub struct MongoRecordStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    // The database handle keeps its client alive internally.
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoRecordStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let players = database.collection::<mongodb::bson::Document>(PLAYER_COLLECTION_NAME);
        let chat_index = mongodb::IndexModel::builder()
            .keys(doc! {"chat_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_chat_idx".to_owned()))
                    .build(),
            )
            .build();
        players
            .create_index(chat_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "chat_id",
                source,
            })?;

        let name_index = mongodb::IndexModel::builder()
            .keys(doc! {"game_name": 1, "chat_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_identity_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        players
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "game_name,chat_id",
                source,
            })?;

        // Open-match lookups filter on (players.player_id, completed).
        let matches = database.collection::<mongodb::bson::Document>(MATCH_COLLECTION_NAME);
        let open_index = mongodb::IndexModel::builder()
            .keys(doc! {"players.player_id": 1, "completed": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_open_idx".to_owned()))
                    .build(),
            )
            .build();
        matches
            .create_index(open_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "players.player_id,completed",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.database.read().await.clone()
    }

    async fn player_collection(&self) -> Collection<PlayerEntity> {
        let guard = self.inner.database.read().await;
        guard.collection::<PlayerEntity>(PLAYER_COLLECTION_NAME)
    }

    async fn match_collection(&self) -> Collection<MatchEntity> {
        let guard = self.inner.database.read().await;
        guard.collection::<MatchEntity>(MATCH_COLLECTION_NAME)
    }

    async fn upsert_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let id = player.id;
        let collection = self.player_collection().await;
        collection
            .replace_one(doc! {"id": id.to_string()}, &player)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(())
    }

    async fn upsert_match(&self, record: MatchEntity) -> MongoResult<()> {
        let id = record.id;
        let collection = self.match_collection().await;
        collection
            .replace_one(doc! {"id": id.to_string()}, &record)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;
        Ok(())
    }

    async fn players_where(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;
        collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })
    }

    async fn matches_where(
        &self,
        filter: mongodb::bson::Document,
        offset: Option<u64>,
        limit: Option<i64>,
    ) -> MongoResult<Vec<MatchEntity>> {
        let collection = self.match_collection().await;
        let mut find = collection.find(filter).sort(doc! {"created_at": 1});
        if let Some(offset) = offset {
            find = find.skip(offset);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        find.await
            .map_err(|source| MongoDaoError::LoadMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadMatches { source })
    }
}

impl RecordStore for MongoRecordStore {
    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_player(player).await.map_err(Into::into) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_player(player).await.map_err(Into::into) })
    }

    fn find_player_by_chat_id(
        &self,
        chat_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store
                .players_where(doc! {"chat_id": chat_id})
                .await
                .map_err(StorageError::from)?;
            Ok(found.into_iter().next())
        })
    }

    fn find_players_by_game_name(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .players_where(doc! {"game_name": game_name})
                .await
                .map_err(Into::into)
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store
                .players_where(doc! {"id": id.to_string()})
                .await
                .map_err(StorageError::from)?;
            Ok(found.into_iter().next())
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.players_where(doc! {}).await.map_err(Into::into) })
    }

    fn create_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_match(record).await.map_err(Into::into) })
    }

    fn find_incomplete_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .matches_where(doc! {"completed": false}, None, None)
                .await
                .map_err(Into::into)
        })
    }

    fn find_open_match(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store
                .matches_where(
                    doc! {"completed": false, "players.player_id": player_id.to_string()},
                    None,
                    None,
                )
                .await
                .map_err(StorageError::from)?;
            Ok(found.into_iter().next())
        })
    }

    fn list_matches(
        &self,
        offset: u64,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .matches_where(doc! {}, Some(offset), Some(limit as i64))
                .await
                .map_err(Into::into)
        })
    }

    fn save_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_match(record).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.match_collection().await;
            let result = collection
                .delete_one(doc! {"id": id.to_string()})
                .await
                .map_err(|source| StorageError::from(MongoDaoError::DeleteMatch { id, source }))?;
            Ok(result.deleted_count > 0)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
