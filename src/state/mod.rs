mod events;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::record_store::RecordStore, error::ServiceError, ladder::LadderTable,
    provider::MatchProvider, services::scoring::ScorePolicy,
};

pub use self::events::{EventHub, LifecycleEvent};

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Capacity of the lifecycle event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Central application state shared across routes, services, and the poller.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn RecordStore>>>,
    provider: Arc<dyn MatchProvider>,
    ladder: RwLock<LadderTable>,
    events: EventHub,
    // One gate per player so concurrent find-or-create calls for the same
    // player serialize while unrelated players proceed in parallel.
    player_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    // Same idea for registrations, keyed by the (game name, chat id) pair
    // that must stay unique.
    registration_gates: DashMap<String, Arc<Mutex<()>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
    degraded: watch::Sender<bool>,
    score_policy: ScorePolicy,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn MatchProvider>,
        score_policy: ScorePolicy,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            provider,
            ladder: RwLock::new(LadderTable::empty()),
            events: EventHub::new(EVENT_CHANNEL_CAPACITY),
            player_gates: DashMap::new(),
            registration_gates: DashMap::new(),
            poller: Mutex::new(None),
            degraded: degraded_tx,
            score_policy,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn record_store(&self) -> Option<Arc<dyn RecordStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Record store handle, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        self.record_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new record store implementation and leave degraded mode.
    pub async fn install_record_store(&self, store: Arc<dyn RecordStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current record store and enter degraded mode.
    pub async fn clear_record_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Client handle for the external match provider.
    pub fn provider(&self) -> &Arc<dyn MatchProvider> {
        &self.provider
    }

    /// Replace the ladder table; done once after the sheet fetch succeeds.
    pub async fn install_ladder(&self, table: LadderTable) {
        let mut guard = self.ladder.write().await;
        *guard = table;
    }

    /// Snapshot of the current ladder table.
    pub async fn ladder(&self) -> LadderTable {
        self.ladder.read().await.clone()
    }

    /// Broadcast hub for lifecycle events.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Per-player mutex guarding the open-match find-or-create step.
    pub fn player_gate(&self, player_id: Uuid) -> Arc<Mutex<()>> {
        self.player_gates.entry(player_id).or_default().clone()
    }

    /// Mutex serializing registrations of one (game name, chat id) pair.
    pub fn registration_gate(&self, game_name: &str, chat_id: &str) -> Arc<Mutex<()>> {
        let key = format!("{game_name}/{chat_id}");
        self.registration_gates.entry(key).or_default().clone()
    }

    /// Slot holding the reconciliation timer task.
    pub fn poller_slot(&self) -> &Mutex<Option<JoinHandle<()>>> {
        &self.poller
    }

    /// Injected ladder-score adjustment policy.
    pub fn score_policy(&self) -> &ScorePolicy {
        &self.score_policy
    }
}
