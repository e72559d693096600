//! End-to-end lifecycle tests running against the in-memory record store and
//! a scripted match provider.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use arena_ladder_back::{
    config::AppConfig,
    dao::{memory::MemoryRecordStore, models::MatchStatus, record_store::RecordStore},
    error::ServiceError,
    provider::{
        CompletedMatchDetail, LiveMatchState, MatchParticipant, MatchProvider,
        ParticipantIdentity, PlayerIdentity, ProviderError, ProviderResult, TeamResult,
    },
    services::{lifecycle, poller, scoring},
    state::{AppState, LifecycleEvent, SharedState},
};

/// Provider whose responses are set by the test ahead of each call.
#[derive(Clone, Default)]
struct ScriptedProvider {
    inner: Arc<ScriptedInner>,
}

#[derive(Default)]
struct ScriptedInner {
    live: Mutex<HashMap<String, LiveMatchState>>,
    details: Mutex<HashMap<i64, CompletedMatchDetail>>,
}

impl ScriptedProvider {
    fn set_live(&self, account_id: &str, live: Option<LiveMatchState>) {
        let mut map = self.inner.live.lock().unwrap();
        match live {
            Some(live) => map.insert(account_id.to_owned(), live),
            None => map.remove(account_id),
        };
    }

    fn set_detail(&self, detail: CompletedMatchDetail) {
        self.inner
            .details
            .lock()
            .unwrap()
            .insert(detail.game_id, detail);
    }
}

impl MatchProvider for ScriptedProvider {
    fn lookup_player(
        &self,
        name: String,
        _server: String,
    ) -> BoxFuture<'static, ProviderResult<PlayerIdentity>> {
        Box::pin(async move {
            Ok(PlayerIdentity {
                id: name.clone(),
                account_id: format!("acct-{name}"),
                name,
            })
        })
    }

    fn lookup_active_match(
        &self,
        account_id: String,
        _server: String,
    ) -> BoxFuture<'static, ProviderResult<Option<LiveMatchState>>> {
        let live = self.inner.live.lock().unwrap().get(&account_id).cloned();
        Box::pin(async move { Ok(live) })
    }

    fn lookup_completed_match(
        &self,
        external_id: i64,
        _server: String,
    ) -> BoxFuture<'static, ProviderResult<CompletedMatchDetail>> {
        let detail = self.inner.details.lock().unwrap().get(&external_id).cloned();
        Box::pin(async move {
            detail.ok_or(ProviderError::NotFound {
                what: format!("match {external_id}"),
            })
        })
    }
}

/// Build a fully wired state with the in-memory store already installed.
async fn scripted_state() -> (SharedState, ScriptedProvider, Arc<MemoryRecordStore>) {
    let provider = ScriptedProvider::default();
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(provider.clone()),
        scoring::unchanged_policy(),
    );
    let store = Arc::new(MemoryRecordStore::new());
    state.install_record_store(store.clone()).await;
    (state, provider, store)
}

async fn register(state: &SharedState, name: &str, chat_id: &str) {
    lifecycle::register_player(
        state,
        lifecycle::RegisterPlayer {
            game_name: name.to_owned(),
            chat_id: chat_id.to_owned(),
            chat_name: format!("{name} (chat)"),
            server: None,
        },
    )
    .await
    .expect("registration succeeds");
}

/// A 5v5 result where `winner_name` sat on team 100 and won.
fn detail_with_winner(game_id: i64, winner_name: &str, loser_name: &str) -> CompletedMatchDetail {
    CompletedMatchDetail {
        game_id,
        teams: vec![
            TeamResult {
                team_id: 100,
                win: "Win".into(),
            },
            TeamResult {
                team_id: 200,
                win: "Fail".into(),
            },
        ],
        participants: vec![
            MatchParticipant {
                participant_id: 1,
                team_id: 100,
            },
            MatchParticipant {
                participant_id: 2,
                team_id: 200,
            },
        ],
        identities: vec![
            ParticipantIdentity {
                participant_id: 1,
                game_name: winner_name.to_owned(),
            },
            ParticipantIdentity {
                participant_id: 2,
                game_name: loser_name.to_owned(),
            },
        ],
    }
}

#[tokio::test]
async fn registering_the_same_pair_twice_conflicts() {
    let (state, _provider, _store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    let err = lifecycle::register_player(
        &state,
        lifecycle::RegisterPlayer {
            game_name: "Alice".into(),
            chat_id: "chat-1".into(),
            chat_name: "Alice".into(),
            server: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Same account name under a different chat identity is fine.
    register(&state, "Alice", "chat-2").await;
    assert_eq!(lifecycle::get_all_players(&state).await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_registrations_of_the_same_pair_create_one_player() {
    let (state, _provider, _store) = scripted_state().await;
    let request = || lifecycle::RegisterPlayer {
        game_name: "Alice".into(),
        chat_id: "chat-1".into(),
        chat_name: "Alice".into(),
        server: None,
    };

    let (a, b) = tokio::join!(
        lifecycle::register_player(&state, request()),
        lifecycle::register_player(&state, request()),
    );
    assert!(a.is_ok() != b.is_ok());
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(lifecycle::get_all_players(&state).await.unwrap().len(), 1);
}

#[tokio::test]
async fn registering_a_match_opens_an_awaiting_record() {
    let (state, _provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    let record = lifecycle::register_match(&state, "chat-1", Some("general".into()))
        .await
        .unwrap();
    assert_eq!(record.status, MatchStatus::Awaiting);
    assert_eq!(record.external_id, None);
    assert_eq!(record.channel, "general");

    // Checking again without a live match keeps the same record open.
    let again = lifecycle::check_match(&state, "chat-1").await.unwrap();
    assert_eq!(again.id, record.id);
    assert_eq!(store.find_incomplete_matches().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_registrations_share_one_open_record() {
    let (state, _provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    let (a, b) = tokio::join!(
        lifecycle::register_match(&state, "chat-1", None),
        lifecycle::register_match(&state, "chat-1", None),
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(store.find_incomplete_matches().await.unwrap().len(), 1);
}

#[tokio::test]
async fn awaiting_record_times_out_after_the_tracking_window() {
    let (state, _provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    let record = lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();

    let mut events = state.events().subscribe();

    // Backdate past the window; the next check must drop the record.
    let mut stale = record.clone();
    stale.created_at -= state.config().awaiting_timeout_secs + 1;
    store.save_match(stale).await.unwrap();

    let err = lifecycle::check_match(&state, "chat-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::AwaitingTimeout));
    assert!(store.find_incomplete_matches().await.unwrap().is_empty());

    let event = events.try_recv().unwrap();
    assert!(matches!(event, LifecycleEvent::AwaitingTimeout(_)));
    assert_eq!(event.record().id, record.id);
}

#[tokio::test]
async fn awaiting_record_inside_the_window_stays_open() {
    let (state, _provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    let record = lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();

    let mut aged = record.clone();
    aged.created_at -= state.config().awaiting_timeout_secs - 1;
    store.save_match(aged).await.unwrap();

    let checked = lifecycle::check_match(&state, "chat-1").await.unwrap();
    assert_eq!(checked.id, record.id);
    assert_eq!(checked.status, MatchStatus::Awaiting);
}

#[tokio::test]
async fn live_match_promotes_awaiting_to_playing() {
    let (state, provider, _store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    let mut events = state.events().subscribe();

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 0,
        }),
    );

    let record = lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();
    assert_eq!(record.status, MatchStatus::Playing);
    assert_eq!(record.external_id, Some(42));

    let event = events.try_recv().unwrap();
    assert!(matches!(event, LifecycleEvent::GameStarted(_)));
    assert_eq!(event.name(), "GAME_STARTED");
}

#[tokio::test]
async fn already_running_match_aborts_tracking() {
    let (state, provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    let mut events = state.events().subscribe();

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 45,
        }),
    );

    let err = lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyStarted));
    assert!(store.find_incomplete_matches().await.unwrap().is_empty());

    let event = events.try_recv().unwrap();
    assert!(matches!(event, LifecycleEvent::GameAlreadyStarted(_)));
    assert_eq!(event.record().status, MatchStatus::Aborted);
}

#[tokio::test]
async fn finished_match_completes_and_scores_the_tracked_player() {
    let (state, provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    let mut events = state.events().subscribe();

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 0,
        }),
    );
    lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();
    let _ = events.try_recv(); // GAME_STARTED

    provider.set_live("acct-Alice", None);
    provider.set_detail(detail_with_winner(42, "Alice", "Stranger"));

    let record = lifecycle::check_match(&state, "chat-1").await.unwrap();
    assert_eq!(record.status, MatchStatus::Completed);
    assert!(record.completed);
    assert!(record.is_win);
    assert_eq!(record.players.len(), 1);
    assert_eq!(record.players[0].winner, Some(true));

    let player = store
        .find_player_by_chat_id("chat-1".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(player.games, 1);
    assert_eq!(player.wins, 1);
    assert_eq!(player.losses, 0);

    let event = events.try_recv().unwrap();
    assert!(matches!(event, LifecycleEvent::GameCompleted(_)));
}

#[tokio::test]
async fn correct_lose_prediction_is_counted() {
    let (state, provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();
    // Prediction set while the record is still awaiting.
    let predicted = lifecycle::change_prediction(&state, "chat-1", false)
        .await
        .unwrap();
    assert!(predicted.prediction.is_some());

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 0,
        }),
    );
    lifecycle::check_match(&state, "chat-1").await.unwrap();

    provider.set_live("acct-Alice", None);
    provider.set_detail(detail_with_winner(42, "Stranger", "Alice"));

    let record = lifecycle::check_match(&state, "chat-1").await.unwrap();
    assert!(!record.is_win);

    let player = store
        .find_player_by_chat_id("chat-1".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(player.losses, 1);
    assert_eq!(player.successful_lose_predictions, 1);
}

#[tokio::test]
async fn prediction_locks_once_the_match_has_been_running() {
    let (state, provider, _store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();

    // Inside the lock window the change goes through.
    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 10,
        }),
    );
    lifecycle::change_prediction(&state, "chat-1", true)
        .await
        .unwrap();

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 45,
        }),
    );
    let err = lifecycle::change_prediction(&state, "chat-1", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn prediction_without_an_open_match_is_not_found() {
    let (state, _provider, _store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    let err = lifecycle::change_prediction(&state, "chat-1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn reconcile_pass_merges_duplicates_before_completing() {
    let (state, provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    register(&state, "Bob", "chat-2").await;

    // Both players tracked the same external match independently.
    for (chat, account) in [("chat-1", "acct-Alice"), ("chat-2", "acct-Bob")] {
        provider.set_live(
            account,
            Some(LiveMatchState {
                game_id: 42,
                game_length: 0,
            }),
        );
        lifecycle::register_match(&state, chat, None).await.unwrap();
    }
    assert_eq!(store.find_incomplete_matches().await.unwrap().len(), 2);

    // A pass while the match is still live folds the duplicates and must
    // persist the unioned player list even though no transition happens.
    lifecycle::reconcile_all(&state).await.unwrap();
    let open = store.find_incomplete_matches().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].players.len(), 2);

    // The absorbed player can still act on the surviving record.
    lifecycle::change_prediction(&state, "chat-2", false)
        .await
        .unwrap();

    provider.set_live("acct-Alice", None);
    provider.set_live("acct-Bob", None);
    provider.set_detail(detail_with_winner(42, "Alice", "Bob"));
    lifecycle::reconcile_all(&state).await.unwrap();

    assert!(store.find_incomplete_matches().await.unwrap().is_empty());
    let all = store.list_matches(0, 10).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].players.len(), 2);
    assert!(all[0].is_win);

    let alice = store
        .find_player_by_chat_id("chat-1".into())
        .await
        .unwrap()
        .unwrap();
    let bob = store
        .find_player_by_chat_id("chat-2".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.wins, 1);
    // Bob is scored with the record-level result derived from the first
    // correlated player.
    assert_eq!(bob.games, 1);
}

#[tokio::test]
async fn completed_record_is_idempotent_under_reconcile() {
    let (state, provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;

    provider.set_live(
        "acct-Alice",
        Some(LiveMatchState {
            game_id: 42,
            game_length: 0,
        }),
    );
    lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();
    provider.set_live("acct-Alice", None);
    provider.set_detail(detail_with_winner(42, "Alice", "Stranger"));
    let completed = lifecycle::check_match(&state, "chat-1").await.unwrap();

    // Reconciling a completed record returns it unchanged and scores nothing.
    let alice = store
        .find_player_by_chat_id("chat-1".into())
        .await
        .unwrap()
        .unwrap();
    let again = lifecycle::reconcile(&state, completed.clone(), &alice)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, completed.id);
    assert_eq!(again.status, MatchStatus::Completed);

    lifecycle::reconcile_all(&state).await.unwrap();
    lifecycle::reconcile_all(&state).await.unwrap();

    let player = store
        .find_player_by_chat_id("chat-1".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(player.games, 1);
}

#[tokio::test]
async fn degraded_state_rejects_lifecycle_calls() {
    let provider = ScriptedProvider::default();
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(provider),
        scoring::unchanged_policy(),
    );

    let err = lifecycle::get_all_players(&state).await.unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
    assert!(state.is_degraded().await);
}

#[tokio::test]
async fn poller_start_is_idempotent_and_stop_halts_it() {
    let (state, _provider, _store) = scripted_state().await;

    poller::start(&state).await;
    assert!(poller::is_running(&state).await);

    // Starting again replaces the previous task instead of stacking one.
    poller::start(&state).await;
    assert!(poller::is_running(&state).await);

    poller::stop(&state).await;
    assert!(!poller::is_running(&state).await);
}

#[tokio::test]
async fn listing_matches_pages_in_creation_order() {
    let (state, _provider, store) = scripted_state().await;
    for i in 0..3 {
        let name = format!("Player{i}");
        let chat = format!("chat-{i}");
        register(&state, &name, &chat).await;
        let record = lifecycle::register_match(&state, &chat, None)
            .await
            .unwrap();
        // Spread creation times so ordering is deterministic.
        let mut adjusted = record;
        adjusted.created_at += i;
        store.save_match(adjusted).await.unwrap();
    }

    let page = lifecycle::get_games(&state, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    let all = lifecycle::get_games(&state, 0, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn vanished_player_does_not_poison_a_reconcile_pass() {
    let (state, _provider, store) = scripted_state().await;
    register(&state, "Alice", "chat-1").await;
    register(&state, "Bob", "chat-2").await;
    lifecycle::register_match(&state, "chat-1", None)
        .await
        .unwrap();
    lifecycle::register_match(&state, "chat-2", None)
        .await
        .unwrap();

    // Orphan Alice's record: rebuild the store with both match records but
    // only Bob's player row.
    let bob = store
        .find_player_by_chat_id("chat-2".into())
        .await
        .unwrap()
        .unwrap();
    let fresh = Arc::new(MemoryRecordStore::new());
    fresh.create_player(bob).await.unwrap();
    for record in store.find_incomplete_matches().await.unwrap() {
        fresh.create_match(record).await.unwrap();
    }
    state.install_record_store(fresh.clone()).await;

    // The pass logs the orphan and still reconciles Bob's record.
    lifecycle::reconcile_all(&state).await.unwrap();
    assert_eq!(fresh.find_incomplete_matches().await.unwrap().len(), 2);
}
