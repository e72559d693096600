//! Match lifecycle orchestration.
//!
//! The reconciliation loop correlates locally tracked match records with the
//! externally observed match state: awaiting records get promoted to playing
//! when a live match shows up (or dropped when tracking started late or
//! nothing shows up within the tracking window), playing records get
//! completed once the live match disappears, and duplicate records that
//! converged on the same external match are merged.

use std::{collections::HashSet, sync::Arc};

use futures::future::join_all;
use indexmap::IndexMap;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{MatchEntity, MatchPlayerEntity, MatchStatus, PlayerEntity, Prediction},
        record_store::RecordStore,
    },
    error::ServiceError,
    provider::CompletedMatchDetail,
    services::scoring,
    state::{LifecycleEvent, SharedState},
};

/// Registration payload resolved by the chat-facing entry points.
#[derive(Debug, Clone)]
pub struct RegisterPlayer {
    /// Display name on the game account.
    pub game_name: String,
    /// Owning chat identity.
    pub chat_id: String,
    /// Owning chat display name.
    pub chat_name: String,
    /// Server tag; the configured default applies when absent.
    pub server: Option<String>,
}

/// Current time in seconds since the Unix epoch.
fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Register a new tracked player, resolving their account identity through
/// the match provider. Registering the same (game name, chat id) pair twice
/// is a conflict.
pub async fn register_player(
    state: &SharedState,
    request: RegisterPlayer,
) -> Result<PlayerEntity, ServiceError> {
    let store = state.require_record_store().await?;
    let server = request
        .server
        .unwrap_or_else(|| state.config().default_server.clone());

    if request.game_name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "game name must not be empty".into(),
        ));
    }

    let identity = state
        .provider()
        .lookup_player(request.game_name.clone(), server.clone())
        .await?;

    // The duplicate check and the insert must not interleave with a
    // concurrent registration of the same pair.
    let gate = state.registration_gate(&request.game_name, &request.chat_id);
    let _guard = gate.lock().await;

    let existing = store
        .find_players_by_game_name(request.game_name.clone())
        .await?;
    if existing
        .iter()
        .any(|player| player.chat_id == request.chat_id)
    {
        return Err(ServiceError::Conflict(format!(
            "`{}` is already registered for this chat user",
            request.game_name
        )));
    }

    let player = PlayerEntity {
        id: Uuid::new_v4(),
        game_name: request.game_name,
        account_id: identity.account_id,
        chat_id: request.chat_id,
        chat_name: request.chat_name,
        server,
        games: 0,
        wins: 0,
        losses: 0,
        successful_lose_predictions: 0,
        ladder_score: 0,
    };
    store.create_player(player.clone()).await?;
    info!(player = %player.game_name, "registered player");
    Ok(player)
}

/// All registered players.
pub async fn get_all_players(state: &SharedState) -> Result<Vec<PlayerEntity>, ServiceError> {
    let store = state.require_record_store().await?;
    Ok(store.list_players().await?)
}

/// Page of match records ordered by creation time.
pub async fn get_games(
    state: &SharedState,
    offset: u64,
    limit: u64,
) -> Result<Vec<MatchEntity>, ServiceError> {
    let store = state.require_record_store().await?;
    Ok(store.list_matches(offset, limit).await?)
}

/// Start (or re-check) tracking for the player behind `chat_id`, opening a
/// new awaiting record bound to `channel` when none is open yet.
pub async fn register_match(
    state: &SharedState,
    chat_id: &str,
    channel: Option<String>,
) -> Result<MatchEntity, ServiceError> {
    let player = require_player_by_chat_id(state, chat_id).await?;
    check_match_by_player(state, &player, channel).await
}

/// Re-check the open match for the player behind `chat_id`.
pub async fn check_match(state: &SharedState, chat_id: &str) -> Result<MatchEntity, ServiceError> {
    let player = require_player_by_chat_id(state, chat_id).await?;
    check_match_by_player(state, &player, None).await
}

/// Change the prediction on the player's open match. Rejected once the
/// correlated live match reports more elapsed time than the lock window,
/// because at that point the outcome is effectively knowable.
pub async fn change_prediction(
    state: &SharedState,
    chat_id: &str,
    win: bool,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_record_store().await?;
    let player = require_player_by_chat_id(state, chat_id).await?;

    let Some(mut record) = store.find_open_match(player.id).await? else {
        return Err(ServiceError::NotFound(format!(
            "no open match for `{}`",
            player.game_name
        )));
    };

    let live = state
        .provider()
        .lookup_active_match(player.account_id.clone(), player.server.clone())
        .await?;
    if let Some(live) = live {
        if live.game_length > state.config().prediction_lock_secs {
            return Err(ServiceError::Conflict(
                "match is already running; predictions are locked".into(),
            ));
        }
    }

    record.prediction = Some(if win { Prediction::Win } else { Prediction::Fail });
    store.save_match(record.clone()).await?;
    Ok(record)
}

async fn require_player_by_chat_id(
    state: &SharedState,
    chat_id: &str,
) -> Result<PlayerEntity, ServiceError> {
    let store = state.require_record_store().await?;
    store
        .find_player_by_chat_id(chat_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no player registered for chat id `{chat_id}`")))
}

async fn check_match_by_player(
    state: &SharedState,
    player: &PlayerEntity,
    channel: Option<String>,
) -> Result<MatchEntity, ServiceError> {
    let record = find_or_create_game(state, player, channel).await?;
    let reconciled = reconcile(state, record.clone(), player).await?;
    Ok(reconciled.unwrap_or(record))
}

/// Find the player's single open match or create a fresh awaiting record.
///
/// The per-player gate makes the read-then-insert atomic with respect to
/// concurrent callers, upholding the one-incomplete-match-per-player
/// invariant.
async fn find_or_create_game(
    state: &SharedState,
    player: &PlayerEntity,
    channel: Option<String>,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_record_store().await?;
    let gate = state.player_gate(player.id);
    let _guard = gate.lock().await;

    if let Some(open) = store.find_open_match(player.id).await? {
        return Ok(open);
    }

    let record = MatchEntity {
        id: Uuid::new_v4(),
        external_id: None,
        status: MatchStatus::Awaiting,
        created_at: now_epoch(),
        channel: channel.unwrap_or_default(),
        prediction: None,
        is_win: false,
        completed: false,
        server: player.server.clone(),
        players: vec![MatchPlayerEntity {
            player_id: player.id,
            winner: None,
        }],
    };
    store.create_match(record.clone()).await?;
    debug!(match_id = %record.id, player = %player.game_name, "opened awaiting match");
    Ok(record)
}

/// De-duplication plan computed over one snapshot of the open records.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct MergePlan {
    /// Records to reconcile this pass, duplicates already folded in.
    pub survivors: Vec<MatchEntity>,
    /// Ids of survivors whose player list absorbed a duplicate and must be
    /// persisted before the redundant records are deleted.
    pub merged: Vec<Uuid>,
    /// Ids of redundant duplicate records to delete.
    pub redundant: Vec<Uuid>,
}

/// Group records by external match id and union the player sub-records of
/// duplicates into the first-seen record. Records without an external id are
/// never merged with each other. Idempotent: merging an already-merged
/// snapshot yields the same survivors and no redundant ids.
pub(crate) fn merge_duplicates(records: Vec<MatchEntity>) -> MergePlan {
    let mut plan = MergePlan::default();
    let mut by_external: IndexMap<i64, MatchEntity> = IndexMap::new();

    for record in records {
        let Some(external_id) = record.external_id else {
            plan.survivors.push(record);
            continue;
        };

        match by_external.entry(external_id) {
            indexmap::map::Entry::Occupied(mut entry) => {
                let first = entry.get_mut();
                let mut absorbed = false;
                for sub in &record.players {
                    if !first.tracks_player(sub.player_id) {
                        first.players.push(sub.clone());
                        absorbed = true;
                    }
                }
                if absorbed && !plan.merged.contains(&first.id) {
                    plan.merged.push(first.id);
                }
                plan.redundant.push(record.id);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }
    }

    plan.survivors.extend(by_external.into_values());
    plan
}

/// One timer tick: load the open records, fold duplicates, reconcile every
/// survivor, and drop the redundant duplicates.
///
/// Survivors reconcile concurrently; a failure on one record never stops
/// the others, it is logged and the pass continues.
pub async fn reconcile_all(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_record_store().await?;
    let open = store.find_incomplete_matches().await?;
    if open.is_empty() {
        return Ok(());
    }

    let plan = merge_duplicates(open);
    debug!(
        survivors = plan.survivors.len(),
        merged = plan.merged.len(),
        redundant = plan.redundant.len(),
        "reconciliation pass"
    );

    // Apply the merge as upsert-then-delete before reconciling: a survivor
    // that makes no transition this cycle must still carry every absorbed
    // sub-record in the store once the duplicates are gone.
    for record in &plan.survivors {
        if plan.merged.contains(&record.id) {
            store.save_match(record.clone()).await?;
        }
    }
    for id in plan.redundant {
        match store.delete_match(id).await {
            Ok(_) => info!(match_id = %id, "deleted duplicate match record"),
            Err(err) => warn!(match_id = %id, error = %err, "failed to delete duplicate"),
        }
    }

    let passes = plan
        .survivors
        .into_iter()
        .map(|record| reconcile_record(state, store.clone(), record));
    join_all(passes).await;

    Ok(())
}

/// Resolve the owning player of one surviving record and reconcile it,
/// reporting any failure instead of propagating it.
async fn reconcile_record(state: &SharedState, store: Arc<dyn RecordStore>, record: MatchEntity) {
    let Some(first) = record.players.first() else {
        warn!(match_id = %record.id, "open match has no player sub-records");
        return;
    };

    let player = match store.find_player(first.player_id).await {
        Ok(Some(player)) => player,
        Ok(None) => {
            warn!(match_id = %record.id, player_id = %first.player_id, "tracked player vanished");
            return;
        }
        Err(err) => {
            warn!(match_id = %record.id, error = %err, "player lookup failed");
            return;
        }
    };

    let match_id = record.id;
    if let Err(err) = reconcile(state, record, &player).await {
        warn!(match_id = %match_id, error = %err, "match reconciliation failed");
    }
}

/// Advance one match record against the freshest live-match observation.
///
/// Returns the updated record when a transition happened, `Ok(None)` when
/// nothing changed this cycle. [`ServiceError::AwaitingTimeout`] and
/// [`ServiceError::AlreadyStarted`] report that the record was deleted as
/// part of failing; callers must not retry it.
pub async fn reconcile(
    state: &SharedState,
    mut record: MatchEntity,
    player: &PlayerEntity,
) -> Result<Option<MatchEntity>, ServiceError> {
    if record.completed {
        return Ok(Some(record));
    }

    let store = state.require_record_store().await?;
    // Single observation per call: every branch below works off this one
    // query so no transition straddles two external reads.
    let live = state
        .provider()
        .lookup_active_match(player.account_id.clone(), player.server.clone())
        .await?;

    let Some(live) = live else {
        if record.status == MatchStatus::Playing && record.external_id.is_some() {
            let completed = complete_game(state, store.as_ref(), record).await?;
            return Ok(Some(completed));
        }

        let waited = now_epoch() - record.created_at;
        if waited > state.config().awaiting_timeout_secs {
            store.delete_match(record.id).await?;
            info!(match_id = %record.id, waited, "awaiting match timed out; deleted");
            state.events().emit(LifecycleEvent::AwaitingTimeout(record));
            return Err(ServiceError::AwaitingTimeout);
        }
        return Ok(None);
    };

    match record.status {
        MatchStatus::Awaiting => {
            record.external_id = Some(live.game_id);
            record.status = MatchStatus::Playing;
            store.save_match(record.clone()).await?;

            // Fairness rule: a live match that did not start at the moment
            // of tracking would allow predicting a half-known outcome.
            if live.game_length > 0 {
                store.delete_match(record.id).await?;
                record.status = MatchStatus::Aborted;
                info!(
                    match_id = %record.id,
                    game_length = live.game_length,
                    "match already started; record aborted"
                );
                state
                    .events()
                    .emit(LifecycleEvent::GameAlreadyStarted(record));
                return Err(ServiceError::AlreadyStarted);
            }

            info!(match_id = %record.id, external_id = live.game_id, "match started");
            state
                .events()
                .emit(LifecycleEvent::GameStarted(record.clone()));
            Ok(Some(record))
        }
        // Still playing; nothing to do this cycle.
        MatchStatus::Playing => Ok(None),
        // Unreachable after the completed early-return; defensive no-op.
        MatchStatus::Completed | MatchStatus::Aborted => Ok(Some(record)),
    }
}

/// Participant ids on the winning team; exactly one of the two reported
/// teams must carry the win indicator.
fn winning_participants(detail: &CompletedMatchDetail) -> Result<HashSet<i32>, ServiceError> {
    let winners: Vec<i32> = detail
        .teams
        .iter()
        .filter(|team| team.is_winner())
        .map(|team| team.team_id)
        .collect();
    if winners.len() != 1 {
        return Err(ServiceError::Validation(format!(
            "match `{}` reports {} winning teams",
            detail.game_id,
            winners.len()
        )));
    }
    let winning_team = winners[0];

    Ok(detail
        .participants
        .iter()
        .filter(|participant| participant.team_id == winning_team)
        .map(|participant| participant.participant_id)
        .collect())
}

/// Record the outcome of a finished match: correlate tracked players with
/// the participant list, derive the tracked side's result, update player
/// statistics through the score policy, and persist the terminal record.
async fn complete_game(
    state: &SharedState,
    store: &dyn RecordStore,
    mut record: MatchEntity,
) -> Result<MatchEntity, ServiceError> {
    let external_id = record.external_id.ok_or_else(|| {
        ServiceError::Validation(format!("match `{}` is playing without an external id", record.id))
    })?;

    let detail = state
        .provider()
        .lookup_completed_match(external_id, record.server.clone())
        .await?;
    let winners = winning_participants(&detail)?;

    let mut correlated: Vec<MatchPlayerEntity> = Vec::new();
    for identity in &detail.identities {
        let found = store
            .find_players_by_game_name(identity.game_name.clone())
            .await?;
        if let Some(player) = found.first() {
            correlated.push(MatchPlayerEntity {
                player_id: player.id,
                winner: Some(winners.contains(&identity.participant_id)),
            });
        }
    }

    if correlated.is_empty() {
        return Err(ServiceError::Validation(format!(
            "match `{external_id}` completed without any correlated tracked player"
        )));
    }

    let is_win = correlated[0].winner.unwrap_or(false);
    let predicted = match record.prediction {
        Some(Prediction::Win) => is_win,
        Some(Prediction::Fail) => !is_win,
        None => false,
    };

    record.players = correlated;
    record.is_win = is_win;
    record.completed = true;
    record.status = MatchStatus::Completed;

    for sub in &record.players {
        let Some(mut player) = store.find_player(sub.player_id).await? else {
            warn!(player_id = %sub.player_id, "correlated player vanished before scoring");
            continue;
        };
        scoring::apply_result(&mut player, is_win, predicted, state.score_policy());
        store.save_player(player).await?;
    }

    store.save_match(record.clone()).await?;
    info!(match_id = %record.id, external_id, is_win, predicted, "match completed");
    state
        .events()
        .emit(LifecycleEvent::GameCompleted(record.clone()));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: Option<i64>, players: &[Uuid]) -> MatchEntity {
        MatchEntity {
            id: Uuid::new_v4(),
            external_id,
            status: if external_id.is_some() {
                MatchStatus::Playing
            } else {
                MatchStatus::Awaiting
            },
            created_at: 0,
            channel: String::new(),
            prediction: None,
            is_win: false,
            completed: false,
            server: "euw1".into(),
            players: players
                .iter()
                .map(|id| MatchPlayerEntity {
                    player_id: *id,
                    winner: None,
                })
                .collect(),
        }
    }

    #[test]
    fn merge_unions_players_into_first_seen_record() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = record(Some(7), &[a]);
        let second = record(Some(7), &[b]);
        let second_id = second.id;

        let plan = merge_duplicates(vec![first.clone(), second]);

        assert_eq!(plan.survivors.len(), 1);
        assert_eq!(plan.survivors[0].id, first.id);
        let players: Vec<Uuid> = plan.survivors[0]
            .players
            .iter()
            .map(|p| p.player_id)
            .collect();
        assert_eq!(players, vec![a, b]);
        assert_eq!(plan.merged, vec![first.id]);
        assert_eq!(plan.redundant, vec![second_id]);
    }

    #[test]
    fn merge_never_groups_awaiting_records() {
        let first = record(None, &[Uuid::new_v4()]);
        let second = record(None, &[Uuid::new_v4()]);

        let plan = merge_duplicates(vec![first, second]);

        assert_eq!(plan.survivors.len(), 2);
        assert!(plan.redundant.is_empty());
    }

    #[test]
    fn merge_is_idempotent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let plan = merge_duplicates(vec![record(Some(7), &[a]), record(Some(7), &[b])]);

        let again = merge_duplicates(plan.survivors);
        assert_eq!(again.survivors.len(), 1);
        assert!(again.merged.is_empty());
        assert!(again.redundant.is_empty());
        assert_eq!(
            again.survivors[0]
                .players
                .iter()
                .map(|p| p.player_id)
                .collect::<Vec<_>>(),
            vec![a, b]
        );
    }

    #[test]
    fn merge_skips_already_tracked_players() {
        let a = Uuid::new_v4();
        let plan = merge_duplicates(vec![record(Some(7), &[a]), record(Some(7), &[a])]);

        assert_eq!(plan.survivors[0].players.len(), 1);
        // Nothing absorbed, so the survivor needs no re-save.
        assert!(plan.merged.is_empty());
        assert_eq!(plan.redundant.len(), 1);
    }

    #[test]
    fn distinct_external_ids_are_kept_apart() {
        let plan = merge_duplicates(vec![
            record(Some(1), &[Uuid::new_v4()]),
            record(Some(2), &[Uuid::new_v4()]),
        ]);

        assert_eq!(plan.survivors.len(), 2);
        assert!(plan.redundant.is_empty());
    }
}
