//! Ladder-score adjustment policy.
//!
//! The scoring rule is an injected pure function so the policy can change
//! without touching the lifecycle state machine. Counter bookkeeping is not
//! part of the policy; [`apply_result`] always maintains it.

use std::sync::Arc;

use crate::dao::models::PlayerEntity;

/// Pure scoring rule: `(current score, won, predicted correctly) -> new score`.
pub type ScorePolicy = Arc<dyn Fn(i64, bool, bool) -> i64 + Send + Sync>;

/// Policy that leaves the ladder score untouched.
pub fn unchanged_policy() -> ScorePolicy {
    Arc::new(|score, _won, _predicted| score)
}

/// Record a completed match on a player: bump the counters and run the
/// injected score policy. `won` is the outcome of the tracked side and
/// `predicted` whether the pre-match prediction matched it.
pub fn apply_result(player: &mut PlayerEntity, won: bool, predicted: bool, policy: &ScorePolicy) {
    player.games += 1;
    if won {
        player.wins += 1;
    } else {
        player.losses += 1;
        if predicted {
            player.successful_lose_predictions += 1;
        }
    }
    player.ladder_score = policy(player.ladder_score, won, predicted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player() -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            game_name: "Tracked One".into(),
            account_id: "acc-1".into(),
            chat_id: "chat-1".into(),
            chat_name: "tracked".into(),
            server: "euw1".into(),
            games: 0,
            wins: 0,
            losses: 0,
            successful_lose_predictions: 0,
            ladder_score: 0,
        }
    }

    #[test]
    fn win_bumps_games_and_wins() {
        let mut p = player();
        apply_result(&mut p, true, true, &unchanged_policy());
        assert_eq!((p.games, p.wins, p.losses), (1, 1, 0));
        assert_eq!(p.successful_lose_predictions, 0);
    }

    #[test]
    fn predicted_loss_bumps_lose_prediction_counter() {
        let mut p = player();
        apply_result(&mut p, false, true, &unchanged_policy());
        assert_eq!((p.games, p.wins, p.losses), (1, 0, 1));
        assert_eq!(p.successful_lose_predictions, 1);
    }

    #[test]
    fn unpredicted_loss_leaves_prediction_counter() {
        let mut p = player();
        apply_result(&mut p, false, false, &unchanged_policy());
        assert_eq!(p.successful_lose_predictions, 0);
    }

    #[test]
    fn injected_policy_drives_the_score() {
        let policy: ScorePolicy = Arc::new(|score, won, predicted| {
            score + if won { 3 } else { -3 } + if predicted { 1 } else { 0 }
        });
        let mut p = player();
        apply_result(&mut p, false, true, &policy);
        assert_eq!(p.ladder_score, -2);
    }
}
