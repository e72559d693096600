//! Periodic timer driving the reconciliation loop.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::{services::lifecycle, state::SharedState};

/// Start the reconciliation timer, replacing a previous one if running.
pub async fn start(state: &SharedState) {
    let mut slot = state.poller_slot().lock().await;
    if let Some(previous) = slot.take() {
        previous.abort();
        info!("replaced running reconciliation timer");
    }

    let tick_state = state.clone();
    let period = state.config().poll_interval;
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        // A pass that overruns the interval should not cause a burst of
        // catch-up passes afterwards.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = lifecycle::reconcile_all(&tick_state).await {
                warn!(error = %err, "reconciliation pass failed");
            }
        }
    });

    *slot = Some(handle);
    info!(period_secs = period.as_secs(), "reconciliation timer started");
}

/// Stop the reconciliation timer if one is running.
pub async fn stop(state: &SharedState) {
    let mut slot = state.poller_slot().lock().await;
    if let Some(handle) = slot.take() {
        handle.abort();
        info!("reconciliation timer stopped");
    }
}

/// Whether the timer task is currently installed.
pub async fn is_running(state: &SharedState) -> bool {
    state.poller_slot().lock().await.is_some()
}
