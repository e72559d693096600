//! Startup fetch of the ladder definition sheet.

use tracing::{info, warn};

use crate::{
    error::ServiceError,
    ladder::{LadderTable, SheetDocument},
    state::SharedState,
};

/// Fetch the configured ladder sheet, build the table, and install it.
///
/// Failures are logged rather than fatal: the service runs fine with an
/// empty ladder, players simply get no rank title until a restart.
pub async fn load_ladder(state: &SharedState) {
    let Some(url) = state.config().ladder_sheet_url.clone() else {
        return;
    };

    match fetch_and_build(&url).await {
        Ok(table) => {
            info!(buckets = table.buckets().len(), "ladder table installed");
            state.install_ladder(table).await;
        }
        Err(err) => {
            warn!(url = %url, error = %err, "failed to load ladder sheet; titles will be empty");
        }
    }
}

async fn fetch_and_build(url: &str) -> Result<LadderTable, ServiceError> {
    let response = reqwest::get(url)
        .await
        .map_err(|err| ServiceError::Validation(format!("ladder sheet fetch failed: {err}")))?;
    if !response.status().is_success() {
        return Err(ServiceError::Validation(format!(
            "ladder sheet fetch returned status {}",
            response.status()
        )));
    }

    let document: SheetDocument = response
        .json()
        .await
        .map_err(|err| ServiceError::Validation(format!("malformed ladder sheet: {err}")))?;

    LadderTable::build(&document).map_err(|err| ServiceError::Validation(err.to_string()))
}
