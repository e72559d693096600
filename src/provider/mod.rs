//! Match-data provider seam.
//!
//! The lifecycle only ever talks to [`MatchProvider`]; the HTTP
//! implementation lives in [`http`] and tests script their own.

pub mod http;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error raised by the external match-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested player or match does not exist upstream.
    #[error("provider has no record of {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },
    /// The provider rejected the request because of rate limiting.
    #[error("provider rate limit exceeded")]
    RateLimited,
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuilder(#[source] reqwest::Error),
    /// Any other upstream failure (transport error or unexpected status).
    #[error("provider request failed: {message}")]
    Upstream {
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
        /// Human-readable failure description.
        message: String,
    },
}

/// Account identity returned by a player lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// Provider-side player id.
    pub id: String,
    /// Account id used for live-match lookups.
    pub account_id: String,
    /// Display name as reported by the provider.
    pub name: String,
}

/// State of an in-progress external match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveMatchState {
    /// External match id.
    pub game_id: i64,
    /// Elapsed game time in seconds.
    pub game_length: i64,
}

/// One of the two team results inside a completed match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamResult {
    /// Provider-side team id.
    pub team_id: i32,
    /// Win indicator string as reported by the provider.
    pub win: String,
}

impl TeamResult {
    /// Whether the provider marked this team as the winner.
    pub fn is_winner(&self) -> bool {
        self.win.eq_ignore_ascii_case("win")
    }
}

/// Team membership of a single participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchParticipant {
    /// Participant slot id, unique within the match.
    pub participant_id: i32,
    /// Team this participant played on.
    pub team_id: i32,
}

/// Mapping from a participant slot to a display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantIdentity {
    /// Participant slot id, unique within the match.
    pub participant_id: i32,
    /// Display name of the account behind this slot.
    pub game_name: String,
}

/// Full detail of a completed external match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedMatchDetail {
    /// External match id.
    pub game_id: i64,
    /// The two team results; exactly one should carry the win indicator.
    pub teams: Vec<TeamResult>,
    /// Team membership for every participant slot.
    pub participants: Vec<MatchParticipant>,
    /// Display names for every participant slot.
    pub identities: Vec<ParticipantIdentity>,
}

/// Client abstraction over the external match-data source.
pub trait MatchProvider: Send + Sync {
    /// Resolve a display name on a server to an account identity.
    fn lookup_player(
        &self,
        name: String,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<PlayerIdentity>>;
    /// Current live match for an account, `None` when nothing is in progress.
    fn lookup_active_match(
        &self,
        account_id: String,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<Option<LiveMatchState>>>;
    /// Full detail of a finished match.
    fn lookup_completed_match(
        &self,
        external_id: i64,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<CompletedMatchDetail>>;
}
