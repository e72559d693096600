//! HTTP implementation of [`MatchProvider`].

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode, header::HeaderMap, header::HeaderValue};
use serde::Deserialize;

use super::{
    CompletedMatchDetail, LiveMatchState, MatchParticipant, MatchProvider, ParticipantIdentity,
    PlayerIdentity, ProviderError, ProviderResult, TeamResult,
};

/// Header carrying the provider API key.
const API_KEY_HEADER: &str = "X-Api-Token";
/// Placeholder in the base URL template replaced by the server tag.
const SERVER_PLACEHOLDER: &str = "{server}";

/// Provider client talking to the upstream REST API with a per-process
/// identity cache, mirroring how often the same roster names are resolved.
#[derive(Clone)]
pub struct HttpMatchProvider {
    inner: Arc<HttpInner>,
}

struct HttpInner {
    client: Client,
    base_url: String,
    identities: DashMap<String, PlayerIdentity>,
}

impl HttpMatchProvider {
    /// Build a client for `base_url` (containing a `{server}` placeholder)
    /// authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert(API_KEY_HEADER, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ProviderError::ClientBuilder)?;

        Ok(Self {
            inner: Arc::new(HttpInner {
                client,
                base_url: base_url.into(),
                identities: DashMap::new(),
            }),
        })
    }

    fn url(&self, server: &str, path: &str) -> String {
        let base = self.inner.base_url.replace(SERVER_PLACEHOLDER, server);
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    async fn get(&self, url: String) -> ProviderResult<Response> {
        self.inner
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ProviderError::Upstream {
                status: None,
                message: err.to_string(),
            })
    }
}

/// Percent-encode a display name so it is safe inside a URL path segment.
fn encode_path_segment(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Map an error status to the provider taxonomy; `not_found` describes the
/// resource a 404 refers to.
fn status_error(status: StatusCode, not_found: impl Into<String>) -> ProviderError {
    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound {
            what: not_found.into(),
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        other => ProviderError::Upstream {
            status: Some(other.as_u16()),
            message: format!("unexpected status {other}"),
        },
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> ProviderResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| ProviderError::Upstream {
            status: None,
            message: format!("malformed provider payload: {err}"),
        })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    id: String,
    account_id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLiveMatch {
    game_id: i64,
    game_length: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTeam {
    team_id: i32,
    win: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParticipant {
    participant_id: i32,
    team_id: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParticipantIdentity {
    participant_id: i32,
    player: RawIdentityName,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentityName {
    summoner_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatchDetail {
    game_id: i64,
    teams: Vec<RawTeam>,
    participants: Vec<RawParticipant>,
    participant_identities: Vec<RawParticipantIdentity>,
}

impl From<RawMatchDetail> for CompletedMatchDetail {
    fn from(raw: RawMatchDetail) -> Self {
        Self {
            game_id: raw.game_id,
            teams: raw
                .teams
                .into_iter()
                .map(|team| TeamResult {
                    team_id: team.team_id,
                    win: team.win,
                })
                .collect(),
            participants: raw
                .participants
                .into_iter()
                .map(|participant| MatchParticipant {
                    participant_id: participant.participant_id,
                    team_id: participant.team_id,
                })
                .collect(),
            identities: raw
                .participant_identities
                .into_iter()
                .map(|identity| ParticipantIdentity {
                    participant_id: identity.participant_id,
                    game_name: identity.player.summoner_name,
                })
                .collect(),
        }
    }
}

impl MatchProvider for HttpMatchProvider {
    fn lookup_player(
        &self,
        name: String,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<PlayerIdentity>> {
        let provider = self.clone();
        Box::pin(async move {
            let cache_key = name.to_lowercase();
            if let Some(cached) = provider.inner.identities.get(&cache_key) {
                return Ok(cached.clone());
            }

            let url = provider.url(
                &server,
                &format!("/players/by-name/{}", encode_path_segment(&name)),
            );
            let response = provider.get(url).await?;
            if !response.status().is_success() {
                return Err(status_error(
                    response.status(),
                    format!("player `{name}` on `{server}`"),
                ));
            }

            let raw: RawIdentity = decode(response).await?;
            let identity = PlayerIdentity {
                id: raw.id,
                account_id: raw.account_id,
                name: raw.name,
            };
            provider.inner.identities.insert(cache_key, identity.clone());
            Ok(identity)
        })
    }

    fn lookup_active_match(
        &self,
        account_id: String,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<Option<LiveMatchState>>> {
        let provider = self.clone();
        Box::pin(async move {
            let url = provider.url(&server, &format!("/live-matches/by-account/{account_id}"));
            let response = provider.get(url).await?;
            // No live match in progress is reported as 404 upstream.
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(status_error(response.status(), "live match"));
            }

            let raw: RawLiveMatch = decode(response).await?;
            Ok(Some(LiveMatchState {
                game_id: raw.game_id,
                game_length: raw.game_length,
            }))
        })
    }

    fn lookup_completed_match(
        &self,
        external_id: i64,
        server: String,
    ) -> BoxFuture<'static, ProviderResult<CompletedMatchDetail>> {
        let provider = self.clone();
        Box::pin(async move {
            let url = provider.url(&server, &format!("/matches/{external_id}"));
            let response = provider.get(url).await?;
            if !response.status().is_success() {
                return Err(status_error(
                    response.status(),
                    format!("match `{external_id}`"),
                ));
            }

            let raw: RawMatchDetail = decode(response).await?;
            Ok(raw.into())
        })
    }
}
