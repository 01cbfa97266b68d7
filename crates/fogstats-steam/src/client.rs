//! HTTP client for the Steam Web API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use fogstats_core::{AchievementDefinition, PlayerAchievement, PlayerStats, UpstreamError};

use crate::provider::{PlayerIdentity, StatsProvider};
use crate::types::{
    GlobalPercentagesEnvelope, PlayerAchievementsEnvelope, PlayerSummariesEnvelope,
    ResolveVanityEnvelope, SchemaEnvelope, UserStatsEnvelope,
};

const DEFAULT_BASE_URL: &str = "https://api.steampowered.com";

/// Configuration for the Steam client.
#[derive(Debug, Clone)]
pub struct SteamClientConfig {
    /// API base URL; overridable for tests.
    pub base_url: Url,
    /// Web API key. Sent as a query parameter, never logged.
    pub api_key: String,
    /// Fixed game identifier all stats/achievements queries are keyed by.
    pub app_id: u32,
    /// Per-request timeout (default: 10 seconds).
    pub request_timeout: Duration,
}

impl SteamClientConfig {
    pub fn new(api_key: impl Into<String>, app_id: u32) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            api_key: api_key.into(),
            app_id,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Client for the Steam Web API endpoints the aggregator consumes.
pub struct SteamClient {
    http: reqwest::Client,
    config: SteamClientConfig,
}

impl SteamClient {
    /// Creates a new client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: SteamClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http, config }
    }

    /// Issues a GET to `interface_path` with the API key and extra query
    /// parameters, classifying every failure into [`UpstreamError`].
    async fn get_json<T: DeserializeOwned>(
        &self,
        interface_path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, UpstreamError> {
        let mut url = self
            .config
            .base_url
            .join(interface_path)
            .map_err(|e| UpstreamError::unknown(format!("{context}: bad url: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }

        tracing::debug!(endpoint = interface_path, "steam api request");

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| classify_transport(&e, context))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            return Err(classify_status(status, retry_after, context));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::warn!(endpoint = interface_path, error = %e, "steam response decode failed");
            UpstreamError::malformed(format!("{context}: {e}"))
        })
    }

    async fn lookup_summary(&self, steam_id: &str) -> Result<PlayerIdentity, UpstreamError> {
        let envelope: PlayerSummariesEnvelope = self
            .get_json(
                "/ISteamUser/GetPlayerSummaries/v2/",
                &[("steamids", steam_id.to_string())],
                "player summaries",
            )
            .await?;

        envelope
            .response
            .players
            .into_iter()
            .next()
            .map(|p| PlayerIdentity {
                steam_id: p.steamid,
                display_name: p.personaname,
            })
            .ok_or_else(|| UpstreamError::not_found(format!("no player with id {steam_id}")))
    }

    async fn resolve_vanity(&self, vanity: &str) -> Result<String, UpstreamError> {
        let envelope: ResolveVanityEnvelope = self
            .get_json(
                "/ISteamUser/ResolveVanityURL/v1/",
                &[("vanityurl", vanity.to_string())],
                "vanity resolution",
            )
            .await?;

        let resolved = envelope.response;
        if resolved.success == 1
            && let Some(steam_id) = resolved.steamid
        {
            return Ok(steam_id);
        }

        Err(UpstreamError::not_found(format!(
            "no player with vanity name {vanity}{}",
            resolved
                .message
                .map(|m| format!(" ({m})"))
                .unwrap_or_default()
        )))
    }
}

#[async_trait]
impl StatsProvider for SteamClient {
    async fn resolve_player(&self, query: &str) -> Result<PlayerIdentity, UpstreamError> {
        let steam_id = if is_steam_id64(query) {
            query.to_string()
        } else {
            self.resolve_vanity(query).await?
        };
        self.lookup_summary(&steam_id).await
    }

    async fn get_user_stats(&self, steam_id: &str) -> Result<PlayerStats, UpstreamError> {
        let envelope: UserStatsEnvelope = self
            .get_json(
                "/ISteamUserStats/GetUserStatsForGame/v2/",
                &[
                    ("steamid", steam_id.to_string()),
                    ("appid", self.config.app_id.to_string()),
                ],
                "user stats",
            )
            .await?;

        let stats = envelope
            .playerstats
            .stats
            .into_iter()
            .map(|s| (s.name, s.value))
            .collect();
        Ok(PlayerStats { stats })
    }

    async fn get_player_achievements(
        &self,
        steam_id: &str,
    ) -> Result<Vec<PlayerAchievement>, UpstreamError> {
        let envelope: PlayerAchievementsEnvelope = self
            .get_json(
                "/ISteamUserStats/GetPlayerAchievements/v1/",
                &[
                    ("steamid", steam_id.to_string()),
                    ("appid", self.config.app_id.to_string()),
                ],
                "player achievements",
            )
            .await?;

        let payload = envelope.playerstats;
        if !payload.success && payload.achievements.is_empty() {
            // Steam reports e.g. "Profile is not public" this way.
            return Err(UpstreamError::not_found(
                payload
                    .error
                    .unwrap_or_else(|| "no achievement data for player".to_string()),
            ));
        }

        Ok(payload
            .achievements
            .into_iter()
            .map(PlayerAchievement::from)
            .collect())
    }

    async fn get_achievement_schema(
        &self,
    ) -> Result<Vec<AchievementDefinition>, UpstreamError> {
        let envelope: SchemaEnvelope = self
            .get_json(
                "/ISteamUserStats/GetSchemaForGame/v2/",
                &[("appid", self.config.app_id.to_string())],
                "achievement schema",
            )
            .await?;

        Ok(envelope
            .game
            .available_game_stats
            .map(|s| {
                s.achievements
                    .into_iter()
                    .map(AchievementDefinition::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_global_percentages(&self) -> Result<BTreeMap<String, f64>, UpstreamError> {
        let envelope: GlobalPercentagesEnvelope = self
            .get_json(
                "/ISteamUserStats/GetGlobalAchievementPercentagesForApp/v2/",
                &[("gameid", self.config.app_id.to_string())],
                "global percentages",
            )
            .await?;

        Ok(envelope
            .achievementpercentages
            .achievements
            .into_iter()
            .map(|a| (a.name, a.percent))
            .collect())
    }
}

/// Canonical SteamID64s are 17 decimal digits.
fn is_steam_id64(query: &str) -> bool {
    query.len() == 17 && query.bytes().all(|b| b.is_ascii_digit())
}

/// Maps a non-success status to the error taxonomy.
fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    context: &str,
) -> UpstreamError {
    match status {
        StatusCode::NOT_FOUND => UpstreamError::not_found(format!("{context}: not found")),
        StatusCode::TOO_MANY_REQUESTS => {
            UpstreamError::rate_limited(format!("{context}: rate limited"), retry_after)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            UpstreamError::timeout(format!("{context}: upstream timeout ({status})"))
        }
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => {
            UpstreamError::unavailable(format!("{context}: upstream returned {status}"))
        }
        other => UpstreamError::unknown(format!("{context}: unexpected status {other}")),
    }
}

/// Maps a transport-level failure to the error taxonomy.
fn classify_transport(err: &reqwest::Error, context: &str) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::timeout(format!("{context}: request timed out"))
    } else if err.is_connect() {
        UpstreamError::unavailable(format!("{context}: connection failed"))
    } else {
        UpstreamError::unknown(format!("{context}: {err}"))
    }
}

/// Parses a Retry-After header given in seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_client(server: &MockServer) -> SteamClient {
        let config = SteamClientConfig::new("test-key", 381210)
            .with_base_url(Url::parse(&server.uri()).unwrap())
            .with_request_timeout(Duration::from_secs(2));
        SteamClient::new(config)
    }

    #[tokio::test]
    async fn test_resolve_player_by_steam_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
            .and(query_param("steamids", "76561198000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "players": [
                        {"steamid": "76561198000000000", "personaname": "Dwight"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let identity = client.resolve_player("76561198000000000").await.unwrap();
        assert_eq!(identity.steam_id, "76561198000000000");
        assert_eq!(identity.display_name, "Dwight");
    }

    #[tokio::test]
    async fn test_resolve_player_via_vanity_name() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUser/ResolveVanityURL/v1/"))
            .and(query_param("vanityurl", "dwight_main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"success": 1, "steamid": "76561198000000000"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "players": [
                        {"steamid": "76561198000000000", "personaname": "Dwight"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let identity = client.resolve_player("dwight_main").await.unwrap();
        assert_eq!(identity.steam_id, "76561198000000000");
    }

    #[tokio::test]
    async fn test_unknown_vanity_name_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUser/ResolveVanityURL/v1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"success": 42, "message": "No match"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client.resolve_player("nobody").await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_summary_list_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": {"players": []}})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client.resolve_player("76561198000000000").await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_user_stats() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetUserStatsForGame/v2/"))
            .and(query_param("appid", "381210"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "playerstats": {
                    "steamID": "76561198000000000",
                    "gameName": "Dead by Daylight",
                    "stats": [
                        {"name": "DBD_Escape", "value": 211.0},
                        {"name": "DBD_SacrificedCampers", "value": 540.0}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let stats = client.get_user_stats("76561198000000000").await.unwrap();
        assert_eq!(stats.stats.get("DBD_Escape"), Some(&211.0));
        assert_eq!(stats.stats.len(), 2);
    }

    #[tokio::test]
    async fn test_get_player_achievements() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetPlayerAchievements/v1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "playerstats": {
                    "success": true,
                    "achievements": [
                        {"apiname": "ACH_ESCAPE", "achieved": 1, "unlocktime": 1600000000},
                        {"apiname": "ACH_SACRIFICE", "achieved": 0, "unlocktime": 0}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let achievements = client
            .get_player_achievements("76561198000000000")
            .await
            .unwrap();
        assert_eq!(achievements.len(), 2);
        assert!(achievements[0].achieved);
        assert!(achievements[0].unlock_time.is_some());
        assert!(achievements[1].unlock_time.is_none());
    }

    #[tokio::test]
    async fn test_private_profile_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetPlayerAchievements/v1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "playerstats": {"success": false, "error": "Profile is not public"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client
            .get_player_achievements("76561198000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::NotFound(ref m) if m.contains("not public")));
    }

    #[tokio::test]
    async fn test_get_achievement_schema() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetSchemaForGame/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "game": {
                    "gameName": "Dead by Daylight",
                    "availableGameStats": {
                        "achievements": [
                            {
                                "name": "ACH_ESCAPE",
                                "displayName": "Escape Artist",
                                "description": "Escape a trial",
                                "hidden": 0,
                                "icon": "http://example/a.jpg",
                                "icongray": "http://example/b.jpg"
                            }
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let schema = client.get_achievement_schema().await.unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].id, "ACH_ESCAPE");
        assert_eq!(schema[0].display_name, "Escape Artist");
    }

    #[tokio::test]
    async fn test_get_global_percentages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(
                "/ISteamUserStats/GetGlobalAchievementPercentagesForApp/v2/",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "achievementpercentages": {
                    "achievements": [
                        {"name": "ACH_ESCAPE", "percent": 64.3},
                        {"name": "ACH_EVIL_INCARNATE", "percent": 1.2}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let percentages = client.get_global_percentages().await.unwrap();
        assert_eq!(percentages.get("ACH_EVIL_INCARNATE"), Some(&1.2));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetUserStatsForGame/v2/"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client.get_user_stats("76561198000000000").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetUserStatsForGame/v2/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client.get_user_stats("76561198000000000").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_decode_failure_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ISteamUserStats/GetUserStatsForGame/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let err = client.get_user_stats("76561198000000000").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
        assert!(!err.is_retryable());
    }
}
