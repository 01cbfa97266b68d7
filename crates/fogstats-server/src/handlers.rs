use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

use fogstats_aggregator::ProfileService;
use fogstats_cache::{CacheKey, CacheSlot, ProfileCache};
use fogstats_core::{DatasetKind, ProfileError};
use fogstats_steam::StatsProvider;

/// Shared request state. Cloned per request; everything inside is an `Arc`.
pub struct AppState<P> {
    pub service: Arc<ProfileService<P>>,
    pub cache: Arc<ProfileCache>,
    /// Token for the administrative endpoints. `None` means they always
    /// reject.
    pub admin_token: Option<String>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache: Arc::clone(&self.cache),
            admin_token: self.admin_token.clone(),
        }
    }
}

impl<P> AppState<P> {
    fn authorized(&self, presented: &str) -> bool {
        matches!(&self.admin_token, Some(token) if token == presented)
    }
}

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "fogstats",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

/// `GET /api/player/{id}` — the fused profile.
///
/// `id` is a SteamID64 or a vanity name. An optional `datasets` query
/// parameter (comma-separated) restricts the response to a subset.
pub async fn get_player<P: StatsProvider>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let datasets = match params.get("datasets").map(String::as_str) {
        None | Some("") => DatasetKind::ALL.to_vec(),
        Some(list) => match parse_datasets(list) {
            Ok(kinds) => kinds,
            Err(unknown) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(error_body(
                        "invalid_dataset",
                        format!("unknown dataset '{unknown}'"),
                    )),
                );
            }
        },
    };

    match state.service.fetch_profile_datasets(&id, &datasets).await {
        Ok(profile) => match serde_json::to_value(&profile) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => {
                tracing::error!(error = %e, "profile serialization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(error_body("internal", "serialization failure".into())),
                )
            }
        },
        Err(ProfileError::PlayerNotFound(query)) => (
            StatusCode::NOT_FOUND,
            Json(error_body(
                "player_not_found",
                format!("no Steam player matching '{query}'"),
            )),
        ),
        Err(err @ ProfileError::DeadlineExceeded(_)) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(error_body("deadline_exceeded", err.to_string())),
        ),
        Err(err @ ProfileError::IdentityLookup(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(error_body("upstream_error", err.to_string())),
        ),
    }
}

fn parse_datasets(list: &str) -> Result<Vec<DatasetKind>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| match name {
            "stats" => Ok(DatasetKind::Stats),
            "achievements" => Ok(DatasetKind::Achievements),
            "mappedStats" => Ok(DatasetKind::MappedStats),
            other => Err(other.to_string()),
        })
        .collect()
}

/// Eviction scope: the whole cache, or one player's entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EvictScope {
    Keyword(String),
    Entry {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(default)]
        dataset: Option<DatasetKind>,
    },
}

#[derive(Debug, Deserialize)]
pub struct EvictRequest {
    pub token: String,
    pub scope: EvictScope,
}

/// `POST /api/admin/cache/evict`.
///
/// Responses carry no entry counts or cache contents, whether the
/// operation succeeds or the token is rejected.
pub async fn evict_cache<P: StatsProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<EvictRequest>,
) -> impl IntoResponse {
    match request.scope {
        EvictScope::Keyword(ref word) if word == "all" => {
            match state.cache.evict_all(&request.token) {
                Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
                Err(_) => unauthorized(),
            }
        }
        EvictScope::Keyword(ref word) => (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "invalid_scope",
                format!("unknown scope '{word}'"),
            )),
        ),
        EvictScope::Entry { player_id, dataset } => {
            if !state.authorized(&request.token) {
                return unauthorized();
            }
            evict_player(&state.cache, &player_id, dataset);
            (StatusCode::OK, Json(json!({"status": "ok"})))
        }
    }
}

fn evict_player(cache: &ProfileCache, player_id: &str, dataset: Option<DatasetKind>) {
    match dataset {
        Some(kind) => {
            cache.evict(&CacheKey::dataset(player_id, kind));
        }
        None => {
            cache.evict(&CacheKey {
                player_id: player_id.to_string(),
                slot: CacheSlot::Identity,
            });
            for kind in DatasetKind::ALL {
                cache.evict(&CacheKey::dataset(player_id, kind));
            }
        }
    }
}

/// `GET /api/admin/cache/stats`, gated by the `X-Admin-Token` header.
pub async fn cache_stats<P: StatsProvider>(
    State(state): State<AppState<P>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let presented = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !state.authorized(presented) {
        return unauthorized();
    }
    match serde_json::to_value(state.cache.stats()) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            tracing::error!(error = %e, "stats serialization failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body("internal", "serialization failure".into())),
            )
        }
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(error_body("unauthorized", "administrative token rejected".into())),
    )
}

fn error_body(code: &str, message: String) -> Value {
    json!({
        "error": code,
        "message": message,
    })
}
