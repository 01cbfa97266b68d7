use fogstats_server::{AppConfig, build_app, build_state};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STEAM_ID: &str = "76561198000000000";

async fn mock_steam() -> MockServer {
    let steam = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "players": [
                    {"steamid": STEAM_ID, "personaname": "Dwight"}
                ]
            }
        })))
        .mount(&steam)
        .await;

    Mock::given(method("GET"))
        .and(path("/ISteamUserStats/GetUserStatsForGame/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playerstats": {
                "steamID": STEAM_ID,
                "gameName": "Dead by Daylight",
                "stats": [
                    {"name": "DBD_Escape", "value": 211.0}
                ]
            }
        })))
        .mount(&steam)
        .await;

    Mock::given(method("GET"))
        .and(path("/ISteamUserStats/GetPlayerAchievements/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playerstats": {
                "success": true,
                "achievements": [
                    {"apiname": "ACH_ESCAPE", "achieved": 1, "unlocktime": 1600000000}
                ]
            }
        })))
        .mount(&steam)
        .await;

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
        .mount(&steam)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/ISteamUserStats/GetGlobalAchievementPercentagesForApp/v2/",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "achievementpercentages": {
                "achievements": [
                    {"name": "ACH_ESCAPE", "percent": 64.3}
                ]
            }
        })))
        .mount(&steam)
        .await;

    steam
}

fn test_config(steam_base_url: String) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.steam.api_key = "test-key".into();
    cfg.steam.base_url = steam_base_url;
    cfg.cache.admin_token = "sesame".into();
    cfg
}

async fn start_server(cfg: AppConfig) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>)
{
    let state = build_state(&cfg).expect("build state");
    let app = build_app(state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn health_endpoints_work() {
    let steam = mock_steam().await;
    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "fogstats");
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn player_profile_round_trip() {
    let steam = mock_steam().await;
    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["playerID"], STEAM_ID);
    assert_eq!(body["displayName"], "Dwight");
    assert_eq!(body["cacheHit"], false);
    assert_eq!(body["rawStats"]["stats"]["DBD_Escape"], 211.0);
    assert_eq!(body["dataSources"]["stats"]["source"], "api");
    assert_eq!(body["mappedStats"]["achievements"][0]["rarity"], 64.3);
    assert_eq!(
        body["mappedStats"]["summary"]["totalAchievements"],
        1
    );

    // Second fetch is served entirely from cache
    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cacheHit"], true);
    assert_eq!(body["dataSources"]["stats"]["source"], "cache");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn unknown_player_is_404() {
    let steam = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"players": []}
        })))
        .mount(&steam)
        .await;

    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "player_not_found");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn dataset_subset_and_bad_name() {
    let steam = mock_steam().await;
    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}?datasets=stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["rawStats"].is_object());
    assert!(body.get("mappedStats").is_none());
    assert!(body["dataSources"].get("achievements").is_none());

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}?datasets=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn admin_cache_endpoints_are_token_gated() {
    let steam = mock_steam().await;
    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    // Populate the cache
    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Stats endpoint rejects a missing or wrong token
    let resp = client
        .get(format!("{base}/api/admin/cache/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/api/admin/cache/stats"))
        .header("X-Admin-Token", "sesame")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stats: Value = resp.json().await.unwrap();
    assert!(stats["size"].as_u64().unwrap() > 0);

    // Eviction with a bad token: 401, and the rejection body reveals nothing
    let resp = client
        .post(format!("{base}/api/admin/cache/evict"))
        .json(&json!({"token": "wrong", "scope": "all"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("size").is_none());

    // A later fetch is still a cache hit, so nothing was evicted
    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cacheHit"], true);

    // Eviction with the right token empties the cache
    let resp = client
        .post(format!("{base}/api/admin/cache/evict"))
        .json(&json!({"token": "sesame", "scope": "all"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cacheHit"], false);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn single_player_eviction() {
    let steam = mock_steam().await;
    let (base, shutdown_tx, handle) = start_server(test_config(steam.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/api/admin/cache/evict"))
        .json(&json!({
            "token": "sesame",
            "scope": {"playerId": STEAM_ID, "dataset": "stats"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Stats must be refetched; the other datasets still come from cache
    let resp = client
        .get(format!("{base}/api/player/{STEAM_ID}"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cacheHit"], false);
    assert_eq!(body["dataSources"]["stats"]["source"], "api");
    assert_eq!(body["dataSources"]["achievements"]["source"], "cache");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
