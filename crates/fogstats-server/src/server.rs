use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use fogstats_aggregator::ProfileService;
use fogstats_cache::ProfileCache;
use fogstats_steam::{StatsProvider, SteamClient, SteamClientConfig};

use crate::{
    config::AppConfig,
    handlers::{self, AppState},
};

pub struct FogstatsServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app<P: StatsProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Profile API
        .route("/api/player/{id}", get(handlers::get_player::<P>))
        // Administrative cache endpoints
        .route("/api/admin/cache/evict", post(handlers::evict_cache::<P>))
        .route("/api/admin/cache/stats", get(handlers::cache_stats::<P>))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<FogstatsServer> {
        let state = build_state(&self.config)?;
        Ok(FogstatsServer {
            addr: self.addr,
            app: build_app(state),
        })
    }
}

/// Wires the Steam client, cache and profile service from configuration.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState<SteamClient>> {
    let base_url = url::Url::parse(&cfg.steam.base_url)?;
    let client_config = SteamClientConfig::new(cfg.steam.api_key.clone(), cfg.steam.app_id)
        .with_base_url(base_url)
        .with_request_timeout(std::time::Duration::from_millis(
            cfg.steam.request_timeout_ms,
        ));
    let client = Arc::new(SteamClient::new(client_config));

    let cache = Arc::new(ProfileCache::new(cfg.cache.admin_token.clone()));
    let service = Arc::new(ProfileService::new(
        client,
        Arc::clone(&cache),
        cfg.profile_service_config(),
    ));

    Ok(AppState {
        service,
        cache,
        admin_token: (!cfg.cache.admin_token.is_empty()).then(|| cfg.cache.admin_token.clone()),
    })
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FogstatsServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
