//! HTTP server for the fogstats profile API.
//!
//! Exposes the fused player profile over axum, plus token-gated
//! administrative cache endpoints and the usual health probes.

pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, CacheSettings, RetrySettings, ServerConfig, SteamSettings};
pub use handlers::AppState;
pub use observability::{apply_logging_level, init_tracing};
pub use server::{FogstatsServer, ServerBuilder, build_app, build_state};
