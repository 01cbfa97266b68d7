//! Steam Web API client for the fogstats service.
//!
//! Wraps the handful of `ISteamUser` / `ISteamUserStats` endpoints the
//! aggregator needs and classifies every failure (non-2xx status, transport
//! error, decode error) into the [`fogstats_core::UpstreamError`] taxonomy at this
//! boundary, so nothing above it ever sees a raw HTTP failure.

pub mod client;
pub mod provider;
mod types;

pub use client::{SteamClient, SteamClientConfig};
pub use provider::{PlayerIdentity, StatsProvider};
