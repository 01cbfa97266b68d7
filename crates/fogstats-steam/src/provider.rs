//! Upstream provider seam.
//!
//! The aggregator talks to this trait rather than to [`SteamClient`]
//! directly, which keeps its orchestration logic testable with scripted
//! providers.

use std::collections::BTreeMap;

use async_trait::async_trait;

use fogstats_core::{AchievementDefinition, PlayerAchievement, PlayerStats, UpstreamError};

pub use fogstats_core::PlayerIdentity;

/// The upstream game-stats provider.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Resolves a SteamID64 or vanity name to a canonical identity.
    ///
    /// Returns [`UpstreamError::NotFound`] when no such player exists; the
    /// aggregator treats that as terminal.
    async fn resolve_player(&self, query: &str) -> Result<PlayerIdentity, UpstreamError>;

    /// Raw numeric stats for a player.
    async fn get_user_stats(&self, steam_id: &str) -> Result<PlayerStats, UpstreamError>;

    /// Raw achievement unlock flags for a player.
    async fn get_player_achievements(
        &self,
        steam_id: &str,
    ) -> Result<Vec<PlayerAchievement>, UpstreamError>;

    /// The global achievement schema for the configured game.
    async fn get_achievement_schema(
        &self,
    ) -> Result<Vec<AchievementDefinition>, UpstreamError>;

    /// Global unlock percentages, keyed by achievement identifier.
    async fn get_global_percentages(&self) -> Result<BTreeMap<String, f64>, UpstreamError>;
}
