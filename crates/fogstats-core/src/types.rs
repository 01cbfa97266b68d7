//! Wire-stable domain types.
//!
//! Field names follow the camelCase convention of the original JSON API and
//! are held stable for presentation-layer compatibility. Timestamps
//! serialize as RFC 3339.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ErrorKind, UpstreamError};

/// One independently fetched dataset of a player profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetKind {
    /// Raw numeric stats.
    Stats,
    /// Raw achievement unlock flags.
    Achievements,
    /// Schema-mapped achievements plus summary.
    MappedStats,
}

impl DatasetKind {
    /// All datasets, in response order.
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Stats,
        DatasetKind::Achievements,
        DatasetKind::MappedStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Achievements => "achievements",
            Self::MappedStats => "mappedStats",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of a dataset in a fused response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Api,
    Fallback,
}

/// Wire-level error attached to a failed dataset.
///
/// Carries only the classified kind and message; retry counts and internal
/// details never leak to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&UpstreamError> for DataSourceError {
    fn from(err: &UpstreamError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

/// Provenance of one dataset fetch, present even on total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub success: bool,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<DataSourceError>,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

impl DataSourceInfo {
    /// Successful dataset served from cache; `fetched_at` is the original
    /// store time, not the lookup time.
    pub fn from_cache(stored_at: OffsetDateTime) -> Self {
        Self {
            success: true,
            source: DataSource::Cache,
            error: None,
            fetched_at: stored_at,
        }
    }

    /// Successful dataset fetched from the upstream API just now.
    pub fn from_api() -> Self {
        Self {
            success: true,
            source: DataSource::Api,
            error: None,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    /// Failed dataset after retry exhaustion.
    pub fn fallback(err: &UpstreamError) -> Self {
        Self {
            success: false,
            source: DataSource::Fallback,
            error: Some(DataSourceError::from(err)),
            fetched_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Resolved player identity from the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// Canonical 64-bit Steam id, as a string.
    pub steam_id: String,
    /// Current persona (display) name.
    pub display_name: String,
}

/// Raw numeric stats for a player, as `stat name -> value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub stats: BTreeMap<String, f64>,
}

/// Raw unlock flag for one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAchievement {
    pub id: String,
    pub achieved: bool,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub unlock_time: Option<OffsetDateTime>,
}

/// Read-only achievement schema entry from the upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub hidden: bool,
    pub icon: String,
    pub icon_gray: String,
}

/// Achievement category used by the mapper.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Survivor,
    Killer,
    General,
    Adept,
}

impl std::fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Survivor => write!(f, "survivor"),
            Self::Killer => write!(f, "killer"),
            Self::General => write!(f, "general"),
            Self::Adept => write!(f, "adept"),
        }
    }
}

/// Schema entry enriched with category, unlock state and rarity.
///
/// Always derived wholesale from a schema + unlock fetch, never mutated
/// piecemeal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedAchievement {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    pub icon_gray: String,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub character: Option<String>,
    pub category: AchievementCategory,
    pub unlocked: bool,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub unlock_time: Option<OffsetDateTime>,
    /// Global unlock percentage. Absent, not zero, when unknown.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rarity: Option<f64>,
}

/// Aggregate over a co-delivered [`MappedAchievement`] sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSummary {
    pub total_achievements: usize,
    pub unlocked_count: usize,
    pub per_category_counts: BTreeMap<AchievementCategory, usize>,
    pub completion_rate: f64,
}

/// Mapped achievements plus their recomputed summary, cached and delivered
/// as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedAchievements {
    pub achievements: Vec<MappedAchievement>,
    pub summary: AchievementSummary,
}

/// The fused response returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_stats: Option<PlayerStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub achievements: Option<Vec<PlayerAchievement>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mapped_stats: Option<MappedAchievements>,
    /// One entry per requested dataset, populated exactly once per fetch.
    pub data_sources: BTreeMap<DatasetKind, DataSourceInfo>,
    /// True only when every requested dataset came from cache.
    pub cache_hit: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}
