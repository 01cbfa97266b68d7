//! Response envelopes for the Steam Web API endpoints we consume.
//!
//! These mirror the upstream JSON shapes; conversion into the crate-public
//! domain types happens in the client.

use serde::Deserialize;
use time::OffsetDateTime;

use fogstats_core::{AchievementDefinition, PlayerAchievement};

// ---- ISteamUser/GetPlayerSummaries/v2 ----

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesEnvelope {
    pub response: PlayerSummariesResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesResponse {
    #[serde(default)]
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummary {
    pub steamid: String,
    pub personaname: String,
}

// ---- ISteamUser/ResolveVanityURL/v1 ----

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveVanityEnvelope {
    pub response: ResolveVanityResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveVanityResponse {
    /// 1 on success, 42 for "no match".
    pub success: i32,
    pub steamid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ---- ISteamUserStats/GetUserStatsForGame/v2 ----

#[derive(Debug, Deserialize)]
pub(crate) struct UserStatsEnvelope {
    pub playerstats: UserStatsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserStatsPayload {
    #[serde(default)]
    pub stats: Vec<StatValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatValue {
    pub name: String,
    pub value: f64,
}

// ---- ISteamUserStats/GetPlayerAchievements/v1 ----

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerAchievementsEnvelope {
    pub playerstats: PlayerAchievementsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerAchievementsPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub achievements: Vec<RawPlayerAchievement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlayerAchievement {
    pub apiname: String,
    pub achieved: u8,
    /// Unix seconds; 0 when locked.
    #[serde(default)]
    pub unlocktime: i64,
}

impl From<RawPlayerAchievement> for PlayerAchievement {
    fn from(raw: RawPlayerAchievement) -> Self {
        let unlock_time = (raw.unlocktime > 0)
            .then(|| OffsetDateTime::from_unix_timestamp(raw.unlocktime).ok())
            .flatten();
        Self {
            id: raw.apiname,
            achieved: raw.achieved != 0,
            unlock_time,
        }
    }
}

// ---- ISteamUserStats/GetSchemaForGame/v2 ----

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaEnvelope {
    pub game: SchemaGame,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaGame {
    #[serde(rename = "availableGameStats", default)]
    pub available_game_stats: Option<SchemaStats>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaStats {
    #[serde(default)]
    pub achievements: Vec<SchemaAchievement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaAchievement {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: u8,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icongray: String,
}

impl From<SchemaAchievement> for AchievementDefinition {
    fn from(raw: SchemaAchievement) -> Self {
        Self {
            id: raw.name,
            display_name: raw.display_name,
            description: raw.description.unwrap_or_default(),
            hidden: raw.hidden != 0,
            icon: raw.icon,
            icon_gray: raw.icongray,
        }
    }
}

// ---- ISteamUserStats/GetGlobalAchievementPercentagesForApp/v2 ----

#[derive(Debug, Deserialize)]
pub(crate) struct GlobalPercentagesEnvelope {
    pub achievementpercentages: GlobalPercentagesPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GlobalPercentagesPayload {
    #[serde(default)]
    pub achievements: Vec<GlobalPercentage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GlobalPercentage {
    pub name: String,
    pub percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_achievement_conversion() {
        let raw = RawPlayerAchievement {
            apiname: "ACH_ESCAPE".into(),
            achieved: 1,
            unlocktime: 1_600_000_000,
        };
        let ach = PlayerAchievement::from(raw);
        assert_eq!(ach.id, "ACH_ESCAPE");
        assert!(ach.achieved);
        assert!(ach.unlock_time.is_some());
    }

    #[test]
    fn test_locked_achievement_has_no_unlock_time() {
        let raw = RawPlayerAchievement {
            apiname: "ACH_SACRIFICE".into(),
            achieved: 0,
            unlocktime: 0,
        };
        let ach = PlayerAchievement::from(raw);
        assert!(!ach.achieved);
        assert!(ach.unlock_time.is_none());
    }

    #[test]
    fn test_schema_achievement_conversion() {
        let raw = SchemaAchievement {
            name: "ACH_HIDDEN".into(),
            display_name: "Secret".into(),
            description: None,
            hidden: 1,
            icon: "http://example/icon.jpg".into(),
            icongray: "http://example/gray.jpg".into(),
        };
        let def = AchievementDefinition::from(raw);
        assert_eq!(def.id, "ACH_HIDDEN");
        assert!(def.hidden);
        assert_eq!(def.description, "");
    }
}
