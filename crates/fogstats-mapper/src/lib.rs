//! Achievement schema mapper.
//!
//! Turns the global achievement schema plus a player's raw unlock flags
//! into enriched, categorized achievement records and a summary. Pure and
//! synchronous: identical inputs always produce identical output.

mod overrides;

use std::collections::BTreeMap;

use fogstats_core::{
    AchievementCategory, AchievementDefinition, AchievementSummary, MappedAchievement,
    MappedAchievements, PlayerAchievement,
};

use crate::overrides::category_override;

/// Marker prefix of per-character mastery achievements ("Adept Nurse",
/// "Adept Dwight", ...).
const ADEPT_PREFIX: &str = "adept ";

/// Maps the schema and a player's unlock state into categorized records plus
/// a freshly computed summary.
///
/// `global_percentages` is the auxiliary rarity source; identifiers absent
/// from it get no rarity at all, distinguishing "unknown" from "universally
/// unlocked".
pub fn map_achievements(
    definitions: &[AchievementDefinition],
    unlock_state: &[PlayerAchievement],
    global_percentages: Option<&BTreeMap<String, f64>>,
) -> MappedAchievements {
    let unlocks: BTreeMap<&str, &PlayerAchievement> = unlock_state
        .iter()
        .map(|a| (a.id.as_str(), a))
        .collect();

    let achievements: Vec<MappedAchievement> = definitions
        .iter()
        .map(|def| {
            let (category, character) = categorize(&def.id, &def.display_name);
            let unlock = unlocks.get(def.id.as_str()).copied();
            let unlocked = unlock.is_some_and(|u| u.achieved);

            MappedAchievement {
                id: def.id.clone(),
                name: def.id.clone(),
                display_name: def.display_name.clone(),
                description: def.description.clone(),
                icon: def.icon.clone(),
                icon_gray: def.icon_gray.clone(),
                hidden: def.hidden,
                character,
                category,
                unlocked,
                unlock_time: unlock.and_then(|u| u.unlock_time),
                rarity: global_percentages.and_then(|p| p.get(&def.id).copied()),
            }
        })
        .collect();

    let summary = summarize(&achievements);

    tracing::debug!(
        total = summary.total_achievements,
        unlocked = summary.unlocked_count,
        "mapped achievement schema"
    );

    MappedAchievements {
        achievements,
        summary,
    }
}

/// Categorizes one achievement.
///
/// Precedence: the override table, then the adept mastery marker (which
/// reassigns what would otherwise land in survivor/killer), then the
/// survivor/killer token heuristic, then `general`.
fn categorize(id: &str, display_name: &str) -> (AchievementCategory, Option<String>) {
    if let Some(category) = category_override(id) {
        return (category, None);
    }

    if let Some(prefix) = display_name.get(..ADEPT_PREFIX.len())
        && prefix.eq_ignore_ascii_case(ADEPT_PREFIX)
    {
        let character = display_name[ADEPT_PREFIX.len()..].trim().to_string();
        let character = (!character.is_empty()).then_some(character);
        return (AchievementCategory::Adept, character);
    }

    let display_lower = display_name.to_lowercase();
    let id_lower = id.to_lowercase();
    if id_lower.contains("survivor") || display_lower.contains("survivor") {
        return (AchievementCategory::Survivor, None);
    }
    if id_lower.contains("killer") || display_lower.contains("killer") {
        return (AchievementCategory::Killer, None);
    }

    (AchievementCategory::General, None)
}

/// Recomputes the summary from a full mapped sequence.
fn summarize(achievements: &[MappedAchievement]) -> AchievementSummary {
    let total = achievements.len();
    let unlocked = achievements.iter().filter(|a| a.unlocked).count();

    let mut per_category_counts = BTreeMap::new();
    for achievement in achievements {
        *per_category_counts.entry(achievement.category).or_insert(0) += 1;
    }

    AchievementSummary {
        total_achievements: total,
        unlocked_count: unlocked,
        per_category_counts,
        completion_rate: if total == 0 {
            0.0
        } else {
            unlocked as f64 / total as f64
        },
    }
}
