//! Per-identifier categorization overrides.
//!
//! Some achievements carry neither a "survivor" nor a "killer" token in
//! their identifier or display name, or carry a misleading one. Rather than
//! branching on them in the heuristic, known exceptions live in this table,
//! checked before any pattern matching. Exceptions are data.

use fogstats_core::AchievementCategory;

/// `(identifier, category)` pairs consulted before the generic heuristic.
pub(crate) const CATEGORY_OVERRIDES: &[(&str, AchievementCategory)] = &[
    // "Evil Incarnate" - Tombstone-piece mori run, a killer feat
    ("NEW_ACHIEVEMENT_7_25", AchievementCategory::Killer),
    // "Left for Dead" - last survivor standing hatch escape
    ("NEW_ACHIEVEMENT_7_23", AchievementCategory::Survivor),
    // "Where Did They Go!?" - locker juke, survivor side
    ("NEW_ACHIEVEMENT_12_4", AchievementCategory::Survivor),
    // "Skilled Huntress" - hatchet throws, killer side
    ("NEW_ACHIEVEMENT_9_14", AchievementCategory::Killer),
    // "A Nurse's Calling" first-unhook event achievement, general
    ("ACH_UNLOCK_NURSE_PERKS", AchievementCategory::General),
];

/// Looks up a categorization override for an identifier.
pub(crate) fn category_override(id: &str) -> Option<AchievementCategory> {
    CATEGORY_OVERRIDES
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(_, category)| *category)
}
