//! Core building blocks shared by the fogstats crates: the upstream error
//! taxonomy, the retry engine, and the wire-stable profile types.

pub mod error;
pub mod retry;
pub mod types;

pub use error::{ErrorKind, ProfileError, UpstreamError};
pub use retry::{RetryPolicy, run_with_retry};
pub use types::{
    AchievementCategory, AchievementDefinition, AchievementSummary, DataSource, DataSourceError,
    DataSourceInfo, DatasetKind, MappedAchievement, MappedAchievements, PlayerAchievement,
    PlayerIdentity, PlayerProfile, PlayerStats,
};
