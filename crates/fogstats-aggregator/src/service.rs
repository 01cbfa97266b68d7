//! The profile service: cache → retry → map → fuse.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use fogstats_cache::{CacheKey, CachedPayload, ProfileCache};
use fogstats_core::{
    DataSource, DataSourceInfo, DatasetKind, MappedAchievements, PlayerAchievement,
    PlayerIdentity, PlayerProfile, PlayerStats, ProfileError, RetryPolicy, UpstreamError,
    run_with_retry,
};
use fogstats_mapper::map_achievements;
use fogstats_steam::StatsProvider;

/// Tuning for the profile service.
#[derive(Debug, Clone)]
pub struct ProfileServiceConfig {
    /// Backoff policy applied to every upstream call.
    pub retry: RetryPolicy,
    /// TTL for resolved identities.
    pub identity_ttl: Duration,
    /// TTL for the raw stats dataset.
    pub stats_ttl: Duration,
    /// TTL for the raw achievements dataset.
    pub achievements_ttl: Duration,
    /// TTL for the mapped achievements dataset.
    pub mapped_ttl: Duration,
    /// Overall deadline for one profile fetch; expiry cancels all in-flight
    /// dataset fetches, including mid-backoff waits.
    pub fetch_deadline: Duration,
}

impl Default for ProfileServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            identity_ttl: Duration::from_secs(600),
            stats_ttl: Duration::from_secs(300),
            achievements_ttl: Duration::from_secs(300),
            mapped_ttl: Duration::from_secs(600),
            fetch_deadline: Duration::from_secs(30),
        }
    }
}

impl ProfileServiceConfig {
    fn ttl_for(&self, kind: DatasetKind) -> Duration {
        match kind {
            DatasetKind::Stats => self.stats_ttl,
            DatasetKind::Achievements => self.achievements_ttl,
            DatasetKind::MappedStats => self.mapped_ttl,
        }
    }
}

/// Fetches and fuses player profiles.
///
/// Shared across request handlers behind an `Arc`; all state it touches
/// (cache, HTTP client) is itself concurrency-safe.
pub struct ProfileService<P> {
    provider: Arc<P>,
    cache: Arc<ProfileCache>,
    config: ProfileServiceConfig,
}

impl<P: StatsProvider> ProfileService<P> {
    pub fn new(provider: Arc<P>, cache: Arc<ProfileCache>, config: ProfileServiceConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Fetches the full profile: all three datasets.
    pub async fn fetch_profile(&self, query: &str) -> Result<PlayerProfile, ProfileError> {
        self.fetch_profile_datasets(query, &DatasetKind::ALL).await
    }

    /// Fetches a profile restricted to the requested datasets.
    ///
    /// A partial dataset failure degrades only that dataset; the profile is
    /// still returned. The terminal conditions are an unknown player
    /// identity and the overall deadline.
    pub async fn fetch_profile_datasets(
        &self,
        query: &str,
        datasets: &[DatasetKind],
    ) -> Result<PlayerProfile, ProfileError> {
        let deadline = self.config.fetch_deadline;
        match tokio::time::timeout(deadline, self.fetch_inner(query, datasets)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(player = query, deadline_ms = deadline.as_millis() as u64, "profile fetch hit deadline");
                Err(ProfileError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn fetch_inner(
        &self,
        query: &str,
        datasets: &[DatasetKind],
    ) -> Result<PlayerProfile, ProfileError> {
        let identity = self.resolve_identity(query).await?;
        let steam_id = identity.steam_id.as_str();

        // The datasets are independent: unrelated cache keys, unrelated
        // upstream calls. Resolve them concurrently and wait for all.
        let (stats, achievements, mapped) = tokio::join!(
            self.maybe_stats(steam_id, datasets.contains(&DatasetKind::Stats)),
            self.maybe_achievements(steam_id, datasets.contains(&DatasetKind::Achievements)),
            self.maybe_mapped(steam_id, datasets.contains(&DatasetKind::MappedStats)),
        );

        let mut data_sources = BTreeMap::new();
        let mut cache_hit = true;
        let mut record = |kind: DatasetKind, info: DataSourceInfo| {
            cache_hit &= info.source == DataSource::Cache;
            data_sources.insert(kind, info);
        };

        let raw_stats = stats.map(|(payload, info)| {
            record(DatasetKind::Stats, info);
            payload
        });
        let raw_achievements = achievements.map(|(payload, info)| {
            record(DatasetKind::Achievements, info);
            payload
        });
        let mapped_stats = mapped.map(|(payload, info)| {
            record(DatasetKind::MappedStats, info);
            payload
        });

        Ok(PlayerProfile {
            player_id: identity.steam_id.clone(),
            display_name: identity.display_name,
            raw_stats: raw_stats.flatten(),
            achievements: raw_achievements.flatten(),
            mapped_stats: mapped_stats.flatten(),
            data_sources,
            cache_hit,
            last_updated: OffsetDateTime::now_utc(),
        })
    }

    /// Resolves the player identity, via cache or a retried upstream
    /// lookup. A missing player is the one hard error of a profile fetch.
    async fn resolve_identity(&self, query: &str) -> Result<PlayerIdentity, ProfileError> {
        let key = CacheKey::identity(query);
        if let Some(entry) = self.cache.get(&key)
            && let CachedPayload::Identity(identity) = entry.payload
        {
            return Ok(identity);
        }

        let identity = run_with_retry(&self.config.retry, || self.provider.resolve_player(query))
            .await
            .map_err(|err| match err {
                UpstreamError::NotFound(_) => ProfileError::PlayerNotFound(query.to_string()),
                other => ProfileError::IdentityLookup(other),
            })?;

        self.cache.put(
            key,
            CachedPayload::Identity(identity.clone()),
            self.config.identity_ttl,
        );
        Ok(identity)
    }

    async fn maybe_stats(
        &self,
        steam_id: &str,
        wanted: bool,
    ) -> Option<(Option<PlayerStats>, DataSourceInfo)> {
        if !wanted {
            return None;
        }

        let key = CacheKey::dataset(steam_id, DatasetKind::Stats);
        if let Some(entry) = self.cache.get(&key)
            && let CachedPayload::Stats(stats) = entry.payload
        {
            return Some((Some(stats), DataSourceInfo::from_cache(entry.stored_at)));
        }

        let fetched = run_with_retry(&self.config.retry, || {
            self.provider.get_user_stats(steam_id)
        })
        .await;
        Some(self.settle(key, DatasetKind::Stats, fetched, CachedPayload::Stats))
    }

    async fn maybe_achievements(
        &self,
        steam_id: &str,
        wanted: bool,
    ) -> Option<(Option<Vec<PlayerAchievement>>, DataSourceInfo)> {
        if !wanted {
            return None;
        }

        let key = CacheKey::dataset(steam_id, DatasetKind::Achievements);
        if let Some(entry) = self.cache.get(&key)
            && let CachedPayload::Achievements(achievements) = entry.payload
        {
            return Some((
                Some(achievements),
                DataSourceInfo::from_cache(entry.stored_at),
            ));
        }

        let fetched = run_with_retry(&self.config.retry, || {
            self.provider.get_player_achievements(steam_id)
        })
        .await;
        Some(self.settle(
            key,
            DatasetKind::Achievements,
            fetched,
            CachedPayload::Achievements,
        ))
    }

    async fn maybe_mapped(
        &self,
        steam_id: &str,
        wanted: bool,
    ) -> Option<(Option<MappedAchievements>, DataSourceInfo)> {
        if !wanted {
            return None;
        }

        let key = CacheKey::dataset(steam_id, DatasetKind::MappedStats);
        if let Some(entry) = self.cache.get(&key)
            && let CachedPayload::MappedStats(mapped) = entry.payload
        {
            return Some((Some(mapped), DataSourceInfo::from_cache(entry.stored_at)));
        }

        let fetched = self.fetch_mapped(steam_id).await;
        Some(self.settle(
            key,
            DatasetKind::MappedStats,
            fetched,
            CachedPayload::MappedStats,
        ))
    }

    /// Fetches schema, unlock state and global percentages, then maps them.
    ///
    /// Schema and unlock state are both required; if either fails after
    /// retries the mapped dataset fails as a whole, so a fresh schema is
    /// never merged with stale or missing unlock data. Rarity is only an
    /// enrichment and its failure leaves it absent.
    async fn fetch_mapped(&self, steam_id: &str) -> Result<MappedAchievements, UpstreamError> {
        let retry = &self.config.retry;
        let (schema, unlocks, percentages) = tokio::join!(
            run_with_retry(retry, || self.provider.get_achievement_schema()),
            run_with_retry(retry, || self.provider.get_player_achievements(steam_id)),
            run_with_retry(retry, || self.provider.get_global_percentages()),
        );

        let schema = schema?;
        let unlocks = unlocks?;
        let percentages = percentages
            .inspect_err(|err| tracing::debug!(error = %err, "global percentages unavailable, rarity omitted"))
            .ok();

        Ok(map_achievements(&schema, &unlocks, percentages.as_ref()))
    }

    /// Provenance and cache bookkeeping for a finished dataset fetch.
    fn settle<T: Clone>(
        &self,
        key: CacheKey,
        kind: DatasetKind,
        fetched: Result<T, UpstreamError>,
        wrap: impl FnOnce(T) -> CachedPayload,
    ) -> (Option<T>, DataSourceInfo) {
        match fetched {
            Ok(payload) => {
                self.cache
                    .put(key, wrap(payload.clone()), self.config.ttl_for(kind));
                (Some(payload), DataSourceInfo::from_api())
            }
            Err(err) => {
                tracing::warn!(dataset = %kind, error = %err, "dataset degraded after retries");
                (None, DataSourceInfo::fallback(&err))
            }
        }
    }
}
