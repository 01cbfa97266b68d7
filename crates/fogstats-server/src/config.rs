use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

use fogstats_aggregator::ProfileServiceConfig;
use fogstats_core::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub steam: SteamSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Steam validations
        if self.steam.api_key.is_empty() {
            return Err("steam.api_key must be set (FOGSTATS__STEAM__API_KEY)".into());
        }
        if self.steam.app_id == 0 {
            return Err("steam.app_id must be > 0".into());
        }
        if self.steam.request_timeout_ms == 0 {
            return Err("steam.request_timeout_ms must be > 0".into());
        }
        if url::Url::parse(&self.steam.base_url).is_err() {
            return Err("steam.base_url must be a valid URL".into());
        }
        // Cache validations
        let ttls = [
            ("cache.identity_ttl_secs", self.cache.identity_ttl_secs),
            ("cache.stats_ttl_secs", self.cache.stats_ttl_secs),
            (
                "cache.achievements_ttl_secs",
                self.cache.achievements_ttl_secs,
            ),
            ("cache.mapped_ttl_secs", self.cache.mapped_ttl_secs),
        ];
        for (name, ttl) in ttls {
            if ttl == 0 {
                return Err(format!("{name} must be > 0"));
            }
        }
        // Retry validations
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        if self.retry.base_delay_ms == 0 || self.retry.max_delay_ms == 0 {
            return Err("retry delays must be > 0".into());
        }
        if self.retry.fetch_deadline_ms == 0 {
            return Err("retry.fetch_deadline_ms must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.retry.max_attempts)
            .with_base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn profile_service_config(&self) -> ProfileServiceConfig {
        ProfileServiceConfig {
            retry: self.retry_policy(),
            identity_ttl: Duration::from_secs(self.cache.identity_ttl_secs),
            stats_ttl: Duration::from_secs(self.cache.stats_ttl_secs),
            achievements_ttl: Duration::from_secs(self.cache.achievements_ttl_secs),
            mapped_ttl: Duration::from_secs(self.cache.mapped_ttl_secs),
            fetch_deadline: Duration::from_millis(self.retry.fetch_deadline_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream Steam Web API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteamSettings {
    /// Web API key. Required; never logged.
    #[serde(default)]
    pub api_key: String,
    /// Fixed game identifier (default: Dead by Daylight).
    #[serde(default = "default_app_id")]
    pub app_id: u32,
    #[serde(default = "default_steam_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_app_id() -> u32 {
    381_210
}
fn default_steam_base_url() -> String {
    "https://api.steampowered.com".into()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SteamSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_id: default_app_id(),
            base_url: default_steam_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_identity_ttl_secs")]
    pub identity_ttl_secs: u64,
    #[serde(default = "default_dataset_ttl_secs")]
    pub stats_ttl_secs: u64,
    #[serde(default = "default_dataset_ttl_secs")]
    pub achievements_ttl_secs: u64,
    #[serde(default = "default_identity_ttl_secs")]
    pub mapped_ttl_secs: u64,
    /// Capability token for administrative cache endpoints.
    /// Empty (the default) means those endpoints always reject.
    #[serde(default)]
    pub admin_token: String,
}

fn default_identity_ttl_secs() -> u64 {
    600
}
fn default_dataset_ttl_secs() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            identity_ttl_secs: default_identity_ttl_secs(),
            stats_ttl_secs: default_dataset_ttl_secs(),
            achievements_ttl_secs: default_dataset_ttl_secs(),
            mapped_ttl_secs: default_identity_ttl_secs(),
            admin_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Overall deadline for one profile fetch, spanning all datasets.
    #[serde(default = "default_fetch_deadline_ms")]
    pub fetch_deadline_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    5_000
}
fn default_fetch_deadline_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            fetch_deadline_ms: default_fetch_deadline_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("fogstats.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., FOGSTATS__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("FOGSTATS")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
