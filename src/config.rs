//! Service configuration, loaded from `config/service.toml`.
//!
//! Every field has a serde default so a missing file boots the service with
//! production defaults; a present-but-invalid file is a startup error.
//! `SERVICE_CONFIG_PATH` overrides the path, `PORT` overrides the bind port.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";
pub const ENV_CONFIG_PATH: &str = "SERVICE_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub enabled: bool,
    /// Only "openai" is wired up; anything else resolves to disabled.
    pub provider: String,
    pub model: String,
    pub request_timeout_secs: u64,
    /// Daily call ceiling reported by the usage tracker.
    pub daily_ceiling: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 20,
            daily_ceiling: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Per-article sentiment entries.
    pub item_ttl_secs: u64,
    /// Whole-batch result entries; some deployments raise this to 3600.
    pub batch_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            item_ttl_secs: 24 * 3600,
            batch_ttl_secs: 600,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub news: LimitConfig,
    pub analysis: LimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            news: LimitConfig {
                max_requests: 30,
                window_secs: 60,
            },
            analysis: LimitConfig {
                max_requests: 10,
                window_secs: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    pub refresh_interval_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/snapshot.json"),
            refresh_interval_secs: 300,
        }
    }
}

impl ServiceConfig {
    /// Resolve the config path (env override first) and load it.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from_file(&path)?;

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.trim().parse::<u16>() {
                cfg.server.port = p;
            }
        }
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let cfg: ServiceConfig = toml::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("invalid config at {}: {}", path.display(), e)
                })?;
                Ok(cfg)
            }
            Err(_) => {
                tracing::info!(path = %path.display(), "no config file; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
