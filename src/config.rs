//! Application-level configuration loading: enabled game categories and the
//! timing knobs of the match synchronization layer.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DUET_BACK_CONFIG_PATH";
/// The only game kind shipped today.
pub const DEFAULT_CATEGORY: &str = "tic-tac-toe";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    categories: Vec<String>,
    poll_interval: Duration,
    keep_alive: Duration,
    cleanup_delay: Duration,
    stale_after: Duration,
    sweep_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        categories = ?app_config.categories,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Whether matches of `category` are served.
    pub fn supports_category(&self, category: &str) -> bool {
        self.categories.iter().any(|known| known == category)
    }

    /// Interval clients are told to use when polling for the latest match.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Idle time between keep-alive comments on the push stream.
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Delay before a concluded match is removed after a player leaves it.
    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    /// Age after which an untouched match is evicted.
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Period of the eviction sweep.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Override the cleanup delay, mostly useful for tests.
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Override the match lifetime, mostly useful for tests.
    pub fn with_stale_after(mut self, lifetime: Duration) -> Self {
        self.stale_after = lifetime;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories: vec![DEFAULT_CATEGORY.to_owned()],
            poll_interval: DEFAULT_POLL_INTERVAL,
            keep_alive: DEFAULT_KEEP_ALIVE,
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            stale_after: DEFAULT_STALE_AFTER,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional; missing ones keep their default.
struct RawConfig {
    categories: Option<Vec<String>>,
    poll_interval_ms: Option<u64>,
    keep_alive_secs: Option<u64>,
    cleanup_delay_ms: Option<u64>,
    stale_after_hours: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            categories: value
                .categories
                .filter(|categories| !categories.is_empty())
                .unwrap_or(defaults.categories),
            poll_interval: duration_or_default(
                "poll_interval_ms",
                value.poll_interval_ms,
                |ms| Some(Duration::from_millis(ms)),
                defaults.poll_interval,
            ),
            keep_alive: duration_or_default(
                "keep_alive_secs",
                value.keep_alive_secs,
                |secs| Some(Duration::from_secs(secs)),
                defaults.keep_alive,
            ),
            cleanup_delay: value
                .cleanup_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cleanup_delay),
            stale_after: duration_or_default(
                "stale_after_hours",
                value.stale_after_hours,
                |hours| hours.checked_mul(60 * 60).map(Duration::from_secs),
                defaults.stale_after,
            ),
            sweep_interval: duration_or_default(
                "sweep_interval_secs",
                value.sweep_interval_secs,
                |secs| Some(Duration::from_secs(secs)),
                defaults.sweep_interval,
            ),
        }
    }
}

/// Convert a configured period, keeping `default` when it is zero or does not fit.
fn duration_or_default(
    field: &str,
    raw: Option<u64>,
    convert: impl FnOnce(u64) -> Option<Duration>,
    default: Duration,
) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match convert(raw).filter(|duration| !duration.is_zero()) {
        Some(duration) => duration,
        None => {
            warn!(
                field,
                value = raw,
                "invalid duration in config; keeping default"
            );
            default
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
