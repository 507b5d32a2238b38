//! Configuration types for the stream window and its HTTP data source.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};

// --- Custom deserializer for Duration from milliseconds ---
fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

// --- Custom deserializer for Duration from seconds ---
fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

fn default_page_size() -> usize {
    25
}

fn default_prefetch_pages() -> usize {
    2
}

fn default_genesis_time() -> i64 {
    0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> Duration {
    Duration::from_millis(250)
}

fn default_max_backoff_secs() -> Duration {
    Duration::from_secs(10)
}

fn default_base_for_backoff() -> u32 {
    2
}

/// Serializable setting for jitter in retry policies.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// No jitter applied to the backoff duration.
    None,
    /// Full jitter applied, randomizing the backoff duration.
    #[default]
    Full,
}

/// Configuration for the HTTP data source's retry policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient errors.
    #[serde(default = "default_max_attempts")]
    pub max_retries: u32,
    /// Base duration for exponential backoff calculations.
    #[serde(default = "default_base_for_backoff")]
    pub base_for_backoff: u32,
    /// Initial backoff duration before the first retry.
    #[serde(
        default = "default_initial_backoff_ms",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub initial_backoff_ms: Duration,
    /// Maximum backoff duration for retries.
    #[serde(
        default = "default_max_backoff_secs",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub max_backoff_secs: Duration,
    /// Jitter to apply to the backoff duration.
    #[serde(default)]
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_attempts(),
            base_for_backoff: default_base_for_backoff(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            jitter: JitterSetting::default(),
        }
    }
}

/// Tuning for the stream window manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Number of events per visible page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How many pages ahead of the visible window the cache is kept filled.
    /// The look-ahead hides fetch latency from the user; treat it as a
    /// tunable, not a fixed policy.
    #[serde(default = "default_prefetch_pages")]
    pub prefetch_pages: usize,

    /// The oldest addressable time of the stream, anchoring the very first
    /// fetch when no boundary is known yet.
    #[serde(default = "default_genesis_time")]
    pub genesis_time: i64,

    /// Fixed newest anchor for the very first fetch. `None` means "now".
    #[serde(default)]
    pub default_end_time: Option<i64>,

    /// Retry policy for the HTTP data source.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            prefetch_pages: default_prefetch_pages(),
            genesis_time: default_genesis_time(),
            default_end_time: None,
            http_retry: HttpRetryConfig::default(),
        }
    }
}

impl WindowConfig {
    /// Loads the configuration from a YAML file, with `EVENTSCOPE`-prefixed
    /// environment variables taking precedence.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("EVENTSCOPE").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
