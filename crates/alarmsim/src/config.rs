//! Configuration management for alarmsim.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::geo::BoundingBox;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "alarmsim";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "ALARMSIM_";

/// Separator between nested keys in environment variable names.
const ENV_SEPARATOR: &str = "__";

/// String settings whose environment values are taken verbatim.
///
/// figment parses environment values, so `ALARMSIM_ENDPOINT__KEY=123456`
/// would otherwise arrive as an integer and `1.0` as a float.
const ENV_STRING_KEYS: &[&str] = &[
    "endpoint.url",
    "endpoint.key",
    "endpoint.auth_header",
    "images.root_url",
    "fleet.id_prefix",
    "event.event_type",
    "event.subject_prefix",
    "event.data_version",
];

/// Placeholder printed instead of the endpoint key.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ALARMSIM_`, nested with `__`)
/// 2. TOML config file at `~/.config/alarmsim/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event ingestion endpoint.
    pub endpoint: EndpointConfig,
    /// Alarm image references.
    pub images: ImagesConfig,
    /// Simulated device fleet.
    pub fleet: FleetConfig,
    /// Dispatch timing and run limits.
    pub schedule: ScheduleConfig,
    /// Event envelope fields.
    pub event: EventConfig,
}

/// Where and how events are posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL of the event ingestion endpoint.
    pub url: Option<String>,
    /// Access key sent in the auth header.
    pub key: Option<String>,
    /// Name of the header carrying the access key.
    pub auth_header: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Image references attached to alarms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Base URL that image names are resolved against.
    pub root_url: String,
    /// Image file names to choose from.
    pub names: Vec<String>,
}

/// The simulated fleet of alarm devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of devices to simulate.
    pub device_count: usize,
    /// Prefix for generated device ids.
    pub id_prefix: String,
    /// Status texts to choose from.
    pub statuses: Vec<String>,
    /// Area devices are placed within.
    pub bounds: BoundingBox,
}

/// Dispatch timing and run limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Lower bound of the randomized pause between events, in milliseconds.
    pub min_interval_ms: u64,
    /// Upper bound of the randomized pause between events, in milliseconds.
    pub max_interval_ms: u64,
    /// Stop after this many seconds of wall-clock time.
    /// Set to 0 for unlimited.
    pub max_duration_secs: u64,
    /// Stop after this many dispatch attempts.
    /// Set to 0 for unlimited.
    pub max_events: u64,
    /// Seed for the random number generator; random when unset.
    pub seed: Option<u64>,
}

/// Event envelope fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Value of the `eventType` field.
    pub event_type: String,
    /// Prefix of the `subject` field; the device id is appended.
    pub subject_prefix: String,
    /// Value of the `dataVersion` field.
    pub data_version: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            auth_header: "aeg-sas-key".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root_url: "https://example.com/alarm-images/".to_string(),
            names: (1..=5).map(|n| format!("alarm-{n}.jpg")).collect(),
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            device_count: 10,
            id_prefix: "alarm-device".to_string(),
            statuses: default_statuses(),
            bounds: BoundingBox::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
            max_interval_ms: 5_000,
            max_duration_secs: 0, // Run until interrupted
            max_events: 0,
            seed: None,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_type: "alarm.raised".to_string(),
            subject_prefix: "devices".to_string(),
            data_version: "1.0".to_string(),
        }
    }
}

/// Default alarm status texts.
fn default_statuses() -> Vec<String> {
    vec![
        "Motion detected".to_string(),
        "Door forced open".to_string(),
        "Glass break detected".to_string(),
        "Smoke detected".to_string(),
        "Tamper alert".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ALARMSIM_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        let env = Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR);
        let verbatim: Vec<(String, String)> = env
            .iter()
            .filter(|(key, _)| ENV_STRING_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect();

        verbatim.into_iter().fold(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(config_file))
                .merge(env),
            |figment, (key, value)| figment.merge(Serialized::default(&key, value)),
        )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// The endpoint URL and key may be absent here; they are only required
    /// when events are actually sent (see [`Config::require_endpoint`]).
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        // Fleet
        if self.fleet.device_count == 0 {
            return Err(Error::validation("fleet.device_count must be greater than 0"));
        }

        if self.fleet.statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::validation(
                "fleet.statuses must contain at least one non-empty status",
            ));
        }

        self.fleet.bounds.validate()?;

        // Images
        if self.images.names.iter().all(|n| n.trim().is_empty()) {
            return Err(Error::validation(
                "images.names must contain at least one non-empty name",
            ));
        }

        parse_url(&self.images.root_url)?;

        // Schedule
        if self.schedule.max_interval_ms == 0 {
            return Err(Error::validation(
                "schedule.max_interval_ms must be greater than 0",
            ));
        }

        if self.schedule.min_interval_ms > self.schedule.max_interval_ms {
            return Err(Error::validation(format!(
                "schedule.min_interval_ms ({}) cannot be greater than schedule.max_interval_ms ({})",
                self.schedule.min_interval_ms, self.schedule.max_interval_ms
            )));
        }

        // Endpoint
        if self.endpoint.timeout_ms == 0 {
            return Err(Error::validation("endpoint.timeout_ms must be greater than 0"));
        }

        if HeaderName::from_bytes(self.endpoint.auth_header.as_bytes()).is_err() {
            return Err(Error::validation(format!(
                "endpoint.auth_header '{}' is not a valid HTTP header name",
                self.endpoint.auth_header
            )));
        }

        if let Some(url) = &self.endpoint.url {
            parse_url(url)?;
        }

        Ok(())
    }

    /// Resolve the endpoint URL and key needed to send events.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or key is missing, or the URL is invalid.
    pub fn require_endpoint(&self) -> Result<(Url, &str)> {
        let url = self
            .endpoint
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                Error::config_missing(
                    "endpoint.url",
                    format!("Set it in the config file or via {ENV_PREFIX}ENDPOINT__URL."),
                )
            })?;

        let key = self
            .endpoint
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::config_missing(
                    "endpoint.key",
                    format!("Set it in the config file or via {ENV_PREFIX}ENDPOINT__KEY."),
                )
            })?;

        Ok((parse_url(url)?, key))
    }

    /// A copy of this configuration with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.endpoint.key.is_some() {
            copy.endpoint.key = Some(REDACTED.to_string());
        }
        copy
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.endpoint.timeout_ms)
    }

    /// Get the bounds of the randomized pause between events.
    #[must_use]
    pub fn interval_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.schedule.min_interval_ms),
            Duration::from_millis(self.schedule.max_interval_ms),
        )
    }

    /// Get the wall-clock run limit, if any.
    #[must_use]
    pub fn max_duration(&self) -> Option<Duration> {
        if self.schedule.max_duration_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.schedule.max_duration_secs))
        }
    }

    /// Get the dispatch attempt limit, if any.
    #[must_use]
    pub fn max_events(&self) -> Option<u64> {
        if self.schedule.max_events == 0 {
            None
        } else {
            Some(self.schedule.max_events)
        }
    }
}

/// Parse a URL, mapping failures to a configuration error.
pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| Error::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
