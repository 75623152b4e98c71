//! Configuration for the watch service
//!
//! Values come from `WATCH_`-prefixed environment variables (a `.env` file
//! is loaded first when present). Every field has a default so a bare
//! environment yields a usable local setup.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

const ENV_PREFIX: &str = "WATCH_";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the hosted data service (REST endpoint root)
    #[serde(default = "default_store_url")]
    pub store_url: String,
    /// Anonymous API key sent as `apikey` and bearer token
    #[serde(default)]
    pub store_api_key: String,
    /// Origin used when building shareable watch links
    #[serde(default = "default_public_origin")]
    pub public_origin: String,
    /// Upper bound for a single record store call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_caption_interval_secs")]
    pub caption_interval_secs: u64,
    #[serde(default = "default_mood_interval_secs")]
    pub mood_interval_secs: u64,
    #[serde(default = "default_peer_chat_interval_secs")]
    pub peer_chat_interval_secs: u64,
    /// Chance that a simulated peer message is emitted on a tick
    #[serde(default = "default_peer_admission_probability")]
    pub peer_admission_probability: f64,
    /// Where the signed-in broadcaster session is persisted
    #[serde(default = "default_auth_session_path")]
    pub auth_session_path: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_store_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_public_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_caption_interval_secs() -> u64 {
    5
}

fn default_mood_interval_secs() -> u64 {
    8
}

fn default_peer_chat_interval_secs() -> u64 {
    7
}

fn default_peer_admission_probability() -> f64 {
    0.7
}

fn default_auth_session_path() -> String {
    ".watch-session.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: default_store_url(),
            store_api_key: String::new(),
            public_origin: default_public_origin(),
            request_timeout_ms: default_request_timeout_ms(),
            caption_interval_secs: default_caption_interval_secs(),
            mood_interval_secs: default_mood_interval_secs(),
            peer_chat_interval_secs: default_peer_chat_interval_secs(),
            peer_admission_probability: default_peer_admission_probability(),
            auth_session_path: default_auth_session_path(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables (names keep the `WATCH_` prefix)
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "WATCH_REQUEST_TIMEOUT_MS must be positive".into(),
            ));
        }

        for (name, value) in [
            ("WATCH_CAPTION_INTERVAL_SECS", self.caption_interval_secs),
            ("WATCH_MOOD_INTERVAL_SECS", self.mood_interval_secs),
            ("WATCH_PEER_CHAT_INTERVAL_SECS", self.peer_chat_interval_secs),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{name} must be positive")));
            }
        }

        if !(0.0..=1.0).contains(&self.peer_admission_probability) {
            return Err(AppError::Config(format!(
                "WATCH_PEER_ADMISSION_PROBABILITY must be within [0, 1], got {}",
                self.peer_admission_probability
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn caption_interval(&self) -> Duration {
        Duration::from_secs(self.caption_interval_secs)
    }

    pub fn mood_interval(&self) -> Duration {
        Duration::from_secs(self.mood_interval_secs)
    }

    pub fn peer_chat_interval(&self) -> Duration {
        Duration::from_secs(self.peer_chat_interval_secs)
    }

    pub fn auth_session_path(&self) -> PathBuf {
        PathBuf::from(&self.auth_session_path)
    }
}
