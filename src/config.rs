//! Run configuration.
//!
//! Loaded once at startup from a JSON file and passed by reference to every
//! component. Keys the kernel does not use (credentials, phone number) are
//! ignored.
//!
//! ```json
//! {
//!   "seed_channels": ["alpha", "beta"],
//!   "keywords": ["crypto"],
//!   "target_language": "BOTH",
//!   "cooldown_days": 2,
//!   "send_delay_seconds": 15,
//!   "max_sent_per_run": 50,
//!   "msg_ru": "Здравствуйте!",
//!   "msg_en": "Hello!"
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::ledger::DEFAULT_COOLDOWN_DAYS;
use crate::types::{CommunityId, Language};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Config path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid JSON for this schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Both message templates are empty.
    #[error("No message templates configured (msg_ru and msg_en are both empty)")]
    NoTemplates,
    /// The target language has no template.
    #[error("target_language is {0} but its message template is empty")]
    MissingTemplate(Language),
}

/// Which community languages receive messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetLanguage {
    /// Only RU communities.
    Ru,
    /// Only EN communities.
    En,
    /// Every community.
    #[default]
    Both,
}

impl TargetLanguage {
    /// Whether communities in `language` pass the filter.
    pub fn accepts(&self, language: Language) -> bool {
        match self {
            Self::Ru => language == Language::Ru,
            Self::En => language == Language::En,
            Self::Both => true,
        }
    }
}

/// Pacing and timeout knobs.
///
/// Defaults match the platform's tolerance for a single account; they are
/// rarely changed outside tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after every processed community, in milliseconds.
    pub node_pause_ms: u64,
    /// Pause after retracting old messages, in milliseconds.
    pub settle_pause_ms: u64,
    /// Deadline for a single send, in seconds.
    pub send_timeout_secs: u64,
    /// Upper bound on a throttling backoff, in seconds.
    pub throttle_backoff_cap_secs: u64,
}

impl Pacing {
    /// Pause after every processed community.
    pub fn node_pause(&self) -> Duration {
        Duration::from_millis(self.node_pause_ms)
    }

    /// Pause after retracting old messages.
    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }

    /// Deadline for a single send.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Upper bound on a throttling backoff.
    pub fn throttle_backoff_cap(&self) -> Duration {
        Duration::from_secs(self.throttle_backoff_cap_secs)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            node_pause_ms: 1_000,
            settle_pause_ms: 500,
            send_timeout_secs: 15,
            throttle_backoff_cap_secs: 10,
        }
    }
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Communities the traversal starts from.
    pub seed_channels: Vec<String>,
    /// Informational search keywords; not used by the traversal.
    pub keywords: Vec<String>,
    /// Language filter applied before sending.
    pub target_language: TargetLanguage,
    /// Cooldown window per identity, in whole days.
    pub cooldown_days: u32,
    /// Pause after each successful send, in seconds.
    pub send_delay_seconds: u64,
    /// Successful sends after which the run stops.
    pub max_sent_per_run: u32,
    /// Template for RU communities.
    pub msg_ru: String,
    /// Template for EN communities.
    pub msg_en: String,
    /// Pacing and timeouts.
    pub pacing: Pacing,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed_channels: Vec::new(),
            keywords: Vec::new(),
            target_language: TargetLanguage::Both,
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
            send_delay_seconds: 15,
            max_sent_per_run: 50,
            msg_ru: String::new(),
            msg_en: String::new(),
            pacing: Pacing::default(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Check template coverage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ru = !self.msg_ru.trim().is_empty();
        let en = !self.msg_en.trim().is_empty();
        match (self.target_language, ru, en) {
            (_, false, false) => Err(ConfigError::NoTemplates),
            (TargetLanguage::Ru, false, _) => Err(ConfigError::MissingTemplate(Language::Ru)),
            (TargetLanguage::En, _, false) => Err(ConfigError::MissingTemplate(Language::En)),
            _ => Ok(()),
        }
    }

    /// Seeds as community ids, de-duplicated case-insensitively in order.
    ///
    /// Unparseable entries are skipped with a warning.
    pub fn seeds(&self) -> Vec<CommunityId> {
        let mut seeds: Vec<CommunityId> = Vec::new();
        for raw in &self.seed_channels {
            match CommunityId::parse(raw) {
                Ok(id) if !seeds.contains(&id) => seeds.push(id),
                Ok(_) => {}
                Err(e) => tracing::warn!(seed = %raw, error = %e, "skipping invalid seed"),
            }
        }
        seeds
    }

    /// Template for `language`, falling back to the other one when empty.
    pub fn template_for(&self, language: Language) -> &str {
        let (preferred, fallback) = match language {
            Language::Ru => (&self.msg_ru, &self.msg_en),
            Language::En => (&self.msg_en, &self.msg_ru),
        };
        if preferred.trim().is_empty() {
            fallback
        } else {
            preferred
        }
    }

    /// Pause after each successful send.
    pub fn send_delay(&self) -> Duration {
        Duration::from_secs(self.send_delay_seconds)
    }

    /// Stable hash of the configuration, for correlating runs in logs.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }
}
