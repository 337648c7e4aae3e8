//! Cross-run cooldown memory.
//!
//! The ledger maps an identity to the instant it was last contacted. It is
//! loaded once at startup and rewritten wholesale after every mark, so a
//! crash loses at most the in-flight send.
//!
//! ## Store format
//!
//! A JSON object of identity → ISO-8601 timestamp:
//!
//! ```json
//! { "owner1": "2026-10-15T09:30:00Z" }
//! ```
//!
//! Timestamps without an offset are read as local time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Default cooldown window in whole days.
pub const DEFAULT_COOLDOWN_DAYS: u32 = 2;

/// Error type for ledger persistence.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Writing the store failed.
    #[error("Failed to write cooldown store {path}: {source}")]
    Write {
        /// Store path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serializing the store failed.
    #[error("Failed to serialize cooldown store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parse a stored timestamp (RFC 3339, or naive ISO-8601 as local time).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Identity → last-contact ledger with a cooldown window.
#[derive(Debug, Clone)]
pub struct CooldownLedger {
    path: Option<PathBuf>,
    entries: BTreeMap<String, DateTime<Utc>>,
    cooldown_days: i64,
}

impl CooldownLedger {
    /// Ledger that lives only in memory.
    pub fn in_memory(cooldown_days: u32) -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            cooldown_days: i64::from(cooldown_days),
        }
    }

    /// Load the ledger from `path`.
    ///
    /// A missing or corrupt store yields an empty ledger; entries with
    /// unreadable timestamps are dropped.
    pub fn load(path: impl Into<PathBuf>, cooldown_days: u32) -> Self {
        let path = path.into();
        let mut ledger = Self {
            path: Some(path.clone()),
            ..Self::in_memory(cooldown_days)
        };

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ledger,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cooldown store unreadable, starting empty");
                return ledger;
            }
        };

        let stored: BTreeMap<String, String> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cooldown store corrupt, starting empty");
                return ledger;
            }
        };

        for (identity, ts) in stored {
            match parse_timestamp(&ts) {
                Some(ts) => {
                    ledger.entries.insert(identity.to_lowercase(), ts);
                }
                None => {
                    tracing::warn!(identity = %identity, timestamp = %ts, "dropping unreadable cooldown entry");
                }
            }
        }
        tracing::debug!(path = %path.display(), entries = ledger.entries.len(), "cooldown store loaded");
        ledger
    }

    /// Backing store path, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Configured cooldown window in days.
    pub fn cooldown_days(&self) -> i64 {
        self.cooldown_days
    }

    /// Number of identities tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identity is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last contact with `identity`.
    pub fn last_contact(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.entries.get(&identity.to_lowercase()).copied()
    }

    /// Whether `identity` was contacted within the cooldown window.
    pub fn in_cooldown(&self, identity: &str) -> bool {
        self.in_cooldown_at(identity, Utc::now())
    }

    /// [`in_cooldown`](Self::in_cooldown) evaluated at `now`.
    ///
    /// Elapsed time is truncated to whole days; the identity stays in
    /// cooldown while fewer than `cooldown_days` whole days have passed.
    pub fn in_cooldown_at(&self, identity: &str, now: DateTime<Utc>) -> bool {
        match self.last_contact(identity) {
            Some(last) => (now - last).num_days() < self.cooldown_days,
            None => false,
        }
    }

    /// Record a contact with `identity` now and flush the store.
    pub fn mark_sent(&mut self, identity: &str) -> Result<(), LedgerError> {
        self.mark_sent_at(identity, Utc::now())
    }

    /// Record a contact with `identity` at `at` and flush the store.
    ///
    /// The in-memory entry is updated even if the flush fails.
    pub fn mark_sent_at(&mut self, identity: &str, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.entries.insert(identity.to_lowercase(), at);
        self.flush()
    }

    /// Rewrite the whole store.
    pub fn flush(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let stored: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|(identity, ts)| (identity.as_str(), ts.to_rfc3339()))
            .collect();
        let body = serde_json::to_string_pretty(&stored)?;

        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, body.as_bytes())?;
            std::fs::rename(&tmp, path)
        };
        write(path).map_err(|source| LedgerError::Write {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(days_ago: i64, hours_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(days_ago) - Duration::hours(hours_ago)
    }

    #[test]
    fn test_absent_identity_not_in_cooldown() {
        let ledger = CooldownLedger::in_memory(2);
        assert!(!ledger.in_cooldown("nobody"));
    }

    #[test]
    fn test_mark_then_in_cooldown() {
        let mut ledger = CooldownLedger::in_memory(2);
        ledger.mark_sent("Owner1").unwrap();
        assert!(ledger.in_cooldown("owner1"));
        assert!(ledger.in_cooldown("OWNER1"));
    }

    #[test]
    fn test_whole_day_boundaries() {
        let now = Utc::now();
        let mut ledger = CooldownLedger::in_memory(2);

        ledger.mark_sent_at("a", at(1, 0, now)).unwrap();
        assert!(ledger.in_cooldown_at("a", now));

        // 1 day 23 hours truncates to 1 whole day
        ledger.mark_sent_at("a", at(1, 23, now)).unwrap();
        assert!(ledger.in_cooldown_at("a", now));

        ledger.mark_sent_at("a", at(2, 0, now)).unwrap();
        assert!(!ledger.in_cooldown_at("a", now));

        ledger.mark_sent_at("a", at(5, 0, now)).unwrap();
        assert!(!ledger.in_cooldown_at("a", now));
    }

    #[test]
    fn test_zero_day_window_never_blocks() {
        let mut ledger = CooldownLedger::in_memory(0);
        ledger.mark_sent("a").unwrap();
        assert!(!ledger.in_cooldown("a"));
    }

    #[test]
    fn test_last_write_wins() {
        let now = Utc::now();
        let mut ledger = CooldownLedger::in_memory(2);
        ledger.mark_sent_at("a", at(10, 0, now)).unwrap();
        ledger.mark_sent_at("a", now).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_contact("a"), Some(now));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-10-15T09:30:00Z").is_some());
        assert!(parse_timestamp("2026-10-15T09:30:00+03:00").is_some());
        assert!(parse_timestamp("2026-10-15T09:30:00.123456").is_some());
        assert!(parse_timestamp("2026-10-15 09:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
