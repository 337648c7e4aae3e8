//! Result records: one per processed community.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::community::CommunityId;
use super::contact::{Language, Resolution};
use super::outcome::ResultStatus;

/// Identity placeholder written when no owner was found.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Append-only record of what happened to one community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Community handle.
    pub community: String,
    /// Owner identity, or [`NOT_FOUND`].
    pub identity: String,
    /// Detected language.
    pub language: Language,
    /// Outcome label.
    pub status: ResultStatus,
    /// Discovery depth (0 = seed).
    #[serde(default)]
    pub depth: u32,
    /// When the record was produced.
    pub timestamp: DateTime<Utc>,
    /// Run that produced the record.
    #[serde(default = "Uuid::nil")]
    pub run_id: Uuid,
}

impl ResultRecord {
    /// Build a record for a processed community.
    pub fn new(
        run_id: Uuid,
        community: &CommunityId,
        depth: u32,
        resolution: &Resolution,
        status: ResultStatus,
    ) -> Self {
        let identity = resolution
            .contact()
            .map(|c| c.identity.clone())
            .unwrap_or_else(|| NOT_FOUND.to_string());
        Self {
            community: community.as_str().to_string(),
            identity,
            language: resolution.language(),
            status,
            depth,
            timestamp: Utc::now(),
            run_id,
        }
    }

    /// Whether an owner identity was recorded.
    pub fn has_identity(&self) -> bool {
        self.identity != NOT_FOUND
    }

    /// Public link to the community.
    pub fn community_link(&self) -> String {
        format!("https://t.me/{}", self.community)
    }

    /// The `(community, identity, status)` triple used for replay checks.
    pub fn triple(&self) -> (String, String, ResultStatus) {
        (self.community.clone(), self.identity.clone(), self.status)
    }
}
