//! Community identifiers and frontier entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Prefixes stripped from handles when they are pasted as links.
const LINK_PREFIXES: [&str; 4] = ["https://t.me/", "http://t.me/", "t.me/", "@"];

/// Error type for community identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunityIdError {
    /// Handle was empty after normalization.
    #[error("Empty community handle: {0:?}")]
    Empty(String),
}

/// Identifier of a community (channel or group) on the platform.
///
/// Comparison and hashing are case-insensitive; `Display` keeps the
/// casing the handle was first written with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommunityId {
    handle: String,
    key: String,
}

impl CommunityId {
    /// Parse a handle, accepting `name`, `@name`, `t.me/name` and
    /// `https://t.me/name` spellings.
    pub fn parse(raw: &str) -> Result<Self, CommunityIdError> {
        let mut handle = raw.trim();
        for prefix in LINK_PREFIXES {
            if let Some(rest) = handle.strip_prefix(prefix) {
                handle = rest;
            }
        }
        let handle = handle.trim_end_matches('/').trim();
        if handle.is_empty() {
            return Err(CommunityIdError::Empty(raw.to_string()));
        }
        Ok(Self {
            handle: handle.to_string(),
            key: handle.to_lowercase(),
        })
    }

    /// Handle as originally written.
    pub fn as_str(&self) -> &str {
        &self.handle
    }

    /// Lowercased comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `other` names this community, ignoring case.
    pub fn matches(&self, other: &str) -> bool {
        self.key == other.to_lowercase()
    }
}

impl PartialEq for CommunityId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CommunityId {}

impl Hash for CommunityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for CommunityId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CommunityId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle)
    }
}

impl TryFrom<String> for CommunityId {
    type Error = CommunityIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommunityId> for String {
    fn from(id: CommunityId) -> Self {
        id.handle
    }
}

/// A queued community together with its discovery depth (0 = seed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// The community to process.
    pub community: CommunityId,
    /// Hops from the nearest seed.
    pub depth: u32,
}

impl FrontierEntry {
    /// Create a new entry.
    pub fn new(community: CommunityId, depth: u32) -> Self {
        Self { community, depth }
    }

    /// Entry for a child discovered from this one.
    pub fn child(&self, community: CommunityId) -> Self {
        Self::new(community, self.depth + 1)
    }
}
