//! Messaging platform access.
//!
//! The kernel never talks to a network directly; everything it needs from
//! the platform goes through [`PlatformClient`]. Every method is fallible and
//! callers degrade on error rather than propagating.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A resolved platform entity (community or user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Platform-internal numeric id.
    pub id: i64,
    /// Public handle, if the entity has one.
    pub handle: Option<String>,
}

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(id: i64, handle: Option<String>) -> Self {
        Self { id, handle }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.handle {
            Some(handle) => write!(f, "@{handle}"),
            None => write!(f, "#{}", self.id),
        }
    }
}

/// Reference to a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub i64);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message in a conversation or a community feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message reference.
    pub id: MessageRef,
    /// Authored by the running account.
    #[serde(default)]
    pub outgoing: bool,
    /// Text body, absent for media-only messages.
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// A message written by the other party.
    pub fn incoming(id: i64, text: impl Into<String>) -> Self {
        Self {
            id: MessageRef(id),
            outgoing: false,
            text: Some(text.into()),
        }
    }

    /// A message written by the running account.
    pub fn outgoing(id: i64, text: impl Into<String>) -> Self {
        Self {
            id: MessageRef(id),
            outgoing: true,
            text: Some(text.into()),
        }
    }
}

/// Options for a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Render link previews in the sent message.
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { link_preview: false }
    }
}

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The platform asked us to slow down.
    #[error("Throttled, retry after {wait:?}")]
    Throttled {
        /// Suggested wait before the next request.
        wait: Duration,
    },
    /// Entity does not exist or is not visible.
    #[error("Entity not found: {0}")]
    NotFound(String),
    /// Access to the entity was refused.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Any other remote failure.
    #[error("Platform request failed: {0}")]
    Request(String),
    /// Connection is closed.
    #[error("Platform connection closed")]
    Disconnected,
}

impl PlatformError {
    /// Suggested wait if this is a throttling error.
    pub fn throttle_wait(&self) -> Option<Duration> {
        match self {
            Self::Throttled { wait } => Some(*wait),
            _ => None,
        }
    }
}

/// Trait for messaging platform backends.
///
/// Message listings are ordered newest first.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Resolve a handle to an entity.
    async fn resolve(&self, handle: &str) -> Result<EntityRef, PlatformError>;

    /// Fetch the extended profile description of a community.
    async fn profile_description(&self, entity: &EntityRef) -> Result<String, PlatformError>;

    /// Fetch up to `limit` most recent messages exchanged with or posted by `entity`.
    async fn recent_messages(
        &self,
        entity: &EntityRef,
        limit: usize,
    ) -> Result<Vec<Message>, PlatformError>;

    /// Communities the platform recommends as similar to `entity`.
    async fn similar_communities(&self, entity: &EntityRef) -> Result<Vec<EntityRef>, PlatformError>;

    /// Send a text message.
    async fn send_message(
        &self,
        entity: &EntityRef,
        body: &str,
        options: SendOptions,
    ) -> Result<MessageRef, PlatformError>;

    /// Delete one of our messages.
    async fn delete_message(&self, entity: &EntityRef, message: MessageRef) -> Result<(), PlatformError>;

    /// Close the connection. Called once at the end of a run.
    async fn disconnect(&self) {}
}

pub use memory::InMemoryPlatform;
