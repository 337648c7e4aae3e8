//! In-memory platform for testing and offline runs.
//!
//! Communities and users are described by a [`PlatformFixture`], which can be
//! built in code or loaded from JSON. Every call is logged so tests can assert
//! on what the kernel asked for, and faults can be injected per entity.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EntityRef, Message, MessageRef, PlatformClient, PlatformError, SendOptions};

/// Injected failure for a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommunityFault {
    /// `resolve` fails.
    Unresolvable,
    /// `profile_description` fails.
    ProfileFails,
    /// Post listing fails.
    PostsFail,
    /// `similar_communities` fails.
    SimilarFails,
    /// `similar_communities` answers with a throttling error.
    SimilarThrottled {
        /// Suggested wait in seconds.
        secs: u64,
    },
}

/// Injected failure for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserFault {
    /// `resolve` fails.
    Unresolvable,
    /// Conversation history listing fails.
    HistoryFails,
    /// `send_message` fails immediately.
    SendFails,
    /// `send_message` never completes.
    SendHangs,
    /// Deleting this specific message fails.
    DeleteFails {
        /// Message id.
        message: i64,
    },
    /// Every deletion fails.
    DeleteAllFails,
}

/// A community as seen by the in-memory platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunityFixture {
    /// Extended profile description.
    #[serde(default)]
    pub description: String,
    /// Recent posts, newest first.
    #[serde(default)]
    pub posts: Vec<String>,
    /// Handles of recommended similar communities.
    #[serde(default)]
    pub similar: Vec<String>,
    /// Number of recommended communities without a public handle.
    #[serde(default)]
    pub private_similar: usize,
    /// Injected failures.
    #[serde(default)]
    pub faults: Vec<CommunityFault>,
}

impl CommunityFixture {
    /// Community with the given profile description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Set recent posts (newest first).
    pub fn posts<I, S>(mut self, posts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.posts = posts.into_iter().map(Into::into).collect();
        self
    }

    /// Set similar community handles.
    pub fn similar<I, S>(mut self, similar: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.similar = similar.into_iter().map(Into::into).collect();
        self
    }

    /// Add recommendations without a public handle.
    pub fn private_similar(mut self, count: usize) -> Self {
        self.private_similar = count;
        self
    }

    /// Inject a failure.
    pub fn fault(mut self, fault: CommunityFault) -> Self {
        self.faults.push(fault);
        self
    }

    fn has(&self, fault: CommunityFault) -> bool {
        self.faults.contains(&fault)
    }
}

/// A user as seen by the in-memory platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFixture {
    /// Conversation with the running account, newest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// Injected failures.
    #[serde(default)]
    pub faults: Vec<UserFault>,
}

impl UserFixture {
    /// User with no prior conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conversation history (newest first).
    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Inject a failure.
    pub fn fault(mut self, fault: UserFault) -> Self {
        self.faults.push(fault);
        self
    }

    fn has(&self, fault: UserFault) -> bool {
        self.faults.contains(&fault)
    }

    fn delete_fails(&self, message: MessageRef) -> bool {
        self.faults.iter().any(|f| match f {
            UserFault::DeleteAllFails => true,
            UserFault::DeleteFails { message: id } => *id == message.0,
            _ => false,
        })
    }
}

/// Full description of an in-memory platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformFixture {
    /// Communities by handle.
    #[serde(default)]
    pub communities: BTreeMap<String, CommunityFixture>,
    /// Users by handle.
    #[serde(default)]
    pub users: BTreeMap<String, UserFixture>,
}

impl PlatformFixture {
    /// Parse a fixture from JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn normalized(self) -> Self {
        Self {
            communities: self
                .communities
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            users: self
                .users
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }
}

/// A message accepted by the in-memory platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient handle (lowercase).
    pub to: String,
    /// Message body.
    pub body: String,
    /// Whether link previews were requested.
    pub link_preview: bool,
    /// Assigned message reference.
    pub id: MessageRef,
}

/// Record of every call made against the in-memory platform.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    /// Handles passed to `resolve`.
    pub resolves: Vec<String>,
    /// Communities whose posts were listed.
    pub post_fetches: Vec<String>,
    /// Users whose conversation history was listed.
    pub history_fetches: Vec<String>,
    /// Communities queried for recommendations.
    pub similar_queries: Vec<String>,
    /// Successful sends.
    pub sends: Vec<SentMessage>,
    /// Attempted deletions (handle, message).
    pub deletions: Vec<(String, MessageRef)>,
}

impl CallLog {
    /// History listings for one user.
    pub fn history_fetches_for(&self, handle: &str) -> usize {
        let handle = handle.to_lowercase();
        self.history_fetches.iter().filter(|h| **h == handle).count()
    }

    /// Successful sends to one user.
    pub fn sends_to(&self, handle: &str) -> usize {
        let handle = handle.to_lowercase();
        self.sends.iter().filter(|s| s.to == handle).count()
    }
}

#[derive(Debug, Default)]
struct State {
    fixture: PlatformFixture,
    ids: BTreeMap<String, i64>,
    next_id: i64,
    next_message_id: i64,
    log: CallLog,
    disconnected: bool,
}

impl State {
    fn entity_for(&mut self, handle: &str) -> EntityRef {
        let key = handle.to_lowercase();
        let next = self.next_id + 1;
        let id = *self.ids.entry(key.clone()).or_insert(next);
        if id == next {
            self.next_id = next;
        }
        EntityRef::new(id, Some(key))
    }

    fn check_connected(&self) -> Result<(), PlatformError> {
        if self.disconnected {
            Err(PlatformError::Disconnected)
        } else {
            Ok(())
        }
    }
}

fn handle_of(entity: &EntityRef) -> Result<String, PlatformError> {
    entity
        .handle
        .as_ref()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| PlatformError::NotFound(entity.to_string()))
}

enum SendPlan {
    Fail,
    Hang,
}

/// In-memory platform backed by a [`PlatformFixture`].
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
}

impl InMemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a platform from a fixture.
    pub fn from_fixture(fixture: PlatformFixture) -> Self {
        let max_message_id = fixture
            .users
            .values()
            .flat_map(|u| u.history.iter().map(|m| m.id.0))
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(State {
                fixture: fixture.normalized(),
                next_message_id: max_message_id,
                ..State::default()
            }),
        }
    }

    /// Add a community.
    pub fn with_community(self, handle: &str, community: CommunityFixture) -> Self {
        self.state
            .lock()
            .fixture
            .communities
            .insert(handle.to_lowercase(), community);
        self
    }

    /// Add a user.
    pub fn with_user(self, handle: &str, user: UserFixture) -> Self {
        {
            let mut state = self.state.lock();
            let max_id = user.history.iter().map(|m| m.id.0).max().unwrap_or(0);
            state.next_message_id = state.next_message_id.max(max_id);
            state.fixture.users.insert(handle.to_lowercase(), user);
        }
        self
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> CallLog {
        self.state.lock().log.clone()
    }

    /// Current conversation with a user, newest first.
    pub fn conversation(&self, handle: &str) -> Vec<Message> {
        self.state
            .lock()
            .fixture
            .users
            .get(&handle.to_lowercase())
            .map(|u| u.history.clone())
            .unwrap_or_default()
    }

    /// Whether `disconnect` has been called.
    pub fn is_disconnected(&self) -> bool {
        self.state.lock().disconnected
    }
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn resolve(&self, handle: &str) -> Result<EntityRef, PlatformError> {
        let mut state = self.state.lock();
        state.check_connected()?;
        let key = handle.to_lowercase();
        state.log.resolves.push(key.clone());

        let unresolvable = if let Some(c) = state.fixture.communities.get(&key) {
            c.has(CommunityFault::Unresolvable)
        } else if let Some(u) = state.fixture.users.get(&key) {
            u.has(UserFault::Unresolvable)
        } else {
            true
        };
        if unresolvable {
            return Err(PlatformError::NotFound(handle.to_string()));
        }
        Ok(state.entity_for(&key))
    }

    async fn profile_description(&self, entity: &EntityRef) -> Result<String, PlatformError> {
        let state = self.state.lock();
        state.check_connected()?;
        let key = handle_of(entity)?;
        match state.fixture.communities.get(&key) {
            Some(c) if c.has(CommunityFault::ProfileFails) => {
                Err(PlatformError::Request(format!("profile unavailable for {key}")))
            }
            Some(c) => Ok(c.description.clone()),
            None => Err(PlatformError::NotFound(key)),
        }
    }

    async fn recent_messages(
        &self,
        entity: &EntityRef,
        limit: usize,
    ) -> Result<Vec<Message>, PlatformError> {
        let mut state = self.state.lock();
        state.check_connected()?;
        let key = handle_of(entity)?;

        if let Some(community) = state.fixture.communities.get(&key) {
            let result = if community.has(CommunityFault::PostsFail) {
                Err(PlatformError::Request(format!("posts unavailable for {key}")))
            } else {
                Ok(community
                    .posts
                    .iter()
                    .take(limit)
                    .enumerate()
                    .map(|(i, text)| Message::incoming(i as i64 + 1, text.clone()))
                    .collect())
            };
            state.log.post_fetches.push(key);
            return result;
        }

        let result = match state.fixture.users.get(&key) {
            Some(u) if u.has(UserFault::HistoryFails) => {
                Err(PlatformError::Request(format!("history unavailable for {key}")))
            }
            Some(u) => Ok(u.history.iter().take(limit).cloned().collect()),
            None => Err(PlatformError::NotFound(key.clone())),
        };
        state.log.history_fetches.push(key);
        result
    }

    async fn similar_communities(&self, entity: &EntityRef) -> Result<Vec<EntityRef>, PlatformError> {
        let mut state = self.state.lock();
        state.check_connected()?;
        let key = handle_of(entity)?;
        state.log.similar_queries.push(key.clone());

        let community = state
            .fixture
            .communities
            .get(&key)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(key.clone()))?;

        for fault in &community.faults {
            match fault {
                CommunityFault::SimilarThrottled { secs } => {
                    return Err(PlatformError::Throttled {
                        wait: Duration::from_secs(*secs),
                    })
                }
                CommunityFault::SimilarFails => {
                    return Err(PlatformError::Request(format!(
                        "recommendations unavailable for {key}"
                    )))
                }
                _ => {}
            }
        }

        let mut similar: Vec<EntityRef> = community
            .similar
            .iter()
            .map(|handle| state.entity_for(handle))
            .collect();
        for i in 0..community.private_similar {
            similar.push(EntityRef::new(-(i as i64) - 1, None));
        }
        Ok(similar)
    }

    async fn send_message(
        &self,
        entity: &EntityRef,
        body: &str,
        options: SendOptions,
    ) -> Result<MessageRef, PlatformError> {
        let plan = {
            let mut state = self.state.lock();
            state.check_connected()?;
            let key = handle_of(entity)?;
            let user = state
                .fixture
                .users
                .get(&key)
                .ok_or_else(|| PlatformError::NotFound(key.clone()))?;

            if user.has(UserFault::SendHangs) {
                SendPlan::Hang
            } else if user.has(UserFault::SendFails) {
                SendPlan::Fail
            } else {
                state.next_message_id += 1;
                let id = MessageRef(state.next_message_id);
                if let Some(user) = state.fixture.users.get_mut(&key) {
                    user.history.insert(0, Message::outgoing(id.0, body));
                }
                state.log.sends.push(SentMessage {
                    to: key,
                    body: body.to_string(),
                    link_preview: options.link_preview,
                    id,
                });
                return Ok(id);
            }
        };

        match plan {
            SendPlan::Fail => Err(PlatformError::Request("send rejected".to_string())),
            SendPlan::Hang => std::future::pending().await,
        }
    }

    async fn delete_message(&self, entity: &EntityRef, message: MessageRef) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.check_connected()?;
        let key = handle_of(entity)?;
        state.log.deletions.push((key.clone(), message));

        let user = state
            .fixture
            .users
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound(key.clone()))?;
        if user.delete_fails(message) {
            return Err(PlatformError::Forbidden(format!("cannot delete {message}")));
        }
        let before = user.history.len();
        user.history.retain(|m| m.id != message);
        if user.history.len() == before {
            return Err(PlatformError::NotFound(format!("message {message}")));
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> InMemoryPlatform {
        InMemoryPlatform::new()
            .with_community(
                "Alpha",
                CommunityFixture::new("Contact @Owner1")
                    .posts(["newest", "older"])
                    .similar(["beta", "gamma"])
                    .private_similar(1),
            )
            .with_user(
                "owner1",
                UserFixture::new().history(vec![Message::outgoing(10, "hi")]),
            )
    }

    #[tokio::test]
    async fn test_resolve_is_case_insensitive_and_stable() {
        let p = platform();
        let a = p.resolve("ALPHA").await.unwrap();
        let b = p.resolve("alpha").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.handle.as_deref(), Some("alpha"));
        assert!(matches!(p.resolve("nobody").await, Err(PlatformError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_posts_and_history_are_separate() {
        let p = platform();
        let alpha = p.resolve("alpha").await.unwrap();
        let posts = p.recent_messages(&alpha, 1).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text.as_deref(), Some("newest"));

        let owner = p.resolve("owner1").await.unwrap();
        let history = p.recent_messages(&owner, 30).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].outgoing);

        let calls = p.calls();
        assert_eq!(calls.post_fetches, vec!["alpha".to_string()]);
        assert_eq!(calls.history_fetches_for("owner1"), 1);
    }

    #[tokio::test]
    async fn test_similar_includes_private_entries() {
        let p = platform();
        let alpha = p.resolve("alpha").await.unwrap();
        let similar = p.similar_communities(&alpha).await.unwrap();
        assert_eq!(similar.len(), 3);
        assert_eq!(similar.iter().filter(|e| e.handle.is_none()).count(), 1);
    }

    #[tokio::test]
    async fn test_send_then_delete() {
        let p = platform();
        let owner = p.resolve("owner1").await.unwrap();
        let id = p.send_message(&owner, "hello", SendOptions::default()).await.unwrap();
        assert_eq!(id, MessageRef(11));
        assert_eq!(p.conversation("owner1")[0].id, id);

        p.delete_message(&owner, id).await.unwrap();
        assert_eq!(p.conversation("owner1").len(), 1);
        assert!(p.delete_message(&owner, id).await.is_err());
        assert_eq!(p.calls().deletions.len(), 2);
    }

    #[tokio::test]
    async fn test_faults() {
        let p = InMemoryPlatform::new()
            .with_community(
                "slow",
                CommunityFixture::new("").fault(CommunityFault::SimilarThrottled { secs: 3 }),
            )
            .with_user("mute", UserFixture::new().fault(UserFault::SendFails));

        let slow = p.resolve("slow").await.unwrap();
        let err = p.similar_communities(&slow).await.unwrap_err();
        assert_eq!(err.throttle_wait(), Some(Duration::from_secs(3)));

        let mute = p.resolve("mute").await.unwrap();
        assert!(p.send_message(&mute, "x", SendOptions::default()).await.is_err());
        assert!(p.calls().sends.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_closes_everything() {
        let p = platform();
        p.disconnect().await;
        assert!(p.is_disconnected());
        assert_eq!(p.resolve("alpha").await.unwrap_err(), PlatformError::Disconnected);
    }

    #[test]
    fn test_fixture_from_json() {
        let raw = r#"{
            "communities": {
                "Alpha": { "description": "@owner", "similar": ["beta"],
                           "faults": [{ "kind": "similar_throttled", "secs": 5 }] }
            },
            "users": {
                "owner": { "history": [{ "id": 3, "outgoing": false, "text": "hey" }] }
            }
        }"#;
        let fixture = PlatformFixture::from_json(raw).unwrap();
        assert_eq!(fixture.communities["Alpha"].similar, vec!["beta".to_string()]);
        let p = InMemoryPlatform::from_fixture(fixture);
        assert_eq!(p.conversation("OWNER").len(), 1);
    }
}
