//! Conversation history checks before outreach.

use std::sync::Arc;

use crate::platform::{EntityRef, MessageRef, PlatformClient};

/// Number of recent messages inspected per identity.
pub const HISTORY_WINDOW: usize = 30;

/// Verdict on the conversation with an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCheck {
    /// Safe to send. Our own earlier messages are listed for retraction.
    Clear {
        /// Self-authored messages in the inspected window, newest first.
        retractables: Vec<MessageRef>,
    },
    /// The newest message is from the other party; do not send.
    Ongoing,
    /// History could not be read; treated as clear with nothing to retract.
    Unavailable,
}

impl HistoryCheck {
    /// Whether a send may proceed.
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// Messages to retract before sending.
    pub fn retractables(&self) -> &[MessageRef] {
        match self {
            Self::Clear { retractables } => retractables,
            Self::Ongoing | Self::Unavailable => &[],
        }
    }
}

/// Outcome of a best-effort retraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetractionReport {
    /// Messages deleted.
    pub retracted: usize,
    /// Deletions that failed.
    pub failed: usize,
}

/// Inspects prior conversations and retracts our stale messages.
pub struct ConversationGuard<P: PlatformClient> {
    platform: Arc<P>,
}

impl<P: PlatformClient> ConversationGuard<P> {
    /// Create a guard over a platform client.
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }

    /// Inspect the last [`HISTORY_WINDOW`] messages with `identity`.
    pub async fn check(&self, identity: &EntityRef) -> HistoryCheck {
        let messages = match self.platform.recent_messages(identity, HISTORY_WINDOW).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::debug!(identity = %identity, error = %e, "history unavailable, assuming clear");
                return HistoryCheck::Unavailable;
            }
        };

        if messages.first().is_some_and(|newest| !newest.outgoing) {
            return HistoryCheck::Ongoing;
        }

        HistoryCheck::Clear {
            retractables: messages
                .iter()
                .filter(|m| m.outgoing)
                .map(|m| m.id)
                .collect(),
        }
    }

    /// Delete each message independently; failures never stop the pass.
    pub async fn retract(&self, identity: &EntityRef, messages: &[MessageRef]) -> RetractionReport {
        let mut report = RetractionReport::default();
        for message in messages {
            match self.platform.delete_message(identity, *message).await {
                Ok(()) => report.retracted += 1,
                Err(e) => {
                    tracing::debug!(identity = %identity, message = %message, error = %e, "retraction failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::{UserFault, UserFixture};
    use crate::platform::{InMemoryPlatform, Message};

    async fn guard_for(user: UserFixture) -> (ConversationGuard<InMemoryPlatform>, EntityRef, Arc<InMemoryPlatform>) {
        let platform = Arc::new(InMemoryPlatform::new().with_user("owner", user));
        let entity = platform.resolve("owner").await.unwrap();
        (ConversationGuard::new(Arc::clone(&platform)), entity, platform)
    }

    #[tokio::test]
    async fn test_empty_history_is_clear() {
        let (guard, owner, _) = guard_for(UserFixture::new()).await;
        assert_eq!(guard.check(&owner).await, HistoryCheck::Clear { retractables: vec![] });
    }

    #[tokio::test]
    async fn test_incoming_newest_is_ongoing() {
        let (guard, owner, _) = guard_for(UserFixture::new().history(vec![
            Message::incoming(3, "thanks, let's talk"),
            Message::outgoing(2, "hello"),
        ]))
        .await;
        let check = guard.check(&owner).await;
        assert_eq!(check, HistoryCheck::Ongoing);
        assert!(!check.is_eligible());
        assert!(check.retractables().is_empty());
    }

    #[tokio::test]
    async fn test_outgoing_newest_collects_all_own_messages() {
        let (guard, owner, _) = guard_for(UserFixture::new().history(vec![
            Message::outgoing(5, "second pitch"),
            Message::incoming(4, "no"),
            Message::outgoing(3, "first pitch"),
        ]))
        .await;
        let check = guard.check(&owner).await;
        assert!(check.is_eligible());
        assert_eq!(check.retractables(), &[MessageRef(5), MessageRef(3)]);
    }

    #[tokio::test]
    async fn test_only_window_is_inspected() {
        let mut history: Vec<Message> = (0..HISTORY_WINDOW as i64)
            .map(|i| Message::outgoing(100 - i, "pitch"))
            .collect();
        history.push(Message::outgoing(1, "ancient"));
        let (guard, owner, _) = guard_for(UserFixture::new().history(history)).await;

        let check = guard.check(&owner).await;
        assert_eq!(check.retractables().len(), HISTORY_WINDOW);
        assert!(!check.retractables().contains(&MessageRef(1)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unavailable_but_eligible() {
        let (guard, owner, _) = guard_for(
            UserFixture::new()
                .history(vec![Message::incoming(1, "hi")])
                .fault(UserFault::HistoryFails),
        )
        .await;
        let check = guard.check(&owner).await;
        assert_eq!(check, HistoryCheck::Unavailable);
        assert!(check.is_eligible());
        assert!(check.retractables().is_empty());
    }

    #[tokio::test]
    async fn test_retract_continues_past_failures() {
        let (guard, owner, platform) = guard_for(
            UserFixture::new()
                .history(vec![
                    Message::outgoing(3, "c"),
                    Message::outgoing(2, "b"),
                    Message::outgoing(1, "a"),
                ])
                .fault(UserFault::DeleteFails { message: 2 }),
        )
        .await;

        let report = guard
            .retract(&owner, &[MessageRef(3), MessageRef(2), MessageRef(1)])
            .await;
        assert_eq!(report, RetractionReport { retracted: 2, failed: 1 });
        assert_eq!(platform.calls().deletions.len(), 3);
        assert_eq!(platform.conversation("owner").len(), 1);
    }
}
