//! Similarity expansion: community → related communities.

use std::sync::Arc;
use std::time::Duration;

use crate::platform::PlatformClient;
use crate::types::CommunityId;

/// Maximum number of related communities returned per expansion.
pub const MAX_SIMILAR_PER_NODE: usize = 10;

/// Answers whether a community was already processed in the run.
pub trait KnownCommunities {
    /// Whether `community` was already processed.
    fn is_known(&self, community: &CommunityId) -> bool;
}

impl KnownCommunities for std::collections::HashSet<CommunityId> {
    fn is_known(&self, community: &CommunityId) -> bool {
        self.contains(community)
    }
}

/// Queries the platform for related communities.
pub struct SimilarityExpander<P: PlatformClient> {
    platform: Arc<P>,
    backoff_cap: Duration,
}

impl<P: PlatformClient> SimilarityExpander<P> {
    /// Create an expander; throttling backoff never sleeps longer than `backoff_cap`.
    pub fn new(platform: Arc<P>, backoff_cap: Duration) -> Self {
        Self {
            platform,
            backoff_cap,
        }
    }

    /// Up to [`MAX_SIMILAR_PER_NODE`] related communities not yet processed.
    ///
    /// Communities that are only queued still occupy a slot; the caller
    /// drops them when enqueueing.
    ///
    /// On throttling, sleeps for the suggested wait plus one second (capped)
    /// and returns nothing; the next node effectively retries. Any other
    /// failure also returns nothing.
    pub async fn expand<K: KnownCommunities>(
        &self,
        community: &CommunityId,
        known: &K,
    ) -> Vec<CommunityId> {
        let result = match self.platform.resolve(community.as_str()).await {
            Ok(entity) => self.platform.similar_communities(&entity).await,
            Err(e) => Err(e),
        };

        let similar = match result {
            Ok(similar) => similar,
            Err(e) => {
                match e.throttle_wait() {
                    Some(wait) => {
                        let pause = wait.saturating_add(Duration::from_secs(1)).min(self.backoff_cap);
                        tracing::warn!(
                            community = %community,
                            requested_secs = wait.as_secs(),
                            pause_secs = pause.as_secs_f32(),
                            "throttled during expansion, backing off"
                        );
                        tokio::time::sleep(pause).await;
                    }
                    None => {
                        tracing::debug!(community = %community, error = %e, "expansion failed");
                    }
                }
                return Vec::new();
            }
        };

        let mut children: Vec<CommunityId> = Vec::new();
        for entity in similar {
            let Some(handle) = entity.handle else {
                continue;
            };
            let Ok(child) = CommunityId::parse(&handle) else {
                continue;
            };
            if known.is_known(&child) || children.contains(&child) {
                continue;
            }
            children.push(child);
            if children.len() == MAX_SIMILAR_PER_NODE {
                break;
            }
        }
        children
    }
}
