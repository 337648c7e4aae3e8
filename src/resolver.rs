//! Contact resolution: community → (owner identity, language).
//!
//! Resolution never fails. Platform errors degrade to an absent identity
//! and the EN default, so the frontier keeps moving.

use std::collections::HashSet;
use std::sync::Arc;

use regex_lite::Regex;

use crate::language;
use crate::platform::PlatformClient;
use crate::types::{CommunityId, Contact, Language, Resolution};

/// Number of recent posts sampled for language detection.
pub const POST_SAMPLE_SIZE: usize = 5;

/// Extract `@handle` mentions from free text.
///
/// Mentions are lowercased without the `@`, de-duplicated keeping the first
/// occurrence, and `own` (the community's own handle) is dropped.
///
/// Handles are ASCII only (`[A-Za-z0-9_]`), matching what the platform
/// accepts; a non-ASCII letter ends the mention.
pub fn extract_mentions(text: &str, own: &CommunityId) -> Vec<String> {
    let pattern = mention_pattern();
    let mut seen = HashSet::new();
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .filter(|handle| !own.matches(handle))
        .filter(|handle| seen.insert(handle.clone()))
        .collect()
}

fn mention_pattern() -> &'static Regex {
    use std::sync::OnceLock;
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("mention pattern is valid"))
}

/// Turns communities into contacts via platform queries.
pub struct ContactResolver<P: PlatformClient> {
    platform: Arc<P>,
}

impl<P: PlatformClient> ContactResolver<P> {
    /// Create a resolver over a platform client.
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }

    /// Resolve a community into an identity and language.
    ///
    /// Language is taken from recent posts first, then from the profile
    /// description, then defaults to EN. The first mention in the
    /// description that is not the community itself becomes the identity.
    pub async fn resolve(&self, community: &CommunityId) -> Resolution {
        let entity = match self.platform.resolve(community.as_str()).await {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!(community = %community, error = %e, "community did not resolve");
                return Resolution::NotFound {
                    language: Language::En,
                };
            }
        };

        let description = match self.platform.profile_description(&entity).await {
            Ok(about) => about,
            Err(e) => {
                tracing::debug!(community = %community, error = %e, "profile fetch failed");
                String::new()
            }
        };

        let posts = match self.platform.recent_messages(&entity, POST_SAMPLE_SIZE).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::debug!(community = %community, error = %e, "post fetch failed");
                Vec::new()
            }
        };

        let language = language::classify(posts.iter().filter_map(|m| m.text.as_deref()))
            .or_else(|| language::classify([description.as_str()]))
            .language()
            .unwrap_or(Language::En);

        match extract_mentions(&description, community).into_iter().next() {
            Some(identity) => Resolution::Found(Contact::new(identity, language)),
            None => Resolution::NotFound { language },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::{CommunityFault, CommunityFixture};
    use crate::platform::InMemoryPlatform;

    fn id(s: &str) -> CommunityId {
        CommunityId::parse(s).unwrap()
    }

    #[test]
    fn test_extract_mentions_order_and_dedup() {
        let own = id("alpha");
        let text = "Ads: @Bob, @alice and @BOB. Channel: @Alpha";
        assert_eq!(extract_mentions(text, &own), vec!["bob", "alice"]);
    }

    #[test]
    fn test_extract_mentions_stops_at_non_word() {
        let own = id("alpha");
        assert_eq!(extract_mentions("mail@x.com @a-b", &own), vec!["x", "a"]);
        assert!(extract_mentions("no mentions here @", &own).is_empty());
    }

    #[test]
    fn test_extract_mentions_ascii_handles_only() {
        let own = id("alpha");
        assert_eq!(extract_mentions("Реклама: @ivan_ads, @иван", &own), vec!["ivan_ads"]);
        assert_eq!(extract_mentions("@adsмен", &own), vec!["ads"]);
    }

    #[tokio::test]
    async fn test_found_with_post_language() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("Reklama: @Owner1 @alpha")
                .posts(["Новости рынка", "Ежедневный обзор"]),
        ));
        let resolver = ContactResolver::new(platform);

        let resolution = resolver.resolve(&id("alpha")).await;
        assert_eq!(resolution, Resolution::Found(Contact::new("owner1", Language::Ru)));
    }

    #[tokio::test]
    async fn test_description_language_when_posts_ambiguous() {
        // Posts are 20% Cyrillic, description is Cyrillic.
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("Связь с админом @boss").posts(["абaaaaaaaa"]),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution.language(), Language::Ru);
    }

    #[tokio::test]
    async fn test_defaults_to_en_when_everything_unknown() {
        // No posts, and the description has no alphabetic characters.
        let platform = Arc::new(
            InMemoryPlatform::new().with_community("alpha", CommunityFixture::new("☎ @_42")),
        );
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution, Resolution::Found(Contact::new("_42", Language::En)));
    }

    #[tokio::test]
    async fn test_ambiguous_posts_and_description_default_to_en() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("абaaaaaaaa @boss").posts(["абaaaaaaaa"]),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution.language(), Language::En);
    }

    #[tokio::test]
    async fn test_self_reference_only_is_not_found() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("Subscribe to @ALPHA").posts(["daily news"]),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("Alpha")).await;
        assert_eq!(resolution, Resolution::NotFound { language: Language::En });
    }

    #[tokio::test]
    async fn test_unresolvable_community_degrades() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("@owner")
                .posts(["Привет"])
                .fault(CommunityFault::Unresolvable),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution, Resolution::NotFound { language: Language::En });
    }

    #[tokio::test]
    async fn test_profile_failure_keeps_post_language() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("@owner")
                .posts(["Привет всем"])
                .fault(CommunityFault::ProfileFails),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution, Resolution::NotFound { language: Language::Ru });
    }

    #[tokio::test]
    async fn test_post_failure_falls_back_to_description() {
        let platform = Arc::new(InMemoryPlatform::new().with_community(
            "alpha",
            CommunityFixture::new("Реклама @owner")
                .posts(["english only"])
                .fault(CommunityFault::PostsFail),
        ));
        let resolution = ContactResolver::new(platform).resolve(&id("alpha")).await;
        assert_eq!(resolution, Resolution::Found(Contact::new("owner", Language::Ru)));
    }
}
