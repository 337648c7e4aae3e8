//! # outreach-kernel
//!
//! Breadth-first community discovery with cooldown-aware owner outreach.
//!
//! The kernel answers one question per community:
//!
//! > Who runs this community, and may we message them right now?
//!
//! ## Core Contract
//!
//! 1. Walk the platform's similarity relation outward from seed communities,
//!    at most two hops, visiting each community once per run
//! 2. Turn each community into an owner identity and a language
//! 3. Message each eligible identity once, respecting a cross-run cooldown,
//!    ongoing conversations and a per-run send budget
//! 4. Record exactly one result per processed community
//!
//! ## Architecture
//!
//! ```text
//! Seeds → FrontierController ─┬→ ContactResolver ──→ language::classify
//!                             ├→ Dispatcher ──┬→ CooldownLedger
//!                             │               └→ ConversationGuard
//!                             ├→ SimilarityExpander
//!                             └→ ResultSink (JSONL or memory)
//!                    ↓
//!              PlatformClient (remote or InMemoryPlatform)
//! ```
//!
//! ## Pacing
//!
//! The pipeline is strictly sequential: one community is fully processed
//! before the next. The only waits are platform I/O, a fixed pause per
//! community, a settle pause after retractions, the delay after each send,
//! and throttling backoff.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod config;
pub mod dispatcher;
pub mod expander;
pub mod frontier;
pub mod guard;
pub mod language;
pub mod ledger;
pub mod platform;
pub mod resolver;
pub mod sink;
pub mod types;

// Re-exports
pub use types::{
    Classification, CommunityId, CommunityIdError, Contact, DispatchOutcome, FrontierEntry,
    Language, Resolution, ResultRecord, ResultStatus, RunBudget, NOT_FOUND,
};
pub use config::{ConfigError, Pacing, RunConfig, TargetLanguage};
pub use platform::{
    EntityRef, InMemoryPlatform, Message, MessageRef, PlatformClient, PlatformError, SendOptions,
};
pub use platform::memory::PlatformFixture;
pub use language::classify;
pub use resolver::{extract_mentions, ContactResolver};
pub use expander::{KnownCommunities, SimilarityExpander};
pub use ledger::{CooldownLedger, LedgerError};
pub use guard::{ConversationGuard, HistoryCheck, RetractionReport};
pub use dispatcher::Dispatcher;
pub use frontier::{FrontierController, RunSummary};
pub use sink::{read_results, JsonlResultSink, MemorySink, ResultSink, SinkError};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};

/// Schema version of persisted result records.
/// Increment on breaking changes to [`ResultRecord`].
pub const RESULT_SCHEMA_VERSION: &str = "1.0.0";
