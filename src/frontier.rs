//! Breadth-first discovery and outreach.
//!
//! The frontier controller walks the similarity relation outward from the
//! seed communities, one node at a time, until either the queue or the send
//! budget runs out, or a stop is requested.
//!
//! ## Algorithm
//!
//! 1. Enqueue every seed at depth 0
//! 2. While the queue is non-empty, the budget is not spent and no stop was
//!    requested:
//!    - Pop the oldest entry; discard it if already visited
//!    - Resolve the community into a contact
//!    - Dispatch to the contact (unless dry-run)
//!    - Append exactly one result record
//!    - If depth <= [`MAX_EXPANSION_DEPTH`]: enqueue unprocessed similar
//!      communities at depth + 1, skipping ones already queued
//!    - Pause
//! 3. Return the run summary
//!
//! A stop request is only honoured between nodes. The node in progress,
//! including any send in flight, always completes and is recorded.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::dispatcher::Dispatcher;
use crate::expander::SimilarityExpander;
use crate::ledger::CooldownLedger;
use crate::platform::PlatformClient;
use crate::resolver::ContactResolver;
use crate::sink::ResultSink;
use crate::types::{CommunityId, FrontierEntry, ResultRecord, ResultStatus, RunBudget};

/// Deepest level whose nodes are still expanded. Nodes one level below are
/// processed but not expanded.
pub const MAX_EXPANSION_DEPTH: u32 = 1;

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Communities popped and processed.
    pub processed: usize,
    /// Successful sends.
    pub sent: u32,
    /// Failed or timed-out sends.
    pub errors: u32,
    /// Result records persisted.
    pub results_written: usize,
    /// Result records the sink rejected.
    pub sink_failures: usize,
    /// Whether the run stopped on request before the queue or budget ran out.
    pub interrupted: bool,
}

/// Drives discovery, resolution and dispatch for one run.
pub struct FrontierController<'a, P: PlatformClient, S: ResultSink> {
    config: &'a RunConfig,
    resolver: ContactResolver<P>,
    expander: SimilarityExpander<P>,
    dispatcher: Dispatcher<'a, P>,
    sink: S,
    run_id: Uuid,
    dry_run: bool,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<'a, P: PlatformClient, S: ResultSink> FrontierController<'a, P, S> {
    /// Create a controller for one run.
    pub fn new(platform: Arc<P>, config: &'a RunConfig, ledger: CooldownLedger, sink: S) -> Self {
        Self {
            config,
            resolver: ContactResolver::new(Arc::clone(&platform)),
            expander: SimilarityExpander::new(
                Arc::clone(&platform),
                config.pacing.throttle_backoff_cap(),
            ),
            dispatcher: Dispatcher::new(platform, config, ledger),
            sink,
            run_id: Uuid::new_v4(),
            dry_run: false,
            shutdown: None,
        }
    }

    /// Resolve and expand without sending anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop between nodes once `true` is sent on the channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn stop_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Identifier stamped on every record of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Consume the controller, returning the ledger and the sink.
    pub fn into_parts(self) -> (CooldownLedger, S) {
        (self.dispatcher.into_ledger(), self.sink)
    }

    /// Run the traversal to completion.
    pub async fn run(&mut self) -> RunSummary {
        let seeds = self.config.seeds();
        let mut budget = RunBudget::new(self.config.max_sent_per_run);
        let mut summary = RunSummary::default();

        // Everything ever enqueued; a superset of `visited`. Only `visited`
        // is excluded from expansion, so queued siblings still take a slot.
        let mut known: HashSet<CommunityId> = seeds.iter().cloned().collect();
        let mut visited: HashSet<CommunityId> = HashSet::new();
        let mut queue: VecDeque<FrontierEntry> =
            seeds.into_iter().map(|seed| FrontierEntry::new(seed, 0)).collect();

        tracing::info!(
            run_id = %self.run_id,
            seeds = queue.len(),
            max_sent = budget.max_sent(),
            dry_run = self.dry_run,
            "run started"
        );

        while !budget.exhausted() {
            if self.stop_requested() {
                tracing::warn!(run_id = %self.run_id, "stop requested, ending run between nodes");
                summary.interrupted = true;
                break;
            }
            let Some(entry) = queue.pop_front() else {
                break;
            };
            if !visited.insert(entry.community.clone()) {
                continue;
            }
            summary.processed += 1;

            let resolution = self.resolver.resolve(&entry.community).await;
            let status = match resolution.contact() {
                None => ResultStatus::NoOwner,
                Some(_) if self.dry_run => ResultStatus::DryRun,
                Some(contact) => self.dispatcher.dispatch(contact, &mut budget).await.into(),
            };

            let record = ResultRecord::new(
                self.run_id,
                &entry.community,
                entry.depth,
                &resolution,
                status,
            );
            tracing::info!(
                community = %entry.community,
                depth = entry.depth,
                identity = %record.identity,
                language = %record.language,
                status = %status,
                sent = budget.sent(),
                "community processed"
            );
            match self.sink.append(&record) {
                Ok(()) => summary.results_written += 1,
                Err(e) => {
                    tracing::warn!(community = %entry.community, error = %e, "failed to persist result");
                    summary.sink_failures += 1;
                }
            }

            if entry.depth <= MAX_EXPANSION_DEPTH && !budget.exhausted() {
                let children = self.expander.expand(&entry.community, &visited).await;
                tracing::debug!(community = %entry.community, discovered = children.len(), "expanded");
                for child in children {
                    if known.insert(child.clone()) {
                        queue.push_back(entry.child(child));
                    }
                }
            }

            tokio::time::sleep(self.config.pacing.node_pause()).await;
        }

        summary.sent = budget.sent();
        summary.errors = budget.errors();
        tracing::info!(
            run_id = %self.run_id,
            processed = summary.processed,
            sent = summary.sent,
            errors = summary.errors,
            remaining = queue.len(),
            interrupted = summary.interrupted,
            "run finished"
        );
        summary
    }
}
