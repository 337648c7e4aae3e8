//! Per-identity dispatch decisions.
//!
//! The dispatcher is a fixed sequence of gates. The first gate that rejects
//! an identity decides the outcome; only an identity that passes every gate
//! is messaged:
//!
//! 1. target-language filter
//! 2. automated-account filter
//! 3. cooldown ledger
//! 4. conversation guard (after resolving the identity entity)
//! 5. retraction of our stale messages (then a settle pause), then the send
//!
//! The ledger is written only after the platform confirms a send.

use std::sync::Arc;

use crate::config::RunConfig;
use crate::guard::ConversationGuard;
use crate::ledger::CooldownLedger;
use crate::platform::{PlatformClient, SendOptions};
use crate::types::{Contact, DispatchOutcome, RunBudget};

/// Suffix that marks an identity as an automated account.
const BOT_SUFFIX: &str = "bot";

/// Whether `identity` names an automated account.
pub fn is_bot_identity(identity: &str) -> bool {
    identity.to_lowercase().ends_with(BOT_SUFFIX)
}

/// Decides, per identity, whether to send or skip.
pub struct Dispatcher<'a, P: PlatformClient> {
    platform: Arc<P>,
    config: &'a RunConfig,
    ledger: CooldownLedger,
    guard: ConversationGuard<P>,
}

impl<'a, P: PlatformClient> Dispatcher<'a, P> {
    /// Create a dispatcher that owns the cooldown ledger for the run.
    pub fn new(platform: Arc<P>, config: &'a RunConfig, ledger: CooldownLedger) -> Self {
        Self {
            guard: ConversationGuard::new(Arc::clone(&platform)),
            platform,
            config,
            ledger,
        }
    }

    /// The cooldown ledger.
    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    /// Consume the dispatcher, returning the ledger.
    pub fn into_ledger(self) -> CooldownLedger {
        self.ledger
    }

    /// Run every gate for `contact` and send if all of them pass.
    ///
    /// `budget` is charged one send on success and one error on a failed or
    /// timed-out send. Callers check [`RunBudget::exhausted`] beforehand.
    pub async fn dispatch(&mut self, contact: &Contact, budget: &mut RunBudget) -> DispatchOutcome {
        let identity = contact.identity.as_str();

        if !self.config.target_language.accepts(contact.language) {
            return DispatchOutcome::LangSkip(contact.language);
        }

        if is_bot_identity(identity) {
            return DispatchOutcome::BotSkipped;
        }

        if self.ledger.in_cooldown(identity) {
            return DispatchOutcome::Cooldown;
        }

        let entity = match self.platform.resolve(identity).await {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!(identity, error = %e, "identity did not resolve");
                budget.record_error();
                return DispatchOutcome::Error;
            }
        };

        let history = self.guard.check(&entity).await;
        if !history.is_eligible() {
            return DispatchOutcome::Skipped;
        }

        let retractables = history.retractables();
        if !retractables.is_empty() {
            let report = self.guard.retract(&entity, retractables).await;
            tracing::debug!(
                identity,
                retracted = report.retracted,
                failed = report.failed,
                "retracted earlier messages"
            );
            tokio::time::sleep(self.config.pacing.settle_pause()).await;
        }

        let body = self.config.template_for(contact.language);
        let send = self.platform.send_message(
            &entity,
            body,
            SendOptions {
                link_preview: false,
            },
        );
        match tokio::time::timeout(self.config.pacing.send_timeout(), send).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(identity, error = %e, "send failed");
                budget.record_error();
                return DispatchOutcome::Error;
            }
            Err(_) => {
                tracing::warn!(
                    identity,
                    timeout_secs = self.config.pacing.send_timeout_secs,
                    "send timed out"
                );
                budget.record_error();
                return DispatchOutcome::Timeout;
            }
        }

        if let Err(e) = self.ledger.mark_sent(identity) {
            tracing::warn!(identity, error = %e, "failed to persist cooldown entry");
        }
        budget.record_sent();
        tokio::time::sleep(self.config.send_delay()).await;
        DispatchOutcome::Sent
    }
}
