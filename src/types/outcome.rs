//! Dispatch outcomes, result statuses and the per-run budget.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::contact::Language;

/// Terminal outcome of dispatching to one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DispatchOutcome {
    /// Message delivered to the platform.
    Sent,
    /// An unanswered incoming message exists; not overwritten.
    Skipped,
    /// Identity was contacted within the cooldown window.
    Cooldown,
    /// Identity looks like an automated account.
    BotSkipped,
    /// Community language does not match the configured target.
    LangSkip(Language),
    /// Send exceeded its deadline.
    Timeout,
    /// Send failed for any other reason.
    Error,
}

impl DispatchOutcome {
    /// Stable status label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Skipped => "skipped",
            Self::Cooldown => "cooldown",
            Self::BotSkipped => "bot_skipped",
            Self::LangSkip(Language::Ru) => "lang_skip_RU",
            Self::LangSkip(Language::En) => "lang_skip_EN",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }

    /// Whether this outcome counts against the run's error counter.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Timeout | Self::Error)
    }

    fn from_label(s: &str) -> Option<Self> {
        Some(match s {
            "sent" => Self::Sent,
            "skipped" => Self::Skipped,
            "cooldown" => Self::Cooldown,
            "bot_skipped" => Self::BotSkipped,
            "lang_skip_RU" => Self::LangSkip(Language::Ru),
            "lang_skip_EN" => Self::LangSkip(Language::En),
            "timeout" => Self::Timeout,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status recorded for a processed community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResultStatus {
    /// An identity was found and dispatched.
    Dispatched(DispatchOutcome),
    /// No identity could be extracted.
    NoOwner,
    /// Dry run: identity found, nothing sent.
    DryRun,
}

impl ResultStatus {
    /// Stable status label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched(outcome) => outcome.as_str(),
            Self::NoOwner => "no_owner",
            Self::DryRun => "test",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DispatchOutcome> for ResultStatus {
    fn from(outcome: DispatchOutcome) -> Self {
        Self::Dispatched(outcome)
    }
}

impl TryFrom<String> for ResultStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "no_owner" => Ok(Self::NoOwner),
            "test" => Ok(Self::DryRun),
            other => DispatchOutcome::from_label(other)
                .map(Self::Dispatched)
                .ok_or_else(|| format!("unknown result status: {other}")),
        }
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Send counters for one run.
///
/// Only the dispatcher mutates the counters; `sent` never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunBudget {
    max_sent: u32,
    sent: u32,
    errors: u32,
}

impl RunBudget {
    /// Create a budget allowing `max_sent` successful sends.
    pub fn new(max_sent: u32) -> Self {
        Self {
            max_sent,
            sent: 0,
            errors: 0,
        }
    }

    /// Successful sends so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Failed sends so far.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Configured maximum.
    pub fn max_sent(&self) -> u32 {
        self.max_sent
    }

    /// Whether the send budget is spent.
    pub fn exhausted(&self) -> bool {
        self.sent >= self.max_sent
    }

    pub(crate) fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub(crate) fn record_error(&mut self) {
        self.errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_roundtrip() {
        let statuses = [
            ResultStatus::Dispatched(DispatchOutcome::Sent),
            ResultStatus::Dispatched(DispatchOutcome::LangSkip(Language::Ru)),
            ResultStatus::Dispatched(DispatchOutcome::LangSkip(Language::En)),
            ResultStatus::Dispatched(DispatchOutcome::BotSkipped),
            ResultStatus::Dispatched(DispatchOutcome::Timeout),
            ResultStatus::NoOwner,
            ResultStatus::DryRun,
        ];
        for status in statuses {
            let back = ResultStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(back, status);
        }
        assert!(ResultStatus::try_from("bogus".to_string()).is_err());
    }

    #[test]
    fn test_failure_outcomes() {
        assert!(DispatchOutcome::Timeout.is_failure());
        assert!(DispatchOutcome::Error.is_failure());
        assert!(!DispatchOutcome::Cooldown.is_failure());
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut budget = RunBudget::new(1);
        assert!(!budget.exhausted());
        budget.record_error();
        assert!(!budget.exhausted());
        budget.record_sent();
        assert!(budget.exhausted());
        assert_eq!(budget.errors(), 1);
    }

    #[test]
    fn test_zero_budget_is_exhausted() {
        assert!(RunBudget::new(0).exhausted());
    }
}
