//! Core types for the outreach kernel.

pub mod community;
pub mod contact;
pub mod outcome;
pub mod record;

pub use community::{CommunityId, CommunityIdError, FrontierEntry};
pub use contact::{Classification, Contact, Language, Resolution};
pub use outcome::{DispatchOutcome, ResultStatus, RunBudget};
pub use record::{ResultRecord, NOT_FOUND};
