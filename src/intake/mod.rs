//! Intake conversation. Gathers a user's concerns and preferences and
//! ranks psychologists against them.
//!
//! The session walks the user through category → gender → age → method
//! questions, classifies free-text descriptions by keyword, and runs the
//! recommendation engine over the candidate table at the end.

pub mod catalog;
pub mod classifier;
pub mod messages;
pub mod model;
pub mod prompts;
pub mod recommend;
pub mod selection;
pub mod session;
pub mod state;
pub mod tier;

pub use catalog::{Catalog, Category};
pub use classifier::{Classification, KeywordClassifier};
pub use messages::{Chip, ChipOption, Message, MessageContent, MessageLog, Role};
pub use model::{AgeRange, Candidate, Criteria, Gender, GenderPreference, RankedCandidate, Recommendation};
pub use recommend::{CandidateSource, RecommendationLimits, StaticCandidates, recommend};
pub use selection::SelectionState;
pub use session::{EventOutcome, IntakeEvent, IntakeSession, reduce};
pub use state::ConversationStep;
pub use tier::{FixedTier, RandomTier, SubscriptionTier, TierPolicy};
