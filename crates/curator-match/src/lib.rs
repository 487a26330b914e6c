//! Matching layer: term configuration, text signals, and the assignment policy.

mod error;
pub mod fuzzy;
pub mod overrides;
pub mod policy;
pub mod report;
pub mod runner;
pub mod signals;
pub mod similar;
pub mod terms;

pub use error::ConfigError;
pub use overrides::OverrideLog;
pub use policy::{PolicyNote, PolicyResult, policy_assign};
pub use report::{TermReport, unassigned_report};
pub use runner::{AssignOutcome, AssignStats, refresh_suggestions, run_auto_assign};
pub use signals::{MatchSignals, collect_signals};
pub use similar::{SimilarPair, find_similar_collections};
pub use terms::{CollectionRule, Terms};
