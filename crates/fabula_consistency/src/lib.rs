//! Narrative consistency checks for the Fabula pipeline.
//!
//! The [`NarrativeConsistencyValidator`] judges generated text against what
//! the world already knows: characters who are not alive must not act or
//! speak, and the canonical fact set must not contradict itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod issue;
mod patterns;
mod validator;

pub use checker::VitalStatusContradictionChecker;
pub use issue::{CoherenceIssue, CoherenceValidationResult, IssueType};
pub use patterns::ActionPatterns;
pub use validator::NarrativeConsistencyValidator;
