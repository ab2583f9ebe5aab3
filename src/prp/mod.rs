//! PRP (Product Requirements Prompt) reconciliation
//!
//! Reconciles a requirements document against executed tests:
//! - Scenario, API and feature lookups by name
//! - Positional merge of caller steps onto PRP steps
//! - Coverage over scenarios, API specs and user stories
//! - Compliance report export

pub mod coverage;
pub mod merge;
pub mod report;
pub mod store;
pub mod types;

pub use store::{ApiLookupStrategy, RequirementError, RequirementStore};
