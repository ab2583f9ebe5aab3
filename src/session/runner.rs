//! Interfaces to the execution collaborators.
//!
//! Browser driving and HTTP calls live outside this crate. A session hands
//! them fully resolved steps and test cases and records what they report.

use crate::prp::types::{ApiTestCase, StepKind};
use async_trait::async_trait;

/// Runs one UI flow (browser, screenshots, video)
#[async_trait]
pub trait FlowRunner: Send + Sync {
    /// Execute `steps` in order. An error marks the flow as failed.
    async fn run_flow(&self, name: &str, steps: &[StepKind]) -> anyhow::Result<()>;
}

/// Runs API test cases against a live endpoint
#[async_trait]
pub trait ApiRunner: Send + Sync {
    /// Execute one case against `endpoint`. An error marks the case as failed.
    async fn run_api_test(&self, endpoint: &str, test: &ApiTestCase) -> anyhow::Result<()>;
}
