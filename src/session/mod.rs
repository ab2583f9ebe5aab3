//! Reconciliation session
//!
//! One session drives one test run: it loads the PRP once, resolves flows
//! and API tests against it, records what the collaborators executed, and
//! exports the compliance report at the end.

pub mod log;
pub mod runner;

use crate::config::EngineConfig;
use crate::prp::coverage::{compliance_report, store_coverage, story_coverage};
use crate::prp::merge::merge_steps;
use crate::prp::report::{export_report, write_json, ExportError};
use crate::prp::types::{
    ApiTestCase, ComplianceReport, CoverageReport, ExecutedApiTest, ExecutedFlow, FlowMetadata,
    Scenario, Step, StepError, StepKind,
};
use crate::prp::{RequirementError, RequirementStore};
use self::log::ExecutionLog;
use self::runner::{ApiRunner, FlowRunner};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Requirements(#[from] RequirementError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Flow '{flow}' step {index}: {source}")]
    InvalidStep {
        flow: String,
        index: usize,
        #[source]
        source: StepError,
    },
}

/// Where the steps of a flow plan came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// PRP scenario steps, used verbatim
    Requirement,
    /// Caller steps merged onto PRP scenario steps
    Merged,
    /// Caller steps only; no matching scenario
    Caller,
}

/// Resolved steps for one flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowPlan {
    pub name: String,
    pub steps: Vec<Step>,
    pub source: PlanSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

impl FlowPlan {
    /// Executable steps, failing on the first step that cannot run
    pub fn step_kinds(&self) -> Result<Vec<StepKind>, SessionError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                step.kind().map_err(|source| SessionError::InvalidStep {
                    flow: self.name.clone(),
                    index,
                    source,
                })
            })
            .collect()
    }
}

/// Resolved test cases for one endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlan {
    pub endpoint: String,
    pub tests: Vec<ApiTestCase>,
    pub from_requirements: bool,
}

/// End-of-session summary written next to the compliance report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub project: String,
    pub framework: String,
    pub timestamp: String,
    pub flows: usize,
    pub api_tests: usize,
    pub prp_compliance: ComplianceReport,
    pub status: String,
}

pub struct Session {
    id: String,
    config: EngineConfig,
    store: RequirementStore,
    log: ExecutionLog,
}

impl Session {
    /// Load the PRP named by `config` and open a session over it
    pub async fn start(config: EngineConfig) -> Result<Self, SessionError> {
        let store = RequirementStore::load(&config.prp_path)
            .await?
            .with_strategy(config.api_lookup);
        let session = Self::with_store(config, store);
        info!(
            "Session {} started for {} (PRP loaded: {})",
            session.id,
            session.config.project_name,
            session.store.has_document()
        );
        Ok(session)
    }

    /// Open a session over an already-built store
    pub fn with_store(config: EngineConfig, store: RequirementStore) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            store,
            log: ExecutionLog::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &RequirementStore {
        &self.store
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Re-read the PRP and forget everything executed so far
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        self.store = RequirementStore::load(&self.config.prp_path)
            .await?
            .with_strategy(self.config.api_lookup);
        self.log.clear();
        self.id = Uuid::new_v4().to_string();
        info!("Session reloaded as {}", self.id);
        Ok(())
    }

    /// Resolve the steps for flow `name`
    pub fn plan_flow(&self, name: &str, caller_steps: Option<Vec<Step>>) -> FlowPlan {
        let Some(scenario) = self.store.find_scenario(name) else {
            return FlowPlan {
                name: name.to_string(),
                steps: caller_steps.unwrap_or_default(),
                source: PlanSource::Caller,
                story_id: None,
            };
        };

        let source = if caller_steps.is_some() {
            info!("Merging caller steps into PRP scenario: {}", name);
            PlanSource::Merged
        } else {
            info!("Using PRP test scenario: {}", name);
            PlanSource::Requirement
        };

        FlowPlan {
            name: name.to_string(),
            steps: merge_steps(caller_steps.as_deref(), &scenario.steps),
            source,
            story_id: None,
        }
    }

    /// Resolve the test cases for `endpoint`; caller tests take precedence
    pub fn plan_api(&self, endpoint: &str, caller_tests: Option<Vec<ApiTestCase>>) -> ApiPlan {
        if let Some(tests) = caller_tests {
            return ApiPlan {
                endpoint: endpoint.to_string(),
                tests,
                from_requirements: false,
            };
        }

        let tests = self.store.find_api_tests(endpoint);
        if !tests.is_empty() {
            info!("Using PRP API tests for: {}", endpoint);
        }
        ApiPlan {
            endpoint: endpoint.to_string(),
            from_requirements: !tests.is_empty(),
            tests,
        }
    }

    /// Plans for every scenario of a PRP feature
    pub fn plan_feature(&self, feature: &str) -> Option<Vec<FlowPlan>> {
        let scenarios = self.store.find_feature_scenarios(feature)?;
        info!("Auto-testing {} PRP scenarios for {}", scenarios.len(), feature);
        Some(scenarios.iter().map(scenario_plan).collect())
    }

    /// Plans for the edge cases of a user story, tagged with the story id
    pub fn plan_story_edge_cases(&self, story_id: &str) -> Vec<FlowPlan> {
        self.store
            .story_edge_cases(story_id)
            .iter()
            .map(|edge| FlowPlan {
                name: edge.name.clone(),
                steps: edge.steps.clone(),
                source: PlanSource::Requirement,
                story_id: Some(story_id.to_string()),
            })
            .collect()
    }

    /// Plan flow `name`, run it through `runner` and record the result
    pub async fn run_flow(
        &self,
        name: &str,
        caller_steps: Option<Vec<Step>>,
        runner: &dyn FlowRunner,
    ) -> Result<ExecutedFlow, SessionError> {
        let plan = self.plan_flow(name, caller_steps);
        self.execute_plan(&plan, runner).await
    }

    /// Run a resolved plan and record it
    pub async fn execute_plan(
        &self,
        plan: &FlowPlan,
        runner: &dyn FlowRunner,
    ) -> Result<ExecutedFlow, SessionError> {
        let steps = plan.step_kinds()?;
        let passed = match runner.run_flow(&plan.name, &steps).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Flow '{}' failed: {:#}", plan.name, e);
                false
            }
        };

        let flow = ExecutedFlow {
            name: plan.name.clone(),
            metadata: plan.story_id.clone().map(|story_id| FlowMetadata {
                story_id: Some(story_id),
            }),
            steps: steps.len(),
            passed,
        };
        self.record_flow(flow.clone());
        Ok(flow)
    }

    /// Run every test case for `endpoint` and record one entry per case
    pub async fn run_api(
        &self,
        endpoint: &str,
        caller_tests: Option<Vec<ApiTestCase>>,
        runner: &dyn ApiRunner,
    ) -> Vec<ExecutedApiTest> {
        let plan = self.plan_api(endpoint, caller_tests);
        let mut executed = Vec::with_capacity(plan.tests.len());

        for test in &plan.tests {
            let target = test.endpoint.as_deref().unwrap_or(endpoint);
            let passed = match runner.run_api_test(target, test).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("API test {} {} failed: {:#}", test.method, target, e);
                    false
                }
            };

            let record = ExecutedApiTest {
                endpoint: target.to_string(),
                method: Some(test.method.clone()),
                name: test.name.clone(),
                passed,
            };
            self.record_api_test(record.clone());
            executed.push(record);
        }

        executed
    }

    pub fn record_flow(&self, flow: ExecutedFlow) {
        debug!("Recorded flow {}", flow.name);
        self.log.record_flow(flow);
    }

    pub fn record_api_test(&self, test: ExecutedApiTest) {
        debug!("Recorded API test {}", test.endpoint);
        self.log.record_api_test(test);
    }

    /// Scenario and API coverage of everything recorded so far
    pub fn validate(&self) -> CoverageReport {
        let report = store_coverage(&self.store, &self.log.flows(), &self.log.api_tests());
        if !self.store.has_document() {
            warn!("No PRP found for validation");
            return report;
        }

        info!("Coverage: {}%", report.coverage);
        for item in &report.missing {
            warn!("Missing: {}", item.label);
        }
        report
    }

    /// User story coverage of everything recorded so far
    pub fn story_coverage(&self) -> CoverageReport {
        story_coverage(self.store.user_stories(), &self.log.flows())
    }

    pub fn compliance(&self) -> ComplianceReport {
        compliance_report(
            &self.store,
            &self.config.project_name,
            &self.id,
            &self.log.flows(),
            &self.log.api_tests(),
        )
    }

    /// Export the compliance report and the session summary
    pub async fn finish(&self) -> Result<SessionSummary, SessionError> {
        let compliance = self.compliance();
        export_report(&compliance, &self.config.compliance_path()).await?;

        let summary = SessionSummary {
            project: self.config.project_name.clone(),
            framework: env!("CARGO_PKG_NAME").to_string(),
            timestamp: compliance.timestamp.clone(),
            flows: self.log.flow_count(),
            api_tests: self.log.api_test_count(),
            prp_compliance: compliance,
            status: "complete".to_string(),
        };
        write_json(&summary, &self.config.summary_path()).await?;
        info!("Session {} complete", self.id);
        Ok(summary)
    }
}

fn scenario_plan(scenario: &Scenario) -> FlowPlan {
    FlowPlan {
        name: scenario.label().to_string(),
        steps: scenario.steps.clone(),
        source: PlanSource::Requirement,
        story_id: None,
    }
}
