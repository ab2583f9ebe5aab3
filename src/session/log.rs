use crate::prp::types::{ExecutedApiTest, ExecutedFlow};
use parking_lot::Mutex;

/// Append-only record of what a session executed.
///
/// Collaborators append from their own tasks; coverage reads snapshots.
#[derive(Default)]
pub struct ExecutionLog {
    flows: Mutex<Vec<ExecutedFlow>>,
    api_tests: Mutex<Vec<ExecutedApiTest>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_flow(&self, flow: ExecutedFlow) {
        self.flows.lock().push(flow);
    }

    pub fn record_api_test(&self, test: ExecutedApiTest) {
        self.api_tests.lock().push(test);
    }

    pub fn flows(&self) -> Vec<ExecutedFlow> {
        self.flows.lock().clone()
    }

    pub fn api_tests(&self) -> Vec<ExecutedApiTest> {
        self.api_tests.lock().clone()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.lock().len()
    }

    pub fn api_test_count(&self) -> usize {
        self.api_tests.lock().len()
    }

    /// Drop everything recorded so far; used when a session is restarted
    pub fn clear(&self) {
        self.flows.lock().clear();
        self.api_tests.lock().clear();
    }
}
