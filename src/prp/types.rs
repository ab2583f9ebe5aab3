use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Step action kinds accepted in PRP scenarios and caller flows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Navigate,
    Click,
    Fill,
    Screenshot,
    Wait,
    Validate,
    Hover,
    Select,
    Press,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Navigate => "navigate",
            StepAction::Click => "click",
            StepAction::Fill => "fill",
            StepAction::Screenshot => "screenshot",
            StepAction::Wait => "wait",
            StepAction::Validate => "validate",
            StepAction::Hover => "hover",
            StepAction::Select => "select",
            StepAction::Press => "press",
        }
    }
}

/// Errors converting a step record into an executable step
#[derive(Debug, Error, PartialEq)]
pub enum StepError {
    #[error("step has no action")]
    MissingAction,

    #[error("'{action}' step requires a non-empty '{field}'")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
}

/// Step as written on the wire, before synonym normalization
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    action: Option<StepAction>,
    selector: Option<String>,
    element: Option<String>,
    value: Option<Value>,
    data: Option<Value>,
    url: Option<String>,
    name: Option<String>,
    duration: Option<u64>,
    description: Option<String>,
    expected: Option<Value>,
    validation: Option<Value>,
    source_validation: Option<Value>,
}

/// A single flow step.
///
/// Every field is optional so a caller step can override only the fields it
/// names. `selector`/`element` and `value`/`data` are folded into `selector`
/// and `value` when the step is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawStep")]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<StepAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
    /// Validation carried over from the requirement step during a merge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_validation: Option<Value>,
}

impl From<RawStep> for Step {
    fn from(raw: RawStep) -> Self {
        Self {
            action: raw.action,
            selector: first_non_empty(raw.selector, raw.element),
            value: first_present(raw.value, raw.data),
            url: first_non_empty(raw.url, None),
            name: raw.name,
            duration: raw.duration,
            description: raw.description,
            expected: raw.expected,
            validation: raw.validation,
            source_validation: raw.source_validation,
        }
    }
}

impl Step {
    pub fn new(action: StepAction) -> Self {
        Self {
            action: Some(action),
            ..Default::default()
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Convert into the executable variant for this step's action
    pub fn kind(&self) -> Result<StepKind, StepError> {
        let action = self.action.ok_or(StepError::MissingAction)?;
        let require_selector = || {
            self.selector.clone().ok_or(StepError::MissingField {
                action: action.as_str(),
                field: "selector",
            })
        };
        let require_value = || {
            self.value_text().ok_or(StepError::MissingField {
                action: action.as_str(),
                field: "value",
            })
        };

        Ok(match action {
            StepAction::Navigate => StepKind::Navigate {
                url: self
                    .url
                    .clone()
                    .or_else(|| self.value_text())
                    .ok_or(StepError::MissingField {
                        action: action.as_str(),
                        field: "url",
                    })?,
            },
            StepAction::Click => StepKind::Click {
                selector: require_selector()?,
            },
            StepAction::Fill => StepKind::Fill {
                selector: require_selector()?,
                value: require_value()?,
            },
            StepAction::Screenshot => StepKind::Screenshot {
                name: self.name.clone(),
            },
            StepAction::Wait => StepKind::Wait {
                duration_ms: self.duration,
                selector: self.selector.clone(),
            },
            StepAction::Validate => StepKind::Validate {
                selector: self.selector.clone(),
                expected: self
                    .expected
                    .clone()
                    .or_else(|| self.source_validation.clone())
                    .or_else(|| self.validation.clone()),
            },
            StepAction::Hover => StepKind::Hover {
                selector: require_selector()?,
            },
            StepAction::Select => StepKind::Select {
                selector: require_selector()?,
                value: require_value()?,
            },
            StepAction::Press => StepKind::Press {
                selector: self.selector.clone(),
                key: require_value()?,
            },
        })
    }

    fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Executable form of a step: each action carries only the fields it uses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum StepKind {
    Navigate {
        url: String,
    },
    Click {
        selector: String,
    },
    Fill {
        selector: String,
        value: String,
    },
    Screenshot {
        name: Option<String>,
    },
    Wait {
        duration_ms: Option<u64>,
        selector: Option<String>,
    },
    Validate {
        selector: Option<String>,
        expected: Option<Value>,
    },
    Hover {
        selector: String,
    },
    Select {
        selector: String,
        value: String,
    },
    Press {
        selector: Option<String>,
        key: String,
    },
}

/// A named, ordered sequence of steps for one user-facing flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// True when `key` equals this scenario's id or name
    pub fn matches_key(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
    }

    /// Display name: the name, falling back to the id
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

/// Expected outcome of an API test case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiExpectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// A concrete API test case handed to the HTTP collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    /// Overrides the endpoint under test for this case only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub expect: ApiExpectation,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApiSpec {
    endpoint: Option<String>,
    path: Option<String>,
    method: Option<String>,
    description: Option<String>,
    example_request: Option<Value>,
    expected_status: Option<u16>,
    response_schema: Option<Value>,
    tests: Option<Vec<ApiTestCase>>,
}

/// An API requirement. `endpoint` holds the first non-empty of the
/// `endpoint`/`path` wire fields; `path` keeps the raw wire value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawApiSpec")]
pub struct ApiSpec {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<ApiTestCase>>,
}

impl From<RawApiSpec> for ApiSpec {
    fn from(raw: RawApiSpec) -> Self {
        Self {
            endpoint: first_non_empty(raw.endpoint, raw.path.clone()).unwrap_or_default(),
            path: raw.path,
            method: raw.method,
            description: raw.description,
            example_request: raw.example_request,
            expected_status: raw.expected_status,
            response_schema: raw.response_schema,
            tests: raw.tests,
        }
    }
}

impl ApiSpec {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Some(method.into()),
            ..Default::default()
        }
    }

    /// True when `endpoint` names this spec through either wire field. A spec
    /// that declares no endpoint matches nothing.
    pub fn matches_endpoint(&self, endpoint: &str) -> bool {
        if self.endpoint.is_empty() {
            return false;
        }
        self.endpoint == endpoint || self.path.as_deref() == Some(endpoint)
    }

    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// Declared test cases, or one case synthesized from the spec's example
    /// request and expected status when none are declared.
    pub fn test_cases(&self, requested: &str) -> Vec<ApiTestCase> {
        if let Some(tests) = &self.tests {
            return tests.clone();
        }

        let method = self.method_or_default().to_uppercase();
        vec![ApiTestCase {
            name: Some(format!("Test {} {}", method, requested)),
            method,
            endpoint: None,
            data: self.example_request.clone(),
            expect: ApiExpectation {
                status: Some(self.expected_status.unwrap_or(200)),
                schema: self.response_schema.clone(),
                body: None,
            },
        }]
    }
}

/// A product feature grouping scenarios
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scenarios: Option<Vec<Scenario>>,
}

impl Feature {
    pub fn matches_key(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
    }
}

/// Named edge case attached to a user story
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeCase {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A user story with its acceptance criteria
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub edge_cases: Vec<EdgeCase>,
}

/// The PRP document. Every key is optional; an absent key means "no
/// requirements of that kind".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDocument {
    #[serde(default, deserialize_with = "opaque_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios: Vec<Scenario>,
    #[serde(default)]
    pub api_specifications: Vec<ApiSpec>,
    #[serde(default)]
    pub api_tests: Vec<ApiSpec>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub user_stories: Vec<UserStory>,
}

/// Metadata attached to an executed flow by the recorder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

/// A UI flow the execution collaborator ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedFlow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FlowMetadata>,
    #[serde(default)]
    pub steps: usize,
    #[serde(default = "default_passed")]
    pub passed: bool,
}

impl ExecutedFlow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            steps: 0,
            passed: true,
        }
    }

    pub fn with_story(mut self, story_id: impl Into<String>) -> Self {
        self.metadata = Some(FlowMetadata {
            story_id: Some(story_id.into()),
        });
        self
    }

    pub fn story_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.story_id.as_deref()
    }
}

/// An API call the HTTP collaborator made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedApiTest {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_passed")]
    pub passed: bool,
}

impl ExecutedApiTest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: None,
            name: None,
            passed: true,
        }
    }
}

fn default_passed() -> bool {
    true
}

/// Kind of requirement a coverage item refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Scenario,
    Api,
    Story,
}

/// One labeled entry in a coverage report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverageItem {
    pub kind: RequirementKind,
    pub label: String,
}

impl CoverageItem {
    pub fn new(kind: RequirementKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

/// Executed-vs-required coverage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverageReport {
    /// Integer percentage, 0..=100
    pub coverage: u8,
    pub covered: Vec<CoverageItem>,
    pub missing: Vec<CoverageItem>,
    pub total: usize,
}

impl CoverageReport {
    /// Vacuous full coverage: nothing required, nothing missing
    pub fn vacuous() -> Self {
        Self {
            coverage: 100,
            covered: vec![],
            missing: vec![],
            total: 0,
        }
    }

    pub fn covered_labels(&self) -> Vec<&str> {
        self.covered.iter().map(|i| i.label.as_str()).collect()
    }

    pub fn missing_labels(&self) -> Vec<&str> {
        self.missing.iter().map(|i| i.label.as_str()).collect()
    }
}

/// Per-story line of the compliance report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryCoverage {
    pub id: String,
    pub title: String,
    pub covered: bool,
    pub acceptance_criteria: Vec<String>,
}

/// Per-scenario line of the compliance report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioCoverage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub executed: bool,
}

/// Document written by the report exporter at the end of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub project: String,
    pub session_id: String,
    pub prp_version: Option<String>,
    pub has_prp: bool,
    pub timestamp: String,
    pub user_stories: Vec<StoryCoverage>,
    pub test_scenarios: Vec<ScenarioCoverage>,
    /// Percentage over the combined story and scenario count
    pub overall_coverage: u8,
    pub requirements: CoverageReport,
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.filter(|s| !s.is_empty()))
}

fn first_present(primary: Option<Value>, fallback: Option<Value>) -> Option<Value> {
    let present = |v: &Value| !(v.is_null() || v.as_str().is_some_and(str::is_empty));
    primary.filter(present).or_else(|| fallback.filter(present))
}

/// Accepts a string or any other JSON scalar as an opaque version label
fn opaque_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
