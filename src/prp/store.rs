//! PRP loading and requirement lookups

use super::types::{ApiSpec, ApiTestCase, EdgeCase, Feature, RequirementDocument, Scenario, UserStory};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading a PRP document
#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("Failed to read PRP {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed PRP {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// How `find_api_tests` resolves an endpoint against the PRP
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiLookupStrategy {
    /// Exact `endpoint`/`path` match over `apiSpecifications`
    #[default]
    ExactMatch,
    /// Every `apiTests` entry whose endpoint is contained in the requested one
    Containment,
}

impl std::str::FromStr for ApiLookupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" | "exact_match" => Ok(ApiLookupStrategy::ExactMatch),
            "containment" | "contains" => Ok(ApiLookupStrategy::Containment),
            other => Err(format!("unknown API lookup strategy: {}", other)),
        }
    }
}

/// Immutable index over one loaded PRP, or over nothing when no PRP exists
#[derive(Debug, Clone, Default)]
pub struct RequirementStore {
    document: Option<RequirementDocument>,
    strategy: ApiLookupStrategy,
}

impl RequirementStore {
    /// Store with no document: every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_document(document: RequirementDocument) -> Self {
        Self {
            document: Some(document),
            strategy: ApiLookupStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ApiLookupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Load a PRP from disk.
    ///
    /// A missing file yields an empty store. A file that exists but cannot
    /// be parsed is an error, so callers can tell "no requirements" apart
    /// from "corrupt requirements".
    pub async fn load(path: &Path) -> Result<Self, RequirementError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No PRP at {}, running without requirements", path.display());
                return Ok(Self::empty());
            }
            Err(source) => {
                return Err(RequirementError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let document = parse_document(path, &content)?;
        info!(
            "PRP loaded from {}: {} scenarios, {} API specs, {} stories",
            path.display(),
            document.test_scenarios.len(),
            document.api_specifications.len() + document.api_tests.len(),
            document.user_stories.len()
        );
        Ok(Self::from_document(document))
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&RequirementDocument> {
        self.document.as_ref()
    }

    pub fn api_lookup_strategy(&self) -> ApiLookupStrategy {
        self.strategy
    }

    pub fn version(&self) -> Option<&str> {
        self.document.as_ref()?.version.as_deref()
    }

    pub fn scenarios(&self) -> &[Scenario] {
        self.document
            .as_ref()
            .map(|d| d.test_scenarios.as_slice())
            .unwrap_or_default()
    }

    pub fn api_specifications(&self) -> &[ApiSpec] {
        self.document
            .as_ref()
            .map(|d| d.api_specifications.as_slice())
            .unwrap_or_default()
    }

    pub fn api_tests(&self) -> &[ApiSpec] {
        self.document
            .as_ref()
            .map(|d| d.api_tests.as_slice())
            .unwrap_or_default()
    }

    pub fn features(&self) -> &[Feature] {
        self.document
            .as_ref()
            .map(|d| d.features.as_slice())
            .unwrap_or_default()
    }

    pub fn user_stories(&self) -> &[UserStory] {
        self.document
            .as_ref()
            .map(|d| d.user_stories.as_slice())
            .unwrap_or_default()
    }

    /// API requirements under the active lookup strategy: `apiSpecifications`
    /// for exact matching, `apiTests` for containment
    pub fn required_api_specs(&self) -> &[ApiSpec] {
        match self.strategy {
            ApiLookupStrategy::ExactMatch => self.api_specifications(),
            ApiLookupStrategy::Containment => self.api_tests(),
        }
    }

    /// First scenario in document order whose id or name equals `key`
    pub fn find_scenario(&self, key: &str) -> Option<&Scenario> {
        self.scenarios().iter().find(|s| s.matches_key(key))
    }

    /// Test cases for `endpoint` under the active lookup strategy. Empty when
    /// nothing matches.
    pub fn find_api_tests(&self, endpoint: &str) -> Vec<ApiTestCase> {
        let tests = match self.strategy {
            ApiLookupStrategy::ExactMatch => self
                .api_specifications()
                .iter()
                .find(|spec| spec.matches_endpoint(endpoint))
                .map(|spec| spec.test_cases(endpoint))
                .unwrap_or_default(),
            ApiLookupStrategy::Containment => self
                .api_tests()
                .iter()
                // An empty endpoint would be contained in every request
                .filter(|spec| !spec.endpoint.is_empty() && endpoint.contains(&spec.endpoint))
                .flat_map(|spec| spec.test_cases(endpoint))
                .collect(),
        };

        debug!(
            "API lookup {:?} for {} matched {} tests",
            self.strategy,
            endpoint,
            tests.len()
        );
        tests
    }

    /// Scenarios of the feature named `key`; `None` when the feature is
    /// missing or declares no scenarios.
    pub fn find_feature_scenarios(&self, key: &str) -> Option<&[Scenario]> {
        self.features()
            .iter()
            .find(|f| f.matches_key(key))?
            .scenarios
            .as_deref()
    }

    pub fn find_story(&self, story_id: &str) -> Option<&UserStory> {
        self.user_stories().iter().find(|s| s.id == story_id)
    }

    pub fn acceptance_criteria(&self, story_id: &str) -> &[String] {
        self.find_story(story_id)
            .map(|s| s.acceptance_criteria.as_slice())
            .unwrap_or_default()
    }

    pub fn story_edge_cases(&self, story_id: &str) -> &[EdgeCase] {
        self.find_story(story_id)
            .map(|s| s.edge_cases.as_slice())
            .unwrap_or_default()
    }
}

/// Parse PRP content; `.yaml`/`.yml` files are read as YAML, everything else
/// as JSON.
pub fn parse_document(path: &Path, content: &str) -> Result<RequirementDocument, RequirementError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed: Result<RequirementDocument, String> = if is_yaml {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| RequirementError::Malformed {
        path: path.to_path_buf(),
        reason,
    })
}
