//! Executed-vs-required coverage over scenarios, API specs and user stories

use super::store::RequirementStore;
use super::types::{
    ApiSpec, ComplianceReport, CoverageItem, CoverageReport, ExecutedApiTest, ExecutedFlow,
    RequirementKind, Scenario, ScenarioCoverage, StoryCoverage, UserStory,
};

/// Coverage of required scenarios and API specs by executed flows and API tests
pub fn scenario_api_coverage(
    scenarios: &[Scenario],
    api_specs: &[ApiSpec],
    flows: &[ExecutedFlow],
    api_tests: &[ExecutedApiTest],
) -> CoverageReport {
    let mut tally = Tally::default();

    for scenario in scenarios {
        let label = scenario.label();
        if scenario_executed(scenario, flows) {
            tally.cover(RequirementKind::Scenario, label.to_string());
        } else {
            tally.miss(RequirementKind::Scenario, format!("Test Scenario: {}", label));
        }
    }

    for spec in api_specs {
        let covered = api_tests.iter().any(|t| spec.matches_endpoint(&t.endpoint));
        if covered {
            tally.cover(RequirementKind::Api, format!("API: {}", spec.endpoint));
        } else {
            tally.miss(
                RequirementKind::Api,
                format!("API Test: {} {}", spec.method_or_default(), spec.endpoint),
            );
        }
    }

    tally.into_report()
}

/// Coverage of user stories by executed flows
pub fn story_coverage(stories: &[UserStory], flows: &[ExecutedFlow]) -> CoverageReport {
    let mut tally = Tally::default();

    for story in stories {
        if story_covered(story, flows) {
            tally.cover(RequirementKind::Story, story.title.clone());
        } else {
            tally.miss(RequirementKind::Story, format!("User Story: {}", story.title));
        }
    }

    tally.into_report()
}

/// Scenario/API coverage for everything a store requires
pub fn store_coverage(
    store: &RequirementStore,
    flows: &[ExecutedFlow],
    api_tests: &[ExecutedApiTest],
) -> CoverageReport {
    if !store.has_document() {
        return CoverageReport::vacuous();
    }
    scenario_api_coverage(store.scenarios(), store.required_api_specs(), flows, api_tests)
}

/// Build the compliance document written at the end of a session
pub fn compliance_report(
    store: &RequirementStore,
    project: &str,
    session_id: &str,
    flows: &[ExecutedFlow],
    api_tests: &[ExecutedApiTest],
) -> ComplianceReport {
    let user_stories: Vec<StoryCoverage> = store
        .user_stories()
        .iter()
        .map(|story| StoryCoverage {
            id: story.id.clone(),
            title: story.title.clone(),
            covered: story_covered(story, flows),
            acceptance_criteria: story.acceptance_criteria.clone(),
        })
        .collect();

    let test_scenarios: Vec<ScenarioCoverage> = store
        .scenarios()
        .iter()
        .map(|scenario| ScenarioCoverage {
            id: scenario.id.clone(),
            name: scenario.label().to_string(),
            executed: scenario_executed(scenario, flows),
        })
        .collect();

    let done = user_stories.iter().filter(|s| s.covered).count()
        + test_scenarios.iter().filter(|s| s.executed).count();
    let total = user_stories.len() + test_scenarios.len();

    ComplianceReport {
        project: project.to_string(),
        session_id: session_id.to_string(),
        prp_version: store.version().map(str::to_string),
        has_prp: store.has_document(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        user_stories,
        test_scenarios,
        overall_coverage: percentage(done, total),
        requirements: store_coverage(store, flows, api_tests),
    }
}

/// `round(covered / total * 100)`, or 100 when nothing is required
pub fn percentage(covered: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    // Integer half-up rounding
    let pct = (covered * 200 + total) / (total * 2);
    pct.min(100) as u8
}

fn scenario_executed(scenario: &Scenario, flows: &[ExecutedFlow]) -> bool {
    flows.iter().any(|flow| {
        scenario.name.as_deref() == Some(flow.name.as_str())
            || scenario.id.as_deref() == Some(flow.name.as_str())
    })
}

fn story_covered(story: &UserStory, flows: &[ExecutedFlow]) -> bool {
    flows.iter().any(|flow| {
        let by_title = !story.title.is_empty() && flow.name.contains(&story.title);
        let by_tag = !story.id.is_empty() && flow.story_id() == Some(story.id.as_str());
        by_title || by_tag
    })
}

#[derive(Default)]
struct Tally {
    covered: Vec<CoverageItem>,
    missing: Vec<CoverageItem>,
}

impl Tally {
    fn cover(&mut self, kind: RequirementKind, label: String) {
        self.covered.push(CoverageItem::new(kind, label));
    }

    fn miss(&mut self, kind: RequirementKind, label: String) {
        self.missing.push(CoverageItem::new(kind, label));
    }

    fn into_report(self) -> CoverageReport {
        let total = self.covered.len() + self.missing.len();
        CoverageReport {
            coverage: percentage(self.covered.len(), total),
            covered: self.covered,
            missing: self.missing,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prp::store::ApiLookupStrategy;
    use crate::prp::types::{RequirementDocument, Step, StepAction};
    use serde_json::json;

    fn login_scenario() -> Scenario {
        Scenario {
            id: Some("s1".to_string()),
            name: Some("Login Flow".to_string()),
            description: None,
            steps: vec![Step::new(StepAction::Navigate).with_value("/login")],
        }
    }

    fn story(id: &str, title: &str) -> UserStory {
        UserStory {
            id: id.to_string(),
            title: title.to_string(),
            acceptance_criteria: vec!["works".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_login_flow_covered() {
        let report = scenario_api_coverage(
            &[login_scenario()],
            &[],
            &[ExecutedFlow::new("Login Flow")],
            &[],
        );

        assert_eq!(report.coverage, 100);
        assert_eq!(report.covered_labels(), vec!["Login Flow"]);
        assert!(report.missing.is_empty());
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_login_flow_missing() {
        let report = scenario_api_coverage(&[login_scenario()], &[], &[], &[]);

        assert_eq!(report.coverage, 0);
        assert!(report.covered.is_empty());
        assert_eq!(report.missing_labels(), vec!["Test Scenario: Login Flow"]);
        assert_eq!(report.missing[0].kind, RequirementKind::Scenario);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_scenario_covered_by_id() {
        let report =
            scenario_api_coverage(&[login_scenario()], &[], &[ExecutedFlow::new("s1")], &[]);
        assert_eq!(report.coverage, 100);
    }

    #[test]
    fn test_api_covered_by_endpoint_or_path() {
        let by_path: ApiSpec =
            serde_json::from_value(json!({ "path": "/api/users", "method": "POST" })).unwrap();
        let specs = vec![ApiSpec::new("GET", "/api/todos"), by_path, ApiSpec::new("DELETE", "/api/todos/1")];
        let tests = vec![ExecutedApiTest::new("/api/todos"), ExecutedApiTest::new("/api/users")];

        let report = scenario_api_coverage(&[], &specs, &[], &tests);
        assert_eq!(report.total, 3);
        assert_eq!(report.covered_labels(), vec!["API: /api/todos", "API: /api/users"]);
        assert_eq!(report.missing_labels(), vec!["API Test: DELETE /api/todos/1"]);
        assert_eq!(report.missing[0].kind, RequirementKind::Api);
        assert_eq!(report.coverage, 67);
    }

    #[test]
    fn test_api_spec_without_endpoint_never_covered() {
        let spec: ApiSpec = serde_json::from_value(json!({ "method": "GET" })).unwrap();
        let report = scenario_api_coverage(&[], &[spec], &[], &[ExecutedApiTest::new("")]);

        assert!(report.covered.is_empty());
        assert_eq!(report.total, 1);
        assert_eq!(report.coverage, 0);
    }

    #[test]
    fn test_required_api_list_follows_strategy() {
        let doc: RequirementDocument = serde_json::from_value(json!({
            "apiSpecifications": [{ "endpoint": "/api/users", "method": "GET" }],
            "apiTests": [{ "endpoint": "/api/todos", "method": "GET" }]
        }))
        .unwrap();

        let exact = RequirementStore::from_document(doc.clone());
        let report = store_coverage(&exact, &[], &[]);
        assert_eq!(report.missing_labels(), vec!["API Test: GET /api/users"]);

        let containment =
            RequirementStore::from_document(doc).with_strategy(ApiLookupStrategy::Containment);
        let report = store_coverage(&containment, &[], &[]);
        assert_eq!(report.missing_labels(), vec!["API Test: GET /api/todos"]);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_story_title_substring_and_tag() {
        let stories = vec![
            story("us1", "Create todo"),
            story("us2", "Share list"),
            story("us3", "Archive"),
        ];
        let flows = vec![
            ExecutedFlow::new("Create todo - happy path"),
            ExecutedFlow::new("Team Collaboration").with_story("us2"),
        ];

        let report = story_coverage(&stories, &flows);
        assert_eq!(report.covered_labels(), vec!["Create todo", "Share list"]);
        assert_eq!(report.missing_labels(), vec!["User Story: Archive"]);
        assert!(report.missing.iter().all(|i| i.kind == RequirementKind::Story));
        assert_eq!(report.coverage, 67);
    }

    #[test]
    fn test_empty_title_does_not_match_everything() {
        let report = story_coverage(&[story("us1", "")], &[ExecutedFlow::new("anything")]);
        assert_eq!(report.coverage, 0);
    }

    #[test]
    fn test_zero_total_is_vacuous() {
        let report = scenario_api_coverage(&[], &[], &[ExecutedFlow::new("x")], &[]);
        assert_eq!(report, CoverageReport::vacuous());
        assert_eq!(story_coverage(&[], &[]).coverage, 100);
    }

    #[test]
    fn test_coverage_is_idempotent() {
        let scenarios = vec![login_scenario()];
        let specs = vec![ApiSpec::new("GET", "/api/todos")];
        let flows = vec![ExecutedFlow::new("Login Flow")];

        let a = scenario_api_coverage(&scenarios, &specs, &flows, &[]);
        let b = scenario_api_coverage(&scenarios, &specs, &flows, &[]);
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    }

    #[test]
    fn test_percentage_bounds_and_rounding() {
        assert_eq!(percentage(0, 0), 100);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        for total in 1..40 {
            for covered in 0..=total {
                assert!(percentage(covered, total) <= 100);
            }
        }
    }

    #[test]
    fn test_absent_document_is_vacuous() {
        let store = RequirementStore::empty();
        let report = store_coverage(&store, &[ExecutedFlow::new("Login Flow")], &[]);
        assert_eq!(report.coverage, 100);
        assert!(report.missing.is_empty());
        assert_eq!(report.total, 0);
    }

    #[test]
    fn test_compliance_report_overall() {
        let doc = RequirementDocument {
            version: Some("1.2".to_string()),
            test_scenarios: vec![login_scenario()],
            user_stories: vec![story("us1", "Create todo"), story("us2", "Share list")],
            ..Default::default()
        };
        let store = RequirementStore::from_document(doc);
        let flows = vec![ExecutedFlow::new("Login Flow").with_story("us2")];

        let report = compliance_report(&store, "todo-app", "sess-1", &flows, &[]);
        assert_eq!(report.prp_version.as_deref(), Some("1.2"));
        assert!(report.test_scenarios[0].executed);
        assert!(!report.user_stories[0].covered);
        assert!(report.user_stories[1].covered);
        assert_eq!(report.overall_coverage, 67);
        assert_eq!(report.requirements.coverage, 100);
    }
}
