//! Positional merge of caller-supplied steps with PRP-declared steps

use super::types::Step;

/// Merge caller steps onto requirement steps.
///
/// Step `i` of the result is requirement step `i` overlaid field-by-field by
/// caller step `i` when one exists, otherwise the requirement step unchanged.
/// Caller steps beyond the requirement's length are appended as-is. Without
/// caller steps the requirement steps are returned verbatim.
pub fn merge_steps(caller: Option<&[Step]>, requirement: &[Step]) -> Vec<Step> {
    let Some(caller) = caller else {
        return requirement.to_vec();
    };

    let mut merged: Vec<Step> = requirement
        .iter()
        .enumerate()
        .map(|(i, req)| match caller.get(i) {
            Some(step) => overlay(req, step),
            None => req.clone(),
        })
        .collect();

    if caller.len() > requirement.len() {
        merged.extend_from_slice(&caller[requirement.len()..]);
    }

    merged
}

/// Requirement step with every field the caller sets replaced by the
/// caller's value
fn overlay(requirement: &Step, caller: &Step) -> Step {
    let carried = requirement
        .validation
        .clone()
        .or_else(|| requirement.expected.clone());

    Step {
        action: caller.action.or(requirement.action),
        selector: caller.selector.clone().or_else(|| requirement.selector.clone()),
        value: caller.value.clone().or_else(|| requirement.value.clone()),
        url: caller.url.clone().or_else(|| requirement.url.clone()),
        name: caller.name.clone().or_else(|| requirement.name.clone()),
        duration: caller.duration.or(requirement.duration),
        description: caller
            .description
            .clone()
            .or_else(|| requirement.description.clone()),
        expected: caller.expected.clone().or_else(|| requirement.expected.clone()),
        validation: caller
            .validation
            .clone()
            .or_else(|| requirement.validation.clone()),
        source_validation: caller
            .source_validation
            .clone()
            .or(carried)
            .or_else(|| requirement.source_validation.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prp::types::StepAction;
    use serde_json::json;

    fn login_steps() -> Vec<Step> {
        vec![
            Step::new(StepAction::Navigate).with_value("/login"),
            Step::new(StepAction::Fill)
                .with_selector("#email")
                .with_value("placeholder@example.com")
                .with_expected("email accepted"),
            Step::new(StepAction::Click).with_selector("#submit"),
        ]
    }

    #[test]
    fn test_no_caller_steps_returns_requirement() {
        let req = login_steps();
        assert_eq!(merge_steps(None, &req), req);
    }

    #[test]
    fn test_caller_field_overrides_single_field() {
        let req = login_steps();
        let caller = vec![
            Step::default(),
            Step {
                value: Some(json!("real@example.com")),
                ..Default::default()
            },
        ];

        let merged = merge_steps(Some(&caller), &req);
        assert_eq!(merged.len(), 3);

        // Untouched positions keep the requirement step, apart from the carried validation
        assert_eq!(merged[0].action, Some(StepAction::Navigate));
        assert_eq!(merged[0].value, Some(json!("/login")));

        assert_eq!(merged[1].action, Some(StepAction::Fill));
        assert_eq!(merged[1].selector.as_deref(), Some("#email"));
        assert_eq!(merged[1].value, Some(json!("real@example.com")));
        assert_eq!(merged[1].source_validation, Some(json!("email accepted")));

        assert_eq!(merged[2], req[2]);
    }

    #[test]
    fn test_validation_preferred_over_expected() {
        let req = vec![Step {
            validation: Some(json!({ "visible": "#dashboard" })),
            expected: Some(json!("dashboard")),
            ..Step::new(StepAction::Validate)
        }];
        let caller = vec![Step::default()];

        let merged = merge_steps(Some(&caller), &req);
        assert_eq!(
            merged[0].source_validation,
            Some(json!({ "visible": "#dashboard" }))
        );
    }

    #[test]
    fn test_extra_caller_steps_appended() {
        let req = login_steps();
        let mut caller = vec![Step::default(); 3];
        caller.push(Step::new(StepAction::Screenshot));
        caller.push(Step::new(StepAction::Wait));

        let merged = merge_steps(Some(&caller), &req);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged[3], caller[3]);
        assert_eq!(merged[4], caller[4]);
    }

    #[test]
    fn test_merge_length_law() {
        let req = login_steps();
        for caller_len in 0..6 {
            let caller = vec![Step::new(StepAction::Click); caller_len];
            let merged = merge_steps(Some(&caller), &req);
            assert_eq!(merged.len(), caller_len.max(req.len()));
        }
        assert_eq!(merge_steps(None, &req).len(), req.len());
        assert!(merge_steps(None, &[]).is_empty());
    }

    #[test]
    fn test_merge_override_law() {
        let mut req = login_steps();
        req[0].url = Some("/login".to_string());
        req[1].validation = Some(json!({ "visible": "#email" }));
        req[2].name = Some("submit".to_string());
        req[2].duration = Some(500);

        let caller = vec![
            Step {
                url: Some("/signin".to_string()),
                duration: Some(1000),
                source_validation: Some(json!("signed in")),
                ..Step::new(StepAction::Navigate).with_value("/signin")
            },
            Step {
                name: Some("email".to_string()),
                validation: Some(json!({ "visible": "#user-email" })),
                ..Step::default().with_selector("#user-email")
            },
            Step::default().with_description("submit form"),
        ];

        let merged = merge_steps(Some(&caller), &req);
        for i in 0..req.len() {
            let (m, c, r) = (&merged[i], &caller[i], &req[i]);
            assert_eq!(m.action, c.action.or(r.action));
            assert_eq!(m.selector, c.selector.clone().or(r.selector.clone()));
            assert_eq!(m.value, c.value.clone().or(r.value.clone()));
            assert_eq!(m.url, c.url.clone().or(r.url.clone()));
            assert_eq!(m.name, c.name.clone().or(r.name.clone()));
            assert_eq!(m.duration, c.duration.or(r.duration));
            assert_eq!(m.description, c.description.clone().or(r.description.clone()));
            assert_eq!(m.expected, c.expected.clone().or(r.expected.clone()));
            assert_eq!(m.validation, c.validation.clone().or(r.validation.clone()));
            if c.source_validation.is_some() {
                assert_eq!(m.source_validation, c.source_validation);
            }
        }

        assert_eq!(merged[0].source_validation, Some(json!("signed in")));
        assert_eq!(merged[1].source_validation, Some(json!({ "visible": "#email" })));
        assert_eq!(merged[2].name.as_deref(), Some("submit"));
        assert_eq!(merged[2].duration, Some(500));
    }
}
