//! Property tests for filter rendering and bulk failure thresholds.

use proptest::prelude::*;
use scim_engine::bulk::{BulkOperation, BulkProcessor, BulkRequest, BulkState};
use scim_engine::filter::{Literal, render};
use scim_engine::parse_filter;
use serde_json::json;

use crate::common::{self, fixtures};

fn comparison(attributes: Vec<&'static str>) -> impl Strategy<Value = String> {
    let attribute = prop::sample::select(attributes);
    let operator = prop::sample::select(vec!["eq", "ne", "co", "sw", "ew"]);
    (attribute, operator, "[ -~]{0,12}").prop_map(|(attribute, operator, value)| {
        format!("{} {} {}", attribute, operator, Literal::String(value))
    })
}

fn string_expression() -> impl Strategy<Value = String> {
    comparison(vec![
        "userName",
        "displayName",
        "title",
        "name.familyName",
        "emails.value",
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:department",
    ])
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        string_expression(),
        prop::bool::ANY.prop_map(|b| format!("active eq {}", b)),
        Just("title pr".to_string()),
        Just("nickName eq null".to_string()),
        comparison(vec!["value", "display", "type"]).prop_map(|inner| format!("emails[primary eq true and {}]", inner)),
    ]
}

fn filter_text() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{} and {}", l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{} or {}", l, r)),
            inner.clone().prop_map(|f| format!("({})", f)),
            inner.prop_map(|f| format!("not ({})", f)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_render_then_parse_is_identity(text in filter_text()) {
        let registry = common::registry();
        let users = registry.user_schema().expect("User registered");

        let ast = parse_filter(&text, &registry, users)
            .map_err(|e| TestCaseError::fail(format!("{}: {}", text, e)))?;
        let rendered = render(&ast);
        let reparsed = parse_filter(&rendered, &registry, users)
            .map_err(|e| TestCaseError::fail(format!("{}: {}", rendered, e)))?;
        prop_assert_eq!(reparsed, ast);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_bulk_stops_exactly_at_threshold(
        failing in prop::collection::vec(any::<bool>(), 1..8),
        threshold in prop::option::of(0usize..4),
    ) {
        let operations: Vec<_> = failing
            .iter()
            .enumerate()
            .map(|(index, fails)| {
                let data = if *fails {
                    json!({"schemas": [fixtures::USER_SCHEMA]})
                } else {
                    fixtures::user(&format!("user{}", index))
                };
                BulkOperation::post("/Users", format!("op{}", index), data)
            })
            .collect();
        let mut request = BulkRequest::new(operations);
        if let Some(threshold) = threshold {
            request = request.with_fail_on_errors(threshold);
        }

        let expected_len = threshold
            .and_then(|threshold| {
                failing
                    .iter()
                    .enumerate()
                    .filter(|(_, fails)| **fails)
                    .nth(threshold.saturating_sub(1))
                    .map(|(index, _)| index + 1)
            })
            .unwrap_or(failing.len());

        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let endpoints = common::endpoints();
        let processor = BulkProcessor::new(&endpoints, common::config().bulk);
        let outcome = runtime.block_on(processor.process(&request));

        let operations = &outcome.response.operations;
        prop_assert_eq!(operations.len(), expected_len);
        let failures = failing.iter().filter(|fails| **fails).count();
        let aborted = threshold.is_some_and(|threshold| failures >= threshold.max(1));
        prop_assert_eq!(outcome.state == BulkState::Aborted, aborted);
        if failures == 0 {
            prop_assert_eq!(outcome.state, BulkState::Completed);
            prop_assert_eq!(operations.len(), failing.len());
        }
        for (index, response) in operations.iter().enumerate() {
            let expected = if failing[index] { "400" } else { "201" };
            prop_assert_eq!(response.status.as_str(), expected);
            let bulk_id = format!("op{}", index);
            prop_assert_eq!(response.bulk_id.as_deref(), Some(bulk_id.as_str()));
        }
    }
}
