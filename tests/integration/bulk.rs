//! Bulk processing against in-memory endpoints.

use scim_engine::bulk::{BulkMethod, BulkProcessor, BulkState};
use scim_engine::{AttributeSelection, BulkConfig, SearchRequest};
use serde_json::{Value, json};

use crate::common::{self, fixtures};

async fn run(processor: &BulkProcessor<'_>, body: &Value) -> scim_engine::BulkOutcome {
    processor
        .process_json(&body.to_string())
        .await
        .expect("bulk request accepted")
}

#[tokio::test]
async fn test_mixed_methods_in_order() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let outcome = run(
        &processor,
        &fixtures::bulk(vec![
            json!({"method": "POST", "path": "/Users", "bulkId": "u1", "data": fixtures::user("alice")}),
            json!({"method": "PUT", "path": "/Users/bulkId:u1",
                   "data": fixtures::user_with("alice", json!({"displayName": "Alice"}))}),
            json!({"method": "PATCH", "path": "/Users/bulkId:u1",
                   "data": fixtures::patch(vec![json!({"op": "add", "path": "title", "value": "Engineer"})])}),
            json!({"method": "DELETE", "path": "/Users/bulkId:u1"}),
        ]),
    )
    .await;

    assert_eq!(outcome.state, BulkState::Completed);
    let statuses: Vec<_> = outcome.response.operations.iter().map(|op| op.status.as_str()).collect();
    assert_eq!(statuses, vec!["201", "200", "200", "204"]);

    let operations = &outcome.response.operations;
    let methods: Vec<_> = operations.iter().map(|op| op.method).collect();
    assert_eq!(
        methods,
        vec![BulkMethod::Post, BulkMethod::Put, BulkMethod::Patch, BulkMethod::Delete]
    );

    let created = operations[0].response.as_ref().expect("created body");
    let location = operations[0].location.as_deref().expect("location");
    assert_eq!(created["meta"]["location"], location);
    assert!(operations[0].version.as_deref().is_some_and(|v| v.starts_with("W/\"")));

    let patched = operations[2].response.as_ref().expect("patched body");
    assert_eq!(patched["displayName"], "Alice");
    assert_eq!(patched["title"], "Engineer");

    // delete reports where the resource lived
    assert_eq!(operations[3].location.as_deref(), Some(location));
    assert!(common::users(&endpoints).list_resources(&SearchRequest::new()).await.unwrap().resources.is_empty());
}

#[tokio::test]
async fn test_failures_do_not_stop_batch_without_threshold() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let outcome = run(
        &processor,
        &fixtures::bulk(vec![
            json!({"method": "POST", "path": "/Users", "bulkId": "bad",
                   "data": {"schemas": [fixtures::USER_SCHEMA], "displayName": "No Name"}}),
            json!({"method": "POST", "path": "/Devices", "bulkId": "dev", "data": {}}),
            json!({"method": "DELETE", "path": "/Users/missing"}),
            json!({"method": "POST", "path": "/Users", "bulkId": "ok", "data": fixtures::user("bob")}),
        ]),
    )
    .await;

    assert_eq!(outcome.state, BulkState::Completed);
    let statuses: Vec<_> = outcome.response.operations.iter().map(|op| op.status.as_str()).collect();
    assert_eq!(statuses, vec!["400", "404", "404", "201"]);

    let failure = &outcome.response.operations[0];
    assert_eq!(failure.bulk_id.as_deref(), Some("bad"));
    let error = failure.response.as_ref().expect("error object");
    assert_eq!(error["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:Error");
    assert!(error["detail"].as_str().unwrap_or_default().contains("userName"));
}

#[tokio::test]
async fn test_reference_to_failed_operation() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let outcome = run(
        &processor,
        &fixtures::bulk(vec![
            json!({"method": "POST", "path": "/Users", "bulkId": "u1",
                   "data": {"schemas": [fixtures::USER_SCHEMA]}}),
            json!({"method": "POST", "path": "/Groups", "bulkId": "g1",
                   "data": fixtures::group("Team", &["bulkId:u1"])}),
            json!({"method": "POST", "path": "/Groups", "bulkId": "g2",
                   "data": fixtures::group("Later", &["bulkId:u9"])}),
        ]),
    )
    .await;

    let operations = &outcome.response.operations;
    assert_eq!(operations.len(), 3);
    assert!(operations.iter().all(|op| op.status == "400"));

    let detail = |index: usize| {
        operations[index].response.as_ref().expect("error object")["detail"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    };
    assert!(detail(1).contains("u1") && detail(1).contains("failed"));
    assert!(detail(2).contains("u9"));

    let groups = common::groups(&endpoints)
        .list_resources(&SearchRequest::new())
        .await
        .unwrap();
    assert_eq!(groups.total_results, 0);
}

#[tokio::test]
async fn test_operation_shape_errors() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let outcome = run(
        &processor,
        &fixtures::bulk(vec![
            json!({"method": "POST", "path": "/Users", "data": fixtures::user("nobulkid")}),
            json!({"method": "POST", "path": "/Users/123", "bulkId": "x", "data": fixtures::user("x")}),
            json!({"method": "PUT", "path": "/Users", "data": fixtures::user("y")}),
            json!({"method": "PATCH", "path": "/Users/123"}),
        ]),
    )
    .await;

    let types: Vec<_> = outcome
        .response
        .operations
        .iter()
        .map(|op| op.response.as_ref().expect("error object")["scimType"].clone())
        .collect();
    assert_eq!(
        types,
        vec![
            json!("invalidSyntax"),
            json!("invalidSyntax"),
            json!("noTarget"),
            json!("invalidSyntax")
        ]
    );
    assert!(
        common::users(&endpoints)
            .list_resources(&SearchRequest::new())
            .await
            .unwrap()
            .resources
            .is_empty()
    );
}

#[tokio::test]
async fn test_handle_envelope_and_limits() {
    let endpoints = common::endpoints();
    let limits = BulkConfig {
        max_operations: 2,
        max_payload_size: 4096,
    };
    let processor = BulkProcessor::new(&endpoints, limits);

    let ok = fixtures::bulk(vec![json!({
        "method": "POST", "path": "/Users", "bulkId": "u1", "data": fixtures::user("alice")
    })]);
    let response = processor.handle(&ok.to_string()).await;
    assert_eq!(response.status, 200);
    let body = response.body.expect("bulk response body");
    assert_eq!(body["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:BulkResponse");
    assert_eq!(body["Operations"][0]["bulkId"], "u1");
    assert_eq!(body["Operations"][0]["status"], "201");

    let too_many = fixtures::bulk(vec![json!({"method": "DELETE", "path": "/Users/1"}); 3]);
    let response = processor.handle(&too_many.to_string()).await;
    assert_eq!(response.status, 413);
    assert_eq!(response.body.expect("error body")["scimType"], "tooMany");

    let oversized = fixtures::bulk(vec![json!({
        "method": "POST", "path": "/Users", "bulkId": "big",
        "data": fixtures::user_with("big", json!({"displayName": "x".repeat(5000)}))
    })]);
    assert_eq!(processor.handle(&oversized.to_string()).await.status, 413);

    let response = processor.handle(r#"{"Operations": []}"#).await;
    assert_eq!(response.status, 400);

    // nothing from the rejected batches was applied
    let users = common::users(&endpoints);
    let listed = users.list_resources(&SearchRequest::new()).await.unwrap();
    assert_eq!(listed.total_results, 1);
    let id = listed.resources[0]["id"].as_str().expect("id");
    assert_eq!(users.get(id, &AttributeSelection::all()).await.status, 200);
}

#[tokio::test]
async fn test_zero_threshold_only_counts_failures() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let mut body = fixtures::bulk(vec![
        json!({"method": "POST", "path": "/Users", "bulkId": "u1", "data": fixtures::user("alice")}),
        json!({"method": "POST", "path": "/Users", "bulkId": "u2", "data": fixtures::user("bob")}),
    ]);
    body["failOnErrors"] = json!(0);
    let outcome = run(&processor, &body).await;
    assert_eq!(outcome.state, BulkState::Completed);
    let statuses: Vec<_> = outcome.response.operations.iter().map(|op| op.status.as_str()).collect();
    assert_eq!(statuses, vec!["201", "201"]);

    let mut body = fixtures::bulk(vec![
        json!({"method": "POST", "path": "/Users", "bulkId": "u3", "data": fixtures::user("carol")}),
        json!({"method": "DELETE", "path": "/Users/missing"}),
        json!({"method": "POST", "path": "/Users", "bulkId": "u4", "data": fixtures::user("dave")}),
    ]);
    body["failOnErrors"] = json!(0);
    let outcome = run(&processor, &body).await;
    assert_eq!(outcome.state, BulkState::Aborted);
    let statuses: Vec<_> = outcome.response.operations.iter().map(|op| op.status.as_str()).collect();
    assert_eq!(statuses, vec!["201", "404"]);
}

#[tokio::test]
async fn test_member_ref_resolves_to_location() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let mut group = fixtures::group("Team", &["bulkId:u1"]);
    group["members"][0]["$ref"] = json!("bulkId:u1");
    let outcome = run(
        &processor,
        &fixtures::bulk(vec![
            json!({"method": "POST", "path": "/Users", "bulkId": "u1", "data": fixtures::user("alice")}),
            json!({"method": "POST", "path": "/Groups", "bulkId": "g1", "data": group}),
        ]),
    )
    .await;

    let operations = &outcome.response.operations;
    assert_eq!(operations[1].status, "201");
    let user_id = operations[0].response.as_ref().expect("user body")["id"].clone();
    let member = &operations[1].response.as_ref().expect("group body")["members"][0];
    assert_eq!(member["value"], user_id);
    assert_eq!(member["$ref"].as_str(), operations[0].location.as_deref());
}
