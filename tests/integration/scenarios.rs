//! Acceptance scenarios for the codec, validators, filter parser and bulk
//! processor.

use std::collections::BTreeSet;

use scim_engine::bulk::{BulkProcessor, BulkState};
use scim_engine::filter::{Filter, Literal, Operator};
use scim_engine::{
    Attribute, AttributeSelection, JsonDecoder, JsonEncoder, OperationContext, ScimErrorType,
    ScimResource, parse_filter,
};
use serde_json::json;

use crate::common::{self, fixtures};

fn member_set(tree: &ScimResource) -> BTreeSet<(String, String)> {
    tree.get("members")
        .and_then(Attribute::as_multi)
        .unwrap_or_default()
        .iter()
        .map(|member| {
            let field = |name| member.sub(name).and_then(Attribute::as_str).unwrap_or_default().to_string();
            (field("value"), field("display"))
        })
        .collect()
}

#[test]
fn test_create_without_user_name_is_rejected() {
    let registry = common::registry();
    let users = registry.user_schema().expect("User registered");

    let mut body = fixtures::user("bjensen");
    body.as_object_mut().expect("object").remove("userName");
    let mut tree = JsonDecoder::new(&registry).decode_value(&body, users).unwrap();

    let error = registry
        .validate(OperationContext::Create, &mut tree, None)
        .unwrap_err();
    assert_eq!(error.status(), 400);
    assert_eq!(error.scim_type(), Some(ScimErrorType::InvalidValue));
    assert!(error.detail().contains("userName"), "{}", error.detail());
}

#[test]
fn test_group_members_survive_encode_decode() {
    let registry = common::registry();
    let group_type = registry.group_schema().expect("Group registered");
    let decoder = JsonDecoder::new(&registry);

    let first = decoder.decode_value(&fixtures::rfc_examples::group(), group_type).unwrap();
    let encoded = JsonEncoder::new(&registry)
        .encode(&first, &AttributeSelection::all())
        .unwrap();
    let second = decoder.decode(&encoded, group_type).unwrap();

    let expected: BTreeSet<_> = [
        ("2819c223-7f76-453a-919d-413861904646", "Babs Jensen"),
        ("902c246b-6245-4190-8e05-00816be7344a", "Mandy Pepperidge"),
    ]
    .into_iter()
    .map(|(value, display)| (value.to_string(), display.to_string()))
    .collect();
    assert_eq!(member_set(&first), expected);
    assert_eq!(member_set(&second), expected);
    assert_eq!(first, second);
}

#[test]
fn test_filter_resolves_canonical_uri() {
    let registry = common::registry();
    let users = registry.user_schema().expect("User registered");

    let filter = parse_filter(r#"emails.type eq "work""#, &registry, users).unwrap();
    let Filter::Expression(expr) = filter else {
        panic!("expected a single expression, got {:?}", filter);
    };
    assert_eq!(expr.attribute.uri, "urn:ietf:params:scim:schemas:core:2.0:User:emails.type");
    assert_eq!(expr.operator, Operator::Eq);
    assert_eq!(expr.value, Some(Literal::String("work".into())));
}

#[tokio::test]
async fn test_bulk_group_references_created_user() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let body = fixtures::bulk(vec![
        json!({"method": "POST", "path": "/Users", "bulkId": "u1", "data": fixtures::user("alice")}),
        json!({"method": "POST", "path": "/Groups", "bulkId": "g1",
               "data": fixtures::group("Tour Guides", &["bulkId:u1"])}),
    ]);
    let outcome = processor.process_json(&body.to_string()).await.unwrap();
    assert_eq!(outcome.state, BulkState::Completed);

    let [user_op, group_op] = outcome.response.operations.as_slice() else {
        panic!("expected two operation responses");
    };
    assert_eq!(user_op.status, "201");
    assert_eq!(group_op.status, "201");

    let user_id = user_op.response.as_ref().expect("user body")["id"]
        .as_str()
        .expect("assigned id")
        .to_string();
    assert_eq!(
        group_op.response.as_ref().expect("group body")["members"][0]["value"],
        user_id.as_str()
    );

    // the stored group carries the real id as well
    let group_id = group_op.response.as_ref().expect("group body")["id"]
        .as_str()
        .expect("assigned id");
    let stored = common::groups(&endpoints)
        .get_resource(group_id, &AttributeSelection::all())
        .await
        .unwrap();
    assert_eq!(member_set(&stored).into_iter().next().map(|(value, _)| value), Some(user_id));
}

#[tokio::test]
async fn test_bulk_stops_at_fail_on_errors() {
    let endpoints = common::endpoints();
    let processor = BulkProcessor::new(&endpoints, common::config().bulk);

    let mut body = fixtures::bulk(vec![
        json!({"method": "POST", "path": "/Users", "bulkId": "a", "data": fixtures::user("alice")}),
        json!({"method": "POST", "path": "/Users", "bulkId": "b", "data": fixtures::user("alice")}),
        json!({"method": "POST", "path": "/Users", "bulkId": "c", "data": fixtures::user("carol")}),
        json!({"method": "POST", "path": "/Users", "bulkId": "d", "data": fixtures::user("dave")}),
    ]);
    body["failOnErrors"] = json!(1);

    let outcome = processor.process_json(&body.to_string()).await.unwrap();
    assert_eq!(outcome.state, BulkState::Aborted);
    assert_eq!(outcome.response.operations.len(), 2);
    assert_eq!(outcome.response.operations[1].status, "409");

    // operations 3 and 4 were never attempted
    let users = common::users(&endpoints);
    let listed = users
        .list_resources(&scim_engine::SearchRequest::new())
        .await
        .unwrap();
    assert_eq!(listed.total_results, 1);
}

#[test]
fn test_update_rejects_changed_read_only_value() {
    let registry = common::registry();
    let users = registry.user_schema().expect("User registered");
    let decoder = JsonDecoder::new(&registry);

    let stored = decoder.decode_value(&fixtures::rfc_examples::user_minimal(), users).unwrap();
    let mut body = fixtures::rfc_examples::user_minimal();
    body["id"] = json!("00000000-0000-0000-0000-000000000000");
    let mut tree = decoder.decode_value(&body, users).unwrap();

    let error = registry
        .validate(OperationContext::Update, &mut tree, Some(&stored))
        .unwrap_err();
    assert_eq!(error.status(), 500);
    assert!(error.to_string().contains("read only"), "{}", error);
}
