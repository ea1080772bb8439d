//! Resource endpoint lifecycle through JSON bodies and responses.

use scim_engine::version::weak_etag;
use scim_engine::{AttributeSelection, SearchRequest, SortOrder};
use serde_json::{Value, json};

use crate::common::{self, fixtures};

async fn create(endpoint: &scim_engine::ResourceEndpoint, body: &Value) -> Value {
    let response = endpoint.create(&body.to_string(), &AttributeSelection::all()).await;
    assert_eq!(response.status, 201, "{:?}", response.body);
    response.body.expect("created resource body")
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("resource id").to_string()
}

#[tokio::test]
async fn test_enterprise_user_lifecycle() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);

    let mut body = fixtures::rfc_examples::enterprise_user();
    body["password"] = json!("t1meMa$heen");
    body["id"] = json!("client-chosen");
    let created = create(users, &body).await;
    let id = id_of(&created);

    assert_ne!(id, "client-chosen");
    assert!(created.get("password").is_none());
    assert_eq!(created[fixtures::ENTERPRISE_SCHEMA]["employeeNumber"], "701984");
    assert_eq!(
        created["meta"]["location"],
        format!("{}/v2/Users/{}", common::BASE_URL, id).as_str()
    );

    let fetched = users.get(&id, &AttributeSelection::all()).await;
    assert_eq!(fetched.status, 200);
    let version = fetched.body.as_ref().expect("body")["meta"]["version"]
        .as_str()
        .expect("version")
        .to_string();
    assert_eq!(fetched.etag(), Some(weak_etag(&version).as_str()));
    assert!(fetched.location().is_none());
}

#[tokio::test]
async fn test_replace_keeps_server_managed_values() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);
    let created = create(users, &fixtures::user("bjensen")).await;
    let id = id_of(&created);

    let replacement = fixtures::user_with("bjensen", json!({"displayName": "Babs Jensen", "active": false}));
    let response = users
        .replace(&id, &replacement.to_string(), &AttributeSelection::all())
        .await;
    assert_eq!(response.status, 200);

    let body = response.body.expect("replaced body");
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["displayName"], "Babs Jensen");
    assert_eq!(body["active"], false);
    assert_eq!(body["meta"]["created"], created["meta"]["created"]);
    assert_ne!(body["meta"]["version"], created["meta"]["version"]);
}

#[tokio::test]
async fn test_user_name_uniqueness_across_create_and_replace() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);
    create(users, &fixtures::user("alice")).await;
    let bob = create(users, &fixtures::user("bob")).await;

    let response = users
        .create(&fixtures::user("ALICE").to_string(), &AttributeSelection::all())
        .await;
    assert_eq!(response.status, 409);
    assert_eq!(response.body.expect("error body")["scimType"], "uniqueness");

    let response = users
        .replace(&id_of(&bob), &fixtures::user("alice").to_string(), &AttributeSelection::all())
        .await;
    assert_eq!(response.status, 409);
}

#[tokio::test]
async fn test_patch_group_membership() {
    let endpoints = common::endpoints();
    let alice = create(common::users(&endpoints), &fixtures::user("alice")).await;
    let bob = create(common::users(&endpoints), &fixtures::user("bob")).await;

    let groups = common::groups(&endpoints);
    let group = create(groups, &fixtures::group("Admins", &[id_of(&alice).as_str()])).await;
    let group_id = id_of(&group);

    let patch = fixtures::patch(vec![
        json!({"op": "add", "path": "members", "value": [{"value": id_of(&bob), "type": "User"}]}),
        json!({"op": "replace", "path": "displayName", "value": "Administrators"}),
    ]);
    let response = groups
        .patch(&group_id, &patch.to_string(), &AttributeSelection::all())
        .await;
    assert_eq!(response.status, 200);
    let body = response.body.expect("patched body");
    assert_eq!(body["displayName"], "Administrators");
    let members: Vec<_> = body["members"]
        .as_array()
        .expect("members")
        .iter()
        .map(|m| m["value"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(members, vec![id_of(&alice), id_of(&bob)]);

    let patch = fixtures::patch(vec![json!({"op": "remove", "path": "members"})]);
    let response = groups
        .patch(&group_id, &patch.to_string(), &AttributeSelection::all())
        .await;
    assert_eq!(response.status, 200);
    assert!(response.body.expect("patched body").get("members").is_none());
}

#[tokio::test]
async fn test_patch_rejections() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);
    let id = id_of(&create(users, &fixtures::user("bjensen")).await);

    let read_only = fixtures::patch(vec![json!({"op": "replace", "path": "meta.created", "value": "2020-01-01T00:00:00Z"})]);
    let response = users.patch(&id, &read_only.to_string(), &AttributeSelection::all()).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body.expect("error body")["scimType"], "mutability");

    let unknown = fixtures::patch(vec![json!({"op": "replace", "path": "favoriteColor", "value": "blue"})]);
    let response = users.patch(&id, &unknown.to_string(), &AttributeSelection::all()).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body.expect("error body")["scimType"], "invalidPath");

    let missing = users.patch("nope", &fixtures::patch(vec![json!({"op": "remove", "path": "title"})]).to_string(), &AttributeSelection::all()).await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_list_filters_on_extension_and_value_path() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);
    create(users, &fixtures::rfc_examples::enterprise_user()).await;
    create(
        users,
        &fixtures::user_with(
            "mpepperidge",
            json!({"emails": [{"value": "mandy@example.org", "type": "home"}], "title": "Guide"}),
        ),
    )
    .await;
    create(users, &fixtures::user("jsmith")).await;

    let request = SearchRequest::new().with_filter(format!(
        r#"{}:department sw "tour""#,
        fixtures::ENTERPRISE_SCHEMA
    ));
    let response = users.list_resources(&request).await.unwrap();
    assert_eq!(response.total_results, 1);
    assert_eq!(response.resources[0]["userName"], "bjensen");

    let request = SearchRequest::new()
        .with_filter(r#"emails[type eq "work" and value ew "example.com"]"#)
        .with_sort("userName", SortOrder::Ascending);
    let response = users.list_resources(&request).await.unwrap();
    let names: Vec<_> = response.resources.iter().map(|r| r["userName"].clone()).collect();
    assert_eq!(names, vec![json!("bjensen"), json!("jsmith")]);

    let request = SearchRequest::new()
        .with_filter("title pr")
        .with_selection(AttributeSelection::only(["userName"]));
    let response = users.list_resources(&request).await.unwrap();
    assert_eq!(response.total_results, 2);
    for resource in &response.resources {
        assert!(resource.get("title").is_none());
        assert!(resource.get("id").is_some());
    }
}

#[tokio::test]
async fn test_search_paging() {
    let endpoints = common::endpoints();
    let users = common::users(&endpoints);
    for name in ["u1", "u2", "u3", "u4", "u5"] {
        create(users, &fixtures::user(name)).await;
    }

    let body = json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:SearchRequest"],
        "sortBy": "userName",
        "sortOrder": "descending",
        "startIndex": 2,
        "count": 2
    });
    let response = users.search(&body.to_string()).await;
    assert_eq!(response.status, 200);
    let body = response.body.expect("list body");
    assert_eq!(body["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:ListResponse");
    assert_eq!(body["totalResults"], 5);
    assert_eq!(body["startIndex"], 2);
    assert_eq!(body["itemsPerPage"], 2);
    assert_eq!(body["Resources"][0]["userName"], "u4");
    assert_eq!(body["Resources"][1]["userName"], "u3");

    let response = users.search(r#"{"filter": "userName pr"}"#).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body.expect("error body")["scimType"], "invalidSyntax");
}
