//! Request bodies used across the integration tests.

use serde_json::{Value, json};

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// RFC 7643 examples as constants for easy reference
pub mod rfc_examples {
    use super::*;

    /// RFC 7643 Section 8.1 - Minimal User representation
    pub fn user_minimal() -> Value {
        json!({
            "schemas": [USER_SCHEMA],
            "id": "2819c223-7f76-453a-919d-413861904646",
            "userName": "bjensen@example.com",
            "meta": {
                "resourceType": "User",
                "created": "2010-01-23T04:56:22Z",
                "lastModified": "2011-05-13T04:42:34Z",
                "version": "W/\"3694e05e9dff590\"",
                "location": "https://example.com/v2/Users/2819c223-7f76-453a-919d-413861904646"
            }
        })
    }

    /// RFC 7643 Section 8.4 - Group representation
    pub fn group() -> Value {
        json!({
            "schemas": [GROUP_SCHEMA],
            "id": "e9e30dba-f08f-4109-8486-d5c6a331660a",
            "displayName": "Tour Guides",
            "members": [
                {
                    "value": "2819c223-7f76-453a-919d-413861904646",
                    "$ref": "https://example.com/v2/Users/2819c223-7f76-453a-919d-413861904646",
                    "display": "Babs Jensen"
                },
                {
                    "value": "902c246b-6245-4190-8e05-00816be7344a",
                    "$ref": "https://example.com/v2/Users/902c246b-6245-4190-8e05-00816be7344a",
                    "display": "Mandy Pepperidge"
                }
            ]
        })
    }

    /// RFC 7643 Section 8.3 - Enterprise User, trimmed to the attributes the
    /// tests look at
    pub fn enterprise_user() -> Value {
        json!({
            "schemas": [USER_SCHEMA, ENTERPRISE_SCHEMA],
            "userName": "bjensen",
            "name": {"familyName": "Jensen", "givenName": "Barbara"},
            "emails": [
                {"value": "bjensen@example.com", "type": "work", "primary": true},
                {"value": "babs@jensen.org", "type": "home"}
            ],
            "title": "Tour Guide",
            "active": true,
            ENTERPRISE_SCHEMA: {
                "employeeNumber": "701984",
                "department": "Tour Operations"
            }
        })
    }
}

/// A client-side create body for a user.
pub fn user(user_name: &str) -> Value {
    json!({
        "schemas": [USER_SCHEMA],
        "userName": user_name,
        "emails": [{"value": format!("{}@example.com", user_name), "type": "work"}]
    })
}

/// A user body with extra attributes merged in.
pub fn user_with(user_name: &str, extra: Value) -> Value {
    let mut body = user(user_name);
    if let (Some(target), Value::Object(members)) = (body.as_object_mut(), extra) {
        target.extend(members);
    }
    body
}

/// A client-side create body for a group with the given member ids.
pub fn group(display_name: &str, members: &[&str]) -> Value {
    json!({
        "schemas": [GROUP_SCHEMA],
        "displayName": display_name,
        "members": members
            .iter()
            .map(|id| json!({"value": id, "type": "User"}))
            .collect::<Vec<_>>()
    })
}

pub fn bulk(operations: Vec<Value>) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
        "Operations": operations
    })
}

pub fn patch(operations: Vec<Value>) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": operations
    })
}
