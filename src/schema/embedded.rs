//! Embedded core SCIM schemas.
//!
//! The core User, Group and ResourceType schemas plus the Enterprise User
//! extension, embedded as static JSON documents so a registry can be built
//! without any schema files on disk.

/// Core User schema URI
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// Core Group schema URI
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
/// Enterprise User extension schema URI
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
/// ResourceType schema URI
pub const RESOURCE_TYPE_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";

/// Returns the core User schema as a JSON string.
pub fn core_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    {"name": "id", "type": "string", "caseExact": true, "mutability": "readOnly", "returned": "always", "uniqueness": "server"},
    {"name": "externalId", "type": "string", "caseExact": true, "mutability": "readWrite", "returned": "default"},
    {"name": "userName", "type": "string", "required": true, "mutability": "readWrite", "returned": "default", "uniqueness": "server"},
    {
      "name": "name", "type": "complex", "mutability": "readWrite", "returned": "default",
      "subAttributes": [
        {"name": "formatted", "type": "string"},
        {"name": "familyName", "type": "string"},
        {"name": "givenName", "type": "string"},
        {"name": "middleName", "type": "string"},
        {"name": "honorificPrefix", "type": "string"},
        {"name": "honorificSuffix", "type": "string"}
      ]
    },
    {"name": "displayName", "type": "string"},
    {"name": "nickName", "type": "string"},
    {"name": "profileUrl", "type": "reference", "referenceTypes": ["external"]},
    {"name": "title", "type": "string"},
    {"name": "userType", "type": "string"},
    {"name": "preferredLanguage", "type": "string"},
    {"name": "locale", "type": "string"},
    {"name": "timezone", "type": "string"},
    {"name": "active", "type": "boolean"},
    {"name": "password", "type": "string", "mutability": "writeOnly", "returned": "never"},
    {
      "name": "emails", "type": "complex", "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string"},
        {"name": "display", "type": "string"},
        {"name": "type", "type": "string", "canonicalValues": ["work", "home", "other"]},
        {"name": "primary", "type": "boolean"}
      ]
    },
    {
      "name": "phoneNumbers", "type": "complex", "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string"},
        {"name": "display", "type": "string"},
        {"name": "type", "type": "string", "canonicalValues": ["work", "home", "mobile", "fax", "pager", "other"]},
        {"name": "primary", "type": "boolean"}
      ]
    },
    {
      "name": "addresses", "type": "complex", "multiValued": true,
      "subAttributes": [
        {"name": "formatted", "type": "string"},
        {"name": "streetAddress", "type": "string"},
        {"name": "locality", "type": "string"},
        {"name": "region", "type": "string"},
        {"name": "postalCode", "type": "string"},
        {"name": "country", "type": "string"},
        {"name": "type", "type": "string", "canonicalValues": ["work", "home", "other"]},
        {"name": "primary", "type": "boolean"}
      ]
    },
    {
      "name": "groups", "type": "complex", "multiValued": true, "mutability": "readOnly",
      "subAttributes": [
        {"name": "value", "type": "string", "mutability": "readOnly"},
        {"name": "$ref", "type": "reference", "referenceTypes": ["User", "Group"], "mutability": "readOnly"},
        {"name": "display", "type": "string", "mutability": "readOnly"},
        {"name": "type", "type": "string", "canonicalValues": ["direct", "indirect"], "mutability": "readOnly"}
      ]
    },
    {
      "name": "x509Certificates", "type": "complex", "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "binary", "caseExact": true},
        {"name": "display", "type": "string"},
        {"name": "type", "type": "string"},
        {"name": "primary", "type": "boolean"}
      ]
    },
    {
      "name": "meta", "type": "complex", "mutability": "readOnly",
      "subAttributes": [
        {"name": "resourceType", "type": "string", "caseExact": true, "mutability": "readOnly"},
        {"name": "created", "type": "dateTime", "mutability": "readOnly"},
        {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
        {"name": "location", "type": "reference", "caseExact": true, "mutability": "readOnly", "referenceTypes": ["uri"]},
        {"name": "version", "type": "string", "caseExact": true, "mutability": "readOnly"}
      ]
    }
  ]
}"#
}

/// Returns the core Group schema as a JSON string.
pub fn core_group_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Group",
  "name": "Group",
  "description": "Group",
  "attributes": [
    {"name": "id", "type": "string", "caseExact": true, "mutability": "readOnly", "returned": "always", "uniqueness": "server"},
    {"name": "externalId", "type": "string", "caseExact": true},
    {"name": "displayName", "type": "string", "required": true},
    {
      "name": "members", "type": "complex", "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "mutability": "immutable"},
        {"name": "$ref", "type": "reference", "referenceTypes": ["User", "Group"], "mutability": "immutable"},
        {"name": "display", "type": "string"},
        {"name": "type", "type": "string", "canonicalValues": ["User", "Group"], "mutability": "immutable"}
      ]
    },
    {
      "name": "meta", "type": "complex", "mutability": "readOnly",
      "subAttributes": [
        {"name": "resourceType", "type": "string", "caseExact": true, "mutability": "readOnly"},
        {"name": "created", "type": "dateTime", "mutability": "readOnly"},
        {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
        {"name": "location", "type": "reference", "caseExact": true, "mutability": "readOnly", "referenceTypes": ["uri"]},
        {"name": "version", "type": "string", "caseExact": true, "mutability": "readOnly"}
      ]
    }
  ]
}"#
}

/// Returns the Enterprise User extension schema as a JSON string.
pub fn enterprise_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
  "name": "EnterpriseUser",
  "description": "Enterprise User",
  "attributes": [
    {"name": "employeeNumber", "type": "string"},
    {"name": "costCenter", "type": "string"},
    {"name": "organization", "type": "string"},
    {"name": "division", "type": "string"},
    {"name": "department", "type": "string"},
    {
      "name": "manager", "type": "complex",
      "subAttributes": [
        {"name": "value", "type": "string"},
        {"name": "$ref", "type": "reference", "referenceTypes": ["User"]},
        {"name": "displayName", "type": "string", "mutability": "readOnly"}
      ]
    }
  ]
}"#
}

/// Returns the ResourceType schema as a JSON string.
pub fn resource_type_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:ResourceType",
  "name": "ResourceType",
  "description": "Specifies the schema that describes a SCIM resource type",
  "attributes": [
    {"name": "id", "type": "string", "mutability": "readOnly", "returned": "always"},
    {"name": "name", "type": "string", "required": true, "mutability": "readOnly"},
    {"name": "description", "type": "string", "mutability": "readOnly"},
    {"name": "endpoint", "type": "reference", "required": true, "mutability": "readOnly", "referenceTypes": ["uri"]},
    {"name": "schema", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly", "referenceTypes": ["uri"]},
    {
      "name": "schemaExtensions", "type": "complex", "multiValued": true, "mutability": "readOnly",
      "subAttributes": [
        {"name": "schema", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly", "referenceTypes": ["uri"]},
        {"name": "required", "type": "boolean", "required": true, "mutability": "readOnly"}
      ]
    }
  ]
}"#
}
