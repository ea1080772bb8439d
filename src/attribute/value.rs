//! Scalar attribute values and the fixed date-time profile.

use crate::error::{ScimError, ScimResult};
use crate::schema::DataType;

use chrono::{DateTime, NaiveDateTime, Utc};

/// The single ISO-8601 profile used for every `dateTime` value.
///
/// UTC only, `Z` suffix, fractional seconds optional. Encoding emits exactly
/// the precision the value carries, so decode and encode round-trip.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parse a `dateTime` string against [`DATE_TIME_FORMAT`].
pub fn parse_date_time(value: &str) -> ScimResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            ScimError::internal(format!(
                "Date-time value '{}' does not match {}: {}",
                value, DATE_TIME_FORMAT, e
            ))
        })
}

/// Format a `dateTime` value with [`DATE_TIME_FORMAT`].
pub fn format_date_time(value: &DateTime<Utc>) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// One scalar value of a declared SCIM data type.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleValue {
    String(String),
    Boolean(bool),
    Decimal(f64),
    Integer(i64),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    Reference(String),
}

impl SimpleValue {
    /// Data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Boolean(_) => DataType::Boolean,
            Self::Decimal(_) => DataType::Decimal,
            Self::Integer(_) => DataType::Integer,
            Self::DateTime(_) => DataType::DateTime,
            Self::Binary(_) => DataType::Binary,
            Self::Reference(_) => DataType::Reference,
        }
    }

    /// Text of a string or reference value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Reference(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value counts as absent for `required` checks.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) | Self::Reference(s) => s.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for SimpleValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SimpleValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for SimpleValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for SimpleValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<DateTime<Utc>> for SimpleValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}
