//! Filter AST.
//!
//! Nodes are built fresh per filter string and never mutated afterwards. The
//! `Display` impls render the canonical textual form: parsing that text again
//! yields a structurally equal tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed, schema-resolved filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `attrPath op value` or `attrPath pr`
    Expression(Expression),
    /// `left and right`, `left or right`
    Operation {
        connective: Connective,
        left: Box<Filter>,
        right: Box<Filter>,
    },
    /// Parenthesized sub-filter
    Group(Box<Filter>),
    /// `not (filter)`
    Not(Box<Filter>),
    /// `attrPath[filter]` over the elements of a multi-valued complex attribute,
    /// optionally followed by `.sub op value` tested on the matching elements
    ValuePath {
        attribute: AttributePath,
        filter: Box<Filter>,
        sub: Option<Expression>,
    },
}

impl Filter {
    pub fn and(left: Filter, right: Filter) -> Self {
        Self::Operation {
            connective: Connective::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Self::Operation {
            connective: Connective::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Every attribute path the filter references, depth first.
    pub fn attributes(&self) -> Vec<&AttributePath> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a AttributePath>) {
        match self {
            Self::Expression(expr) => out.push(&expr.attribute),
            Self::Operation { left, right, .. } => {
                left.collect_attributes(out);
                right.collect_attributes(out);
            }
            Self::Group(inner) | Self::Not(inner) => inner.collect_attributes(out),
            Self::ValuePath {
                attribute,
                filter,
                sub,
            } => {
                out.push(attribute);
                filter.collect_attributes(out);
                if let Some(expr) = sub {
                    out.push(&expr.attribute);
                }
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(expr) => write!(f, "{}", expr),
            Self::Operation {
                connective,
                left,
                right,
            } => write!(f, "{} {} {}", left, connective, right),
            Self::Group(inner) => write!(f, "({})", inner),
            Self::Not(inner) => write!(f, "not ({})", inner),
            Self::ValuePath {
                attribute,
                filter,
                sub: None,
            } => write!(f, "{}[{}]", attribute, filter),
            Self::ValuePath {
                attribute,
                filter,
                sub: Some(expr),
            } => write!(f, "{}[{}].{}", attribute, filter, expr),
        }
    }
}

/// A single comparison or presence test.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub attribute: AttributePath,
    pub operator: Operator,
    /// Comparison literal; `None` exactly when the operator is `pr`
    pub value: Option<Literal>,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.attribute, self.operator, value),
            None => write!(f, "{} {}", self.attribute, self.operator),
        }
    }
}

/// An attribute reference as written, plus the canonical URI it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// Path as it appeared in the filter text
    pub path: String,
    /// Canonical attribute URI, e.g. `urn:...:User:emails.type`
    pub uri: String,
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Logical connectives; `and` binds tighter than `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Present (has value)
    Pr,
}

impl Operator {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "co" => Some(Self::Co),
            "sw" => Some(Self::Sw),
            "ew" => Some(Self::Ew),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "pr" => Some(Self::Pr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Co => "co",
            Self::Sw => "sw",
            Self::Ew => "ew",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Pr => "pr",
        }
    }

    /// Substring operators: `co`, `sw`, `ew`.
    pub fn is_substring(&self) -> bool {
        matches!(self, Self::Co | Self::Sw | Self::Ew)
    }

    /// Ordering operators: `gt`, `ge`, `lt`, `le`.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            // Debug keeps a fractional part or exponent so the value re-parses as decimal
            Self::Decimal(d) => write!(f, "{:?}", d),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}
