//! Fluent construction of outbound filter strings.

use super::ast::{Connective, Literal, Operator};

/// Builds a filter in its canonical textual form.
///
/// Operands are grouped with parentheses exactly where needed to keep the
/// built structure under `and`-over-`or` precedence, so the text parses back
/// to the same shape.
///
/// ```rust
/// use scim_engine::filter::FilterBuilder;
///
/// let filter = FilterBuilder::eq("userName", "bjensen")
///     .and(FilterBuilder::present("title").or(FilterBuilder::eq("active", true)))
///     .build();
/// assert_eq!(filter, r#"userName eq "bjensen" and (title pr or active eq true)"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBuilder {
    text: String,
    top: Option<Connective>,
}

impl FilterBuilder {
    /// `path op value`
    pub fn compare(path: impl AsRef<str>, operator: Operator, value: impl Into<Literal>) -> Self {
        if operator == Operator::Pr {
            return Self::present(path);
        }
        Self::term(format!("{} {} {}", path.as_ref(), operator, value.into()))
    }

    pub fn eq(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Eq, value)
    }

    pub fn ne(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Ne, value)
    }

    pub fn co(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Co, value)
    }

    pub fn sw(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Sw, value)
    }

    pub fn ew(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Ew, value)
    }

    pub fn gt(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Gt, value)
    }

    pub fn ge(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Ge, value)
    }

    pub fn lt(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Lt, value)
    }

    pub fn le(path: impl AsRef<str>, value: impl Into<Literal>) -> Self {
        Self::compare(path, Operator::Le, value)
    }

    /// `path pr`
    pub fn present(path: impl AsRef<str>) -> Self {
        Self::term(format!("{} pr", path.as_ref()))
    }

    /// `path[inner]`
    pub fn value_path(path: impl AsRef<str>, inner: FilterBuilder) -> Self {
        Self::term(format!("{}[{}]", path.as_ref(), inner.text))
    }

    /// `not (inner)`
    pub fn not(inner: FilterBuilder) -> Self {
        Self::term(format!("not ({})", inner.text))
    }

    /// `(inner)`, kept as an explicit group
    pub fn group(inner: FilterBuilder) -> Self {
        Self::term(format!("({})", inner.text))
    }

    pub fn and(self, other: FilterBuilder) -> Self {
        // `or` operands would otherwise re-associate under `and`
        let left = self.wrap_if(|top| top == Connective::Or);
        let right = other.wrap_if(|top| top == Connective::Or || top == Connective::And);
        Self::join(left, Connective::And, right)
    }

    pub fn or(self, other: FilterBuilder) -> Self {
        let right = other.wrap_if(|top| top == Connective::Or);
        Self::join(self.text, Connective::Or, right)
    }

    /// The canonical filter text.
    pub fn build(self) -> String {
        self.text
    }

    fn term(text: String) -> Self {
        Self { text, top: None }
    }

    fn join(left: String, connective: Connective, right: String) -> Self {
        Self {
            text: format!("{} {} {}", left, connective, right),
            top: Some(connective),
        }
    }

    fn wrap_if(self, wrap: impl Fn(Connective) -> bool) -> String {
        match self.top {
            Some(top) if wrap(top) => format!("({})", self.text),
            _ => self.text,
        }
    }
}

impl std::fmt::Display for FilterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
