//! Recursive-descent filter parser with parse-time schema resolution.
//!
//! ## Grammar
//!
//! ```text
//! filter     = andExpr { "or" andExpr }
//! andExpr    = term { "and" term }
//! term       = "not" "(" filter ")" | "(" filter ")" | attrExpr | valuePath
//! valuePath  = attrPath "[" filter "]" [ "." ATTRNAME ( "pr" | compareOp compValue ) ]
//! attrExpr   = attrPath "pr" | attrPath compareOp compValue
//! compareOp  = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! compValue  = "true" | "false" | "null" | NUMBER | STRING
//! ```
//!
//! Keywords and operators are case-insensitive. Every attribute path is
//! resolved through the [`SchemaRegistry`] while parsing, and operator and
//! literal are checked against the attribute's data type, so a returned
//! [`Filter`] is always schema-valid.

use super::ast::{AttributePath, Expression, Filter, Literal, Operator};
use crate::attribute::parse_date_time;
use crate::config::FilterConfig;
use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeSchema, DataType, ResourceTypeSchema, SchemaRegistry};

/// Parse `input` against `resource_type` with the default limits.
pub fn parse_filter(
    input: &str,
    registry: &SchemaRegistry,
    resource_type: &ResourceTypeSchema,
) -> ScimResult<Filter> {
    FilterParser::new(registry, resource_type).parse(input)
}

/// Schema-aware filter parser for one resource type.
#[derive(Debug, Clone)]
pub struct FilterParser<'a> {
    registry: &'a SchemaRegistry,
    resource_type: &'a ResourceTypeSchema,
    limits: FilterConfig,
}

impl<'a> FilterParser<'a> {
    pub fn new(registry: &'a SchemaRegistry, resource_type: &'a ResourceTypeSchema) -> Self {
        Self {
            registry,
            resource_type,
            limits: FilterConfig::default(),
        }
    }

    /// Override the length and nesting limits.
    pub fn with_limits(mut self, limits: FilterConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a filter expression.
    ///
    /// # Errors
    ///
    /// Returns a `400 invalidFilter` error if the input exceeds the configured
    /// length or nesting depth, is syntactically invalid, names an attribute
    /// that does not resolve, or compares an attribute with an operator or
    /// literal its data type does not support.
    pub fn parse(&self, input: &str) -> ScimResult<Filter> {
        if input.len() > self.limits.max_length {
            return Err(ScimError::invalid_filter(format!(
                "Filter exceeds maximum length ({} bytes, max {})",
                input.len(),
                self.limits.max_length
            )));
        }
        if input.trim().is_empty() {
            return Err(ScimError::invalid_filter("Filter is empty"));
        }

        let mut cursor = Cursor {
            parser: self,
            input,
            position: 0,
            depth: 0,
        };
        let filter = cursor.parse_or(None)?;

        cursor.skip_whitespace();
        if cursor.position < input.len() {
            return Err(cursor.error(format!("Unexpected input: '{}'", &input[cursor.position..])));
        }
        Ok(filter)
    }

    fn resolve(&self, path: &str, parent: Option<&'a AttributeSchema>) -> ScimResult<&'a AttributeSchema> {
        let resolved = match parent {
            Some(parent) => self.registry.resolve_sub_attribute(parent, path).ok(),
            None => self.registry.resolve_attribute(path, self.resource_type).ok(),
        };
        resolved.ok_or_else(|| ScimError::invalid_filter(format!("Unresolved attribute '{}'", path)))
    }
}

struct Cursor<'p, 'a> {
    parser: &'p FilterParser<'a>,
    input: &'p str,
    position: usize,
    depth: usize,
}

impl<'p, 'a> Cursor<'p, 'a> {
    fn error(&self, message: impl Into<String>) -> ScimError {
        ScimError::invalid_filter(format!("{} at position {}", message.into(), self.position))
    }

    fn enter_scope(&mut self) -> ScimResult<()> {
        self.depth += 1;
        if self.depth > self.parser.limits.max_depth {
            return Err(self.error(format!(
                "Filter exceeds maximum nesting depth ({})",
                self.parser.limits.max_depth
            )));
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // filter = andExpr { "or" andExpr }
    fn parse_or(&mut self, parent: Option<&'a AttributeSchema>) -> ScimResult<Filter> {
        let mut left = self.parse_and(parent)?;
        while self.try_keyword("or") {
            let right = self.parse_and(parent)?;
            left = Filter::or(left, right);
        }
        Ok(left)
    }

    // andExpr = term { "and" term }
    fn parse_and(&mut self, parent: Option<&'a AttributeSchema>) -> ScimResult<Filter> {
        let mut left = self.parse_term(parent)?;
        while self.try_keyword("and") {
            let right = self.parse_term(parent)?;
            left = Filter::and(left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self, parent: Option<&'a AttributeSchema>) -> ScimResult<Filter> {
        self.skip_whitespace();

        if self.try_keyword("not") {
            self.skip_whitespace();
            if !self.try_char('(') {
                return Err(self.error("Expected '(' after 'not'"));
            }
            let inner = self.parse_nested(parent, ')')?;
            return Ok(Filter::Not(Box::new(inner)));
        }

        if self.try_char('(') {
            let inner = self.parse_nested(parent, ')')?;
            return Ok(Filter::Group(Box::new(inner)));
        }

        self.parse_attr_expr(parent)
    }

    fn parse_nested(&mut self, parent: Option<&'a AttributeSchema>, close: char) -> ScimResult<Filter> {
        self.enter_scope()?;
        let inner = self.parse_or(parent)?;
        self.exit_scope();
        self.skip_whitespace();
        if !self.try_char(close) {
            return Err(self.error(format!("Expected '{}'", close)));
        }
        Ok(inner)
    }

    fn parse_attr_expr(&mut self, parent: Option<&'a AttributeSchema>) -> ScimResult<Filter> {
        let path = self.parse_attr_path()?;
        let attr = self.parser.resolve(&path, parent)?;
        let attribute = AttributePath {
            path,
            uri: attr.uri.clone(),
        };

        if self.try_char('[') {
            if parent.is_some() {
                return Err(self.error("Value filters cannot be nested"));
            }
            if !attr.is_complex() || !attr.multi_valued {
                return Err(ScimError::invalid_filter(format!(
                    "'{}' is not a multi-valued complex attribute",
                    attribute.path
                )));
            }
            let filter = self.parse_nested(Some(attr), ']')?;
            let sub = if self.try_char('.') {
                let path = self.parse_attr_path()?;
                let sub_attr = self.parser.resolve(&path, Some(attr))?;
                let sub_path = AttributePath {
                    path,
                    uri: sub_attr.uri.clone(),
                };
                Some(self.parse_comparison(sub_attr, sub_path)?)
            } else {
                None
            };
            return Ok(Filter::ValuePath {
                attribute,
                filter: Box::new(filter),
                sub,
            });
        }

        self.parse_comparison(attr, attribute).map(Filter::Expression)
    }

    fn parse_comparison(&mut self, attr: &AttributeSchema, attribute: AttributePath) -> ScimResult<Expression> {
        let operator = self.parse_operator()?;
        if operator == Operator::Pr {
            return Ok(Expression {
                attribute,
                operator,
                value: None,
            });
        }

        let value = self.parse_literal()?;
        check_operands(attr, &attribute.path, operator, &value)?;
        Ok(Expression {
            attribute,
            operator,
            value: Some(value),
        })
    }

    fn parse_attr_path(&mut self) -> ScimResult<String> {
        self.skip_whitespace();
        let start = self.position;

        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '$') {
            return Err(self.error("Expected attribute name"));
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$' | ':' | '.'))
        {
            self.advance();
        }
        Ok(self.input[start..self.position].to_string())
    }

    fn parse_operator(&mut self) -> ScimResult<Operator> {
        self.skip_whitespace();
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        let word = &self.input[start..self.position];
        Operator::parse(word).ok_or_else(|| {
            ScimError::invalid_filter(format!("Unknown operator '{}' at position {}", word, start))
        })
    }

    fn parse_literal(&mut self) -> ScimResult<Literal> {
        self.skip_whitespace();

        if self.peek() == Some('"') {
            return self.parse_string();
        }
        if self.try_keyword("true") {
            return Ok(Literal::Boolean(true));
        }
        if self.try_keyword("false") {
            return Ok(Literal::Boolean(false));
        }
        if self.try_keyword("null") {
            return Ok(Literal::Null);
        }
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return self.parse_number();
        }

        Err(self.error("Expected value (string, boolean, number, or null)"))
    }

    fn parse_string(&mut self) -> ScimResult<Literal> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated string")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => return Err(self.error("Invalid escape sequence")),
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(Literal::String(value))
    }

    fn parse_number(&mut self) -> ScimResult<Literal> {
        let start = self.position;
        let mut fractional = false;

        if matches!(self.peek(), Some('-' | '+')) {
            self.advance();
        }
        self.skip_digits();
        if self.peek() == Some('.') {
            fractional = true;
            self.advance();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            fractional = true;
            self.advance();
            if matches!(self.peek(), Some('-' | '+')) {
                self.advance();
            }
            self.skip_digits();
        }

        let text = &self.input[start..self.position];
        let literal = if fractional {
            text.parse::<f64>().ok().filter(|n| n.is_finite()).map(Literal::Decimal)
        } else {
            text.parse().ok().map(Literal::Integer)
        };
        literal.ok_or_else(|| {
            ScimError::invalid_filter(format!("Invalid number '{}' at position {}", text, start))
        })
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let remaining = &self.input[self.position..];

        let matches = remaining
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword));
        // keyword must not be the prefix of a longer identifier
        let boundary = remaining
            .get(keyword.len()..)
            .and_then(|rest| rest.chars().next())
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));

        if matches && boundary {
            self.position += keyword.len();
            true
        } else {
            false
        }
    }
}

fn check_operands(attr: &AttributeSchema, path: &str, operator: Operator, value: &Literal) -> ScimResult<()> {
    let unsupported = || {
        ScimError::invalid_filter(format!(
            "Operator '{}' is not supported for {} attribute '{}'",
            operator,
            attr.data_type.as_str(),
            path
        ))
    };
    let mismatch = || {
        ScimError::invalid_filter(format!(
            "Value {} does not match {} attribute '{}'",
            value,
            attr.data_type.as_str(),
            path
        ))
    };

    if matches!(value, Literal::Null) {
        return match operator {
            Operator::Eq | Operator::Ne => Ok(()),
            _ => Err(unsupported()),
        };
    }

    match attr.data_type {
        DataType::Complex => Err(unsupported()),
        DataType::String | DataType::Reference => match value {
            Literal::String(_) => Ok(()),
            _ => Err(mismatch()),
        },
        DataType::Binary => match (operator, value) {
            (Operator::Eq | Operator::Ne, Literal::String(_)) => Ok(()),
            (Operator::Eq | Operator::Ne, _) => Err(mismatch()),
            _ => Err(unsupported()),
        },
        DataType::Boolean => match (operator, value) {
            (Operator::Eq | Operator::Ne, Literal::Boolean(_)) => Ok(()),
            (Operator::Eq | Operator::Ne, _) => Err(mismatch()),
            _ => Err(unsupported()),
        },
        DataType::Integer | DataType::Decimal if operator.is_substring() => Err(unsupported()),
        DataType::Integer => match value {
            Literal::Integer(_) => Ok(()),
            _ => Err(mismatch()),
        },
        DataType::Decimal => match value {
            Literal::Integer(_) | Literal::Decimal(_) => Ok(()),
            _ => Err(mismatch()),
        },
        DataType::DateTime if operator.is_substring() => Err(unsupported()),
        DataType::DateTime => match value {
            Literal::String(text) if parse_date_time(text).is_ok() => Ok(()),
            _ => Err(mismatch()),
        },
    }
}
