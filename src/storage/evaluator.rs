//! Evaluation of parsed filters against stored trees.

use std::cmp::Ordering;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::attribute::{Attribute, ScimResource, SimpleValue, lookup, parse_date_time};
use crate::error::{ScimError, ScimResult};
use crate::filter::{AttributePath, Connective, Expression, Filter, Literal, Operator};
use crate::manager::SortOrder;
use crate::schema::{AttributeSchema, ResolvedAttribute, ResourceTypeSchema, SchemaRegistry};

/// Matches resources of one type against filter ASTs.
#[derive(Debug, Clone, Copy)]
pub struct FilterEvaluator<'a> {
    registry: &'a SchemaRegistry,
    resource_type: &'a ResourceTypeSchema,
}

/// What attribute paths are read from: a whole resource, or one element of a
/// multi-valued complex attribute inside a value filter.
#[derive(Clone, Copy)]
enum Scope<'r> {
    Resource(&'r ScimResource),
    Element(&'r Attribute),
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(registry: &'a SchemaRegistry, resource_type: &'a ResourceTypeSchema) -> Self {
        Self {
            registry,
            resource_type,
        }
    }

    /// Whether `resource` satisfies `filter`.
    pub fn matches(&self, filter: &Filter, resource: &ScimResource) -> ScimResult<bool> {
        self.eval(filter, Scope::Resource(resource))
    }

    fn eval(&self, filter: &Filter, scope: Scope<'_>) -> ScimResult<bool> {
        match filter {
            Filter::Expression(expr) => self.eval_expression(expr, scope),
            Filter::Operation {
                connective: Connective::And,
                left,
                right,
            } => Ok(self.eval(left, scope)? && self.eval(right, scope)?),
            Filter::Operation {
                connective: Connective::Or,
                left,
                right,
            } => Ok(self.eval(left, scope)? || self.eval(right, scope)?),
            Filter::Group(inner) => self.eval(inner, scope),
            Filter::Not(inner) => Ok(!self.eval(inner, scope)?),
            Filter::ValuePath {
                attribute,
                filter,
                sub,
            } => {
                let (_, elements) = self.values(attribute, scope)?;
                for element in elements {
                    let inner = Scope::Element(element);
                    if !self.eval(filter, inner)? {
                        continue;
                    }
                    match sub {
                        Some(expr) if !self.eval_expression(expr, inner)? => continue,
                        _ => return Ok(true),
                    }
                }
                Ok(false)
            }
        }
    }

    fn eval_expression(&self, expr: &Expression, scope: Scope<'_>) -> ScimResult<bool> {
        let (attr, values) = self.values(&expr.attribute, scope)?;
        let present: Vec<&Attribute> = values.into_iter().filter(|v| !v.is_empty()).collect();

        let literal = match (&expr.operator, &expr.value) {
            (Operator::Pr, _) => return Ok(!present.is_empty()),
            (Operator::Eq, Some(Literal::Null)) => return Ok(present.is_empty()),
            (Operator::Ne, Some(Literal::Null)) => return Ok(!present.is_empty()),
            (_, Some(literal)) => literal,
            (_, None) => {
                return Err(ScimError::internal(format!(
                    "Operator '{}' without a comparison value",
                    expr.operator
                )));
            }
        };

        let simple: Vec<&SimpleValue> = present.iter().filter_map(|v| v.as_simple()).collect();
        if expr.operator == Operator::Ne {
            for value in &simple {
                if compare(value, Operator::Eq, literal, attr.case_exact)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        for value in simple {
            if compare(value, expr.operator, literal, attr.case_exact)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Values a path selects in `scope`, multi-valued attributes flattened to
    /// their elements.
    fn values<'r>(
        &self,
        path: &AttributePath,
        scope: Scope<'r>,
    ) -> ScimResult<(&'a AttributeSchema, Vec<&'r Attribute>)> {
        let resolved = self.registry.resolve_path(&path.uri, self.resource_type)?;
        let values = match scope {
            Scope::Resource(resource) => resource_values(resource, &resolved),
            Scope::Element(element) => {
                let mut values = Vec::new();
                if let Some(sub) = resolved.sub {
                    if let Some(value) = element.sub(&sub.name) {
                        values.push(value);
                    }
                }
                if let Some(sub_sub) = resolved.sub_sub {
                    values = descend(values, &sub_sub.name);
                }
                flatten(values)
            }
        };
        Ok((resolved.attribute(), values))
    }

    /// Order `resources` by the attribute at `sort_by`.
    ///
    /// Resources without a value sort last when ascending and first when
    /// descending. Multi-valued attributes sort by their primary value, or
    /// the first one when none is primary.
    pub fn sort(
        &self,
        resources: &mut [ScimResource],
        sort_by: &AttributePath,
        order: SortOrder,
    ) -> ScimResult<()> {
        let resolved = self.registry.resolve_path(&sort_by.uri, self.resource_type)?;
        let case_exact = resolved.attribute().case_exact;

        let mut keyed: Vec<(Option<SimpleValue>, ScimResource)> = resources
            .iter()
            .map(|resource| (sort_key(resource, &resolved), resource.clone()))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = match (a, b) {
                (Some(a), Some(b)) => order_values(a, b, case_exact),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        for (slot, (_, resource)) in resources.iter_mut().zip(keyed) {
            *slot = resource;
        }
        Ok(())
    }
}

fn resource_values<'r>(resource: &'r ScimResource, resolved: &ResolvedAttribute<'_>) -> Vec<&'r Attribute> {
    let container = if resolved.extension {
        resource.extension(resolved.schema_uri)
    } else {
        Some(&resource.attributes)
    };
    let mut values: Vec<&Attribute> = container
        .and_then(|members| lookup(members, &resolved.top.name))
        .into_iter()
        .collect();
    if let Some(sub) = resolved.sub {
        values = descend(values, &sub.name);
    }
    if let Some(sub_sub) = resolved.sub_sub {
        values = descend(values, &sub_sub.name);
    }
    flatten(values)
}

fn descend<'r>(values: Vec<&'r Attribute>, name: &str) -> Vec<&'r Attribute> {
    flatten(values)
        .into_iter()
        .filter_map(|value| value.sub(name))
        .collect()
}

fn flatten(values: Vec<&Attribute>) -> Vec<&Attribute> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Attribute::MultiValued(items) => out.extend(items.iter()),
            other => out.push(other),
        }
    }
    out
}

fn sort_key(resource: &ScimResource, resolved: &ResolvedAttribute<'_>) -> Option<SimpleValue> {
    let container = if resolved.extension {
        resource.extension(resolved.schema_uri)?
    } else {
        &resource.attributes
    };
    let top = lookup(container, &resolved.top.name)?;
    let top = match top {
        Attribute::MultiValued(items) => items
            .iter()
            .find(|item| item.is_primary())
            .or_else(|| items.first())?,
        other => other,
    };
    let mut values = vec![top];
    if let Some(sub) = resolved.sub {
        values = descend(values, &sub.name);
    }
    if let Some(sub_sub) = resolved.sub_sub {
        values = descend(values, &sub_sub.name);
    }
    flatten(values)
        .into_iter()
        .find_map(|value| value.as_simple())
        .cloned()
}

fn order_values(a: &SimpleValue, b: &SimpleValue, case_exact: bool) -> Ordering {
    match (a, b) {
        (SimpleValue::Integer(a), SimpleValue::Integer(b)) => a.cmp(b),
        (SimpleValue::Decimal(a), SimpleValue::Decimal(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (SimpleValue::Boolean(a), SimpleValue::Boolean(b)) => a.cmp(b),
        (SimpleValue::DateTime(a), SimpleValue::DateTime(b)) => a.cmp(b),
        (SimpleValue::Binary(a), SimpleValue::Binary(b)) => a.cmp(b),
        _ => match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) if case_exact => a.cmp(b),
            (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => Ordering::Equal,
        },
    }
}

/// Apply one comparison operator to a stored value and a filter literal.
fn compare(value: &SimpleValue, operator: Operator, literal: &Literal, case_exact: bool) -> ScimResult<bool> {
    let ordering = match (value, literal) {
        (SimpleValue::String(s) | SimpleValue::Reference(s), Literal::String(l)) => {
            return Ok(compare_strings(s, operator, l, case_exact));
        }
        (SimpleValue::Binary(bytes), Literal::String(l)) => {
            return Ok(compare_strings(&STANDARD.encode(bytes), operator, l, true));
        }
        (SimpleValue::Boolean(b), Literal::Boolean(l)) => b.cmp(l),
        (SimpleValue::Integer(i), Literal::Integer(l)) => i.cmp(l),
        (SimpleValue::Integer(i), Literal::Decimal(l)) => (*i as f64).partial_cmp(l).unwrap_or(Ordering::Less),
        (SimpleValue::Decimal(d), Literal::Decimal(l)) => d.partial_cmp(l).unwrap_or(Ordering::Less),
        (SimpleValue::Decimal(d), Literal::Integer(l)) => d.partial_cmp(&(*l as f64)).unwrap_or(Ordering::Less),
        (SimpleValue::DateTime(dt), Literal::String(l)) => dt.cmp(&parse_date_time(l)?),
        // Type mismatches never match
        _ => return Ok(false),
    };

    Ok(match operator {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Co | Operator::Sw | Operator::Ew | Operator::Pr => false,
    })
}

fn compare_strings(value: &str, operator: Operator, literal: &str, case_exact: bool) -> bool {
    let (value, literal) = if case_exact {
        (value.to_string(), literal.to_string())
    } else {
        (value.to_lowercase(), literal.to_lowercase())
    };
    match operator {
        Operator::Eq => value == literal,
        Operator::Ne => value != literal,
        Operator::Co => value.contains(&literal),
        Operator::Sw => value.starts_with(&literal),
        Operator::Ew => value.ends_with(&literal),
        Operator::Gt => value > literal,
        Operator::Ge => value >= literal,
        Operator::Lt => value < literal,
        Operator::Le => value <= literal,
        Operator::Pr => !value.is_empty(),
    }
}
