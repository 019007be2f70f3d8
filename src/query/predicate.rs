use serde_json::Value;
use std::cmp::Ordering;

use super::error::QueryError;
use super::params::{FilterRequest, RawParam};
use super::types::{ComparisonOp, FieldCondition, Predicate};
use crate::database::document::{compare_values, comparable, lookup, values_equal, Document};
use crate::database::models::CollectionSchema;

impl Predicate {
    /// Build the typed predicate for every non-control parameter of `request`.
    ///
    /// `field=v` is equality, a repeated `field=a&field=b` is set membership,
    /// and `field[op]=v` uses one of the bracketed comparison operators. `in`
    /// values are comma-separated. Values are cast by the collection schema.
    pub fn from_request(request: &FilterRequest, schema: &CollectionSchema) -> Result<Self, QueryError> {
        let mut predicate = Predicate::all();
        for (field, param) in request.filters() {
            validate_field_name(field)?;
            parse_field_conditions(field, param, schema, &mut predicate)?;
        }
        Ok(predicate)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

impl FieldCondition {
    /// Array-valued document fields match when any element matches.
    /// Only equality against an array value compares the whole array.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = lookup(doc, &self.field) else {
            return false;
        };
        match actual {
            Value::Array(items) if self.op != ComparisonOp::Eq || !self.value.is_array() => {
                items.iter().any(|item| self.matches_value(item))
            }
            _ => self.matches_value(actual),
        }
    }

    fn matches_value(&self, actual: &Value) -> bool {
        let ordered = |accept: fn(Ordering) -> bool| {
            comparable(actual, &self.value) && accept(compare_values(Some(actual), Some(&self.value)))
        };
        match self.op {
            ComparisonOp::Eq => values_equal(actual, &self.value),
            ComparisonOp::Gt => ordered(|o| o == Ordering::Greater),
            ComparisonOp::Gte => ordered(|o| o != Ordering::Less),
            ComparisonOp::Lt => ordered(|o| o == Ordering::Less),
            ComparisonOp::Lte => ordered(|o| o != Ordering::Greater),
            ComparisonOp::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
                other => values_equal(actual, other),
            },
        }
    }
}

fn parse_field_conditions(
    field: &str,
    param: &RawParam,
    schema: &CollectionSchema,
    predicate: &mut Predicate,
) -> Result<(), QueryError> {
    match param.values.as_slice() {
        [] => {}
        [single] => predicate.conditions.push(FieldCondition::new(field, ComparisonOp::Eq, schema.cast(field, single)?)),
        many => {
            let values = many.iter().map(|v| schema.cast(field, v)).collect::<Result<Vec<_>, _>>()?;
            predicate.conditions.push(FieldCondition::new(field, ComparisonOp::In, Value::Array(values)));
        }
    }

    for (token, raw_values) in &param.operators {
        let op = ComparisonOp::from_token(token).ok_or_else(|| QueryError::UnsupportedOperator {
            field: field.to_string(),
            operator: token.clone(),
        })?;

        let value = if op == ComparisonOp::In {
            let values = raw_values
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| schema.cast(field, v))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(values)
        } else {
            match raw_values.as_slice() {
                [single] => schema.cast(field, single)?,
                _ => {
                    return Err(QueryError::InvalidValue {
                        field: field.to_string(),
                        value: raw_values.join(","),
                        expected: "a single value",
                    })
                }
            }
        };
        predicate.conditions.push(FieldCondition::new(field, op, value));
    }
    Ok(())
}

fn validate_field_name(field: &str) -> Result<(), QueryError> {
    let valid = !field.is_empty()
        && field.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidField(field.to_string()))
    }
}
