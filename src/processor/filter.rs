use std::cmp::Ordering;
use tracing::debug;

use crate::processor::{
    EngineError, FilterPredicate, Value,
    column::ColumnType,
    dataset::Dataset,
    group_key::{BoundKey, KeyExpr},
};

/// Conjunction of predicates over raw or derived fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    clauses: Vec<(KeyExpr, FilterPredicate)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate over a key expression
    pub fn with(mut self, key: KeyExpr, predicate: FilterPredicate) -> Self {
        self.clauses.push((key, predicate));
        self
    }

    /// Adds a predicate over a raw field
    pub fn field(self, name: &str, predicate: FilterPredicate) -> Self {
        self.with(KeyExpr::field(name), predicate)
    }

    pub fn push(&mut self, key: KeyExpr, predicate: FilterPredicate) {
        self.clauses.push((key, predicate));
    }

    pub fn clauses(&self) -> &[(KeyExpr, FilterPredicate)] {
        &self.clauses
    }

    /// Row indices of `dataset` that satisfy every clause
    pub fn apply(&self, dataset: &Dataset) -> Result<Vec<usize>, EngineError> {
        let all: Vec<usize> = (0..dataset.row_count()).collect();
        self.apply_to(dataset, &all)
    }

    /// Keeps the rows of `rows` that satisfy every clause, preserving order
    ///
    /// # Errors
    /// [`EngineError::Schema`] / [`EngineError::Type`] if a clause references
    /// an unknown field or an unsuitable column, even when `rows` is empty.
    pub fn apply_to(&self, dataset: &Dataset, rows: &[usize]) -> Result<Vec<usize>, EngineError> {
        let bound = self
            .clauses
            .iter()
            .map(|(key, predicate)| {
                let key = key.bind(dataset)?;
                let predicate = coerce_predicate(predicate, key.value_type());
                Ok((key, predicate))
            })
            .collect::<Result<Vec<(BoundKey<'_>, FilterPredicate)>, EngineError>>()?;

        let out: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&row| {
                bound.iter().all(|(key, predicate)| {
                    key.value(row)
                        .is_some_and(|value| predicate_matches(predicate, &value))
                })
            })
            .collect();

        debug!(
            clauses = self.clauses.len(),
            input = rows.len(),
            matched = out.len(),
            "Applied filter"
        );
        Ok(out)
    }
}

/// String literals from a UI are parsed into the key's type when possible
fn coerce_value(value: &Value, ty: ColumnType) -> Value {
    match value {
        Value::Str(text) if ty != ColumnType::Str => ty.parse(text).unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn coerce_predicate(predicate: &FilterPredicate, ty: ColumnType) -> FilterPredicate {
    match predicate {
        FilterPredicate::Equals(v) => FilterPredicate::Equals(coerce_value(v, ty)),
        FilterPredicate::GreaterThan(v) => FilterPredicate::GreaterThan(coerce_value(v, ty)),
        FilterPredicate::LessThan(v) => FilterPredicate::LessThan(coerce_value(v, ty)),
        FilterPredicate::Between(lo, hi) => {
            FilterPredicate::Between(coerce_value(lo, ty), coerce_value(hi, ty))
        }
        FilterPredicate::In(values) => {
            FilterPredicate::In(values.iter().map(|v| coerce_value(v, ty)).collect())
        }
    }
}

fn predicate_matches(predicate: &FilterPredicate, value: &Value) -> bool {
    match predicate {
        FilterPredicate::Equals(target) => value.partial_compare(target) == Some(Ordering::Equal),
        FilterPredicate::GreaterThan(target) => {
            value.partial_compare(target) == Some(Ordering::Greater)
        }
        FilterPredicate::LessThan(target) => value.partial_compare(target) == Some(Ordering::Less),
        FilterPredicate::Between(lo, hi) => {
            matches!(
                value.partial_compare(lo),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                value.partial_compare(hi),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        FilterPredicate::In(set) => set
            .iter()
            .any(|target| value.partial_compare(target) == Some(Ordering::Equal)),
    }
}
