use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dashboard::{metric::Metric, overlay::Overlay};
use crate::processor::{FilterPredicate, FilterSpec, KeyExpr, SortPolicy, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Ranked sort policy on the given measure
    pub fn policy(self, measure: usize) -> SortPolicy {
        match self {
            SortOrder::Ascending => SortPolicy::Ascending(measure),
            SortOrder::Descending => SortPolicy::Descending(measure),
        }
    }
}

/// Current state of a dashboard's form controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    /// Inclusive `(start, end)` year bounds
    pub year_range: Option<(i64, i64)>,
    /// Allowed values per categorical field; an empty list matches nothing
    pub categories: BTreeMap<String, Vec<String>>,
    pub metric: Metric,
    pub overlay: Overlay,
    pub sort: SortOrder,
    pub top_n: Option<usize>,
}

impl Selections {
    /// Predicates for the current selections. The year range applies to
    /// `year_field` and is ignored when the dashboard has none.
    pub fn filter_spec(&self, year_field: Option<&str>) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if let (Some((start, end)), Some(field)) = (self.year_range, year_field) {
            spec.push(
                KeyExpr::year(field),
                FilterPredicate::Between(Value::Int(start), Value::Int(end)),
            );
        }
        for (field, values) in &self.categories {
            spec.push(
                KeyExpr::field(field),
                FilterPredicate::In(values.iter().map(|v| Value::from(v.as_str())).collect()),
            );
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_spec_from_selections() {
        let mut selections = Selections {
            year_range: Some((2014, 2016)),
            ..Selections::default()
        };
        selections
            .categories
            .insert("BOROUGH".to_string(), vec!["QUEENS".to_string()]);

        let spec = selections.filter_spec(Some("CRASH DATE"));
        assert_eq!(spec.clauses().len(), 2);
        assert_eq!(spec.clauses()[0].0, KeyExpr::year("CRASH DATE"));

        assert_eq!(selections.filter_spec(None).clauses().len(), 1);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let selections: Selections = toml::from_str(
            r#"
            year_range = [2014, 2016]
            metric = "persons_injured"
            sort = "ascending"
            top_n = 5

            [categories]
            BOROUGH = ["QUEENS", "BRONX"]

            [overlay]
            sd_band = true
            "#,
        )
        .unwrap();
        assert_eq!(selections.year_range, Some((2014, 2016)));
        assert_eq!(selections.metric, Metric::PersonsInjured);
        assert_eq!(selections.sort, SortOrder::Ascending);
        assert_eq!(selections.top_n, Some(5));
        assert!(selections.overlay.sd_band && !selections.overlay.mean);
        assert_eq!(selections.categories["BOROUGH"].len(), 2);
    }
}
