use std::collections::HashMap;
use tracing::debug;

use crate::processor::{
    AggregateOp, AggregateResult, Aggregation, EngineError, FilterPredicate, SortPolicy,
    column::Column,
    dataset::Dataset,
    filter::FilterSpec,
    group_key::{GroupKey, KeyExpr},
    stats,
    summary::{SummaryRow, SummaryTable},
};

/// Filters `dataset`, partitions the matching rows by `group_by` and computes
/// `aggregations` per group.
///
/// Without `group_by` the result has a single [`GroupKey::All`] row, or no row
/// when nothing matches. An empty post-filter result is a zero-row table,
/// never an error.
///
/// # Errors
/// - [`EngineError::Schema`] if any referenced field is absent
/// - [`EngineError::Type`] for a numeric statistic over a non-numeric field
/// - [`EngineError::InvalidArgument`] for no statistics, a fieldless numeric
///   statistic, a percentile outside `[0, 100]` or a sort measure out of range
///
/// # Example
/// ```rust
/// # use columnar_dashboard::processor::*;
/// let dataset = Dataset::from_columns(vec![
///     ("borough", Column::from_strs(&["QUEENS", "BRONX", "QUEENS"])),
///     ("injured", Column::from_i64(vec![1, 0, 4])),
/// ])
/// .unwrap();
/// let table = aggregate(
///     &dataset,
///     &FilterSpec::new(),
///     Some(&KeyExpr::field("borough")),
///     &[Aggregation::new("injured", AggregateOp::Sum)],
///     SortPolicy::Descending(0),
/// )
/// .unwrap();
/// assert_eq!(table.rows[0].values[0], Some(AggregateResult::Int(5)));
/// ```
pub fn aggregate(
    dataset: &Dataset,
    filter: &FilterSpec,
    group_by: Option<&KeyExpr>,
    aggregations: &[Aggregation],
    sort: SortPolicy,
) -> Result<SummaryTable, EngineError> {
    if aggregations.is_empty() {
        return Err(EngineError::InvalidArgument(
            "at least one statistic is required".into(),
        ));
    }
    let bound_aggs = aggregations
        .iter()
        .map(|agg| BoundAggregation::bind(dataset, agg))
        .collect::<Result<Vec<_>, _>>()?;
    let bound_key = group_by.map(|k| k.bind(dataset)).transpose()?;

    let rows = filter.apply(dataset)?;

    let groups: Vec<(GroupKey, Vec<usize>)> = match bound_key {
        None if rows.is_empty() => Vec::new(),
        None => vec![(GroupKey::All, rows.clone())],
        Some(key) => {
            // first-seen order
            let mut index: HashMap<GroupKey, usize> = HashMap::new();
            let mut groups: Vec<(GroupKey, Vec<usize>)> = Vec::new();
            for &row in &rows {
                let group_key = GroupKey::from(key.value(row));
                match index.get(&group_key) {
                    Some(&i) => groups[i].1.push(row),
                    None => {
                        index.insert(group_key.clone(), groups.len());
                        groups.push((group_key, vec![row]));
                    }
                }
            }
            groups
        }
    };

    let key_label = group_by.map(|k| k.label()).unwrap_or_else(|| "group".to_string());
    let mut table = SummaryTable::new(
        &key_label,
        aggregations.iter().map(|a| a.label()).collect(),
    );

    for (key, group_rows) in groups {
        let values: Vec<Option<AggregateResult>> =
            bound_aggs.iter().map(|agg| agg.compute(&group_rows)).collect();
        // a group with no defined statistic is not rendered
        if values.iter().all(Option::is_none) {
            continue;
        }
        table.rows.push(SummaryRow { key, values });
    }

    table.sort(sort)?;

    debug!(
        filtered = rows.len(),
        groups = table.len(),
        measures = table.measures.len(),
        "Aggregated summary table"
    );
    Ok(table)
}

/// An [`Aggregation`] resolved against the dataset schema
struct BoundAggregation<'a> {
    column: Option<&'a Column>,
    op: AggregateOp,
}

impl<'a> BoundAggregation<'a> {
    fn bind(dataset: &'a Dataset, agg: &Aggregation) -> Result<Self, EngineError> {
        if let AggregateOp::Percentile(p) = agg.op {
            if !(0.0..=100.0).contains(&p) {
                return Err(EngineError::InvalidArgument(format!(
                    "percentile must be within [0, 100], got {p}"
                )));
            }
        }

        let column = match (&agg.field, agg.op) {
            (None, AggregateOp::Count) => None,
            (None, op) => {
                return Err(EngineError::InvalidArgument(format!(
                    "{} needs a field",
                    op.name()
                )));
            }
            (Some(field), op) => {
                let col = dataset.get_col(field)?;
                if op != AggregateOp::Count && !col.column_type().is_numeric() {
                    return Err(EngineError::Type(format!(
                        "cannot compute {} of non-numeric field {} ({:?})",
                        op.name(),
                        field,
                        col.column_type()
                    )));
                }
                Some(col)
            }
        };

        Ok(BoundAggregation { column, op: agg.op })
    }

    /// Statistic over `rows`; missing cells are skipped, `None` when undefined
    fn compute(&self, rows: &[usize]) -> Option<AggregateResult> {
        let col = match self.column {
            None => return Some(AggregateResult::Int(rows.len() as i64)),
            Some(col) => col,
        };

        // Integer columns keep integer results where the statistic allows it
        if let Column::Int64(cells) = col {
            let ints: Vec<i64> = rows.iter().filter_map(|&r| cells[r]).collect();
            let int_result = match self.op {
                AggregateOp::Count => Some(ints.len() as i64),
                AggregateOp::Sum if ints.is_empty() => None,
                AggregateOp::Sum => match ints.iter().try_fold(0i64, |acc, &v| acc.checked_add(v)) {
                    Some(total) => Some(total),
                    // past i64 range
                    None => {
                        let values: Vec<f64> = ints.iter().map(|&v| v as f64).collect();
                        return stats::sum(&values).map(AggregateResult::Float);
                    }
                },
                AggregateOp::Min => ints.iter().min().copied(),
                AggregateOp::Max => ints.iter().max().copied(),
                AggregateOp::First => ints.first().copied(),
                AggregateOp::Last => ints.last().copied(),
                _ => {
                    let values: Vec<f64> = ints.iter().map(|&v| v as f64).collect();
                    return float_statistic(&values, self.op).map(AggregateResult::Float);
                }
            };
            return int_result.map(AggregateResult::Int);
        }

        if self.op == AggregateOp::Count {
            let present = rows.iter().filter(|&&r| col.get(r).is_some()).count();
            return Some(AggregateResult::Int(present as i64));
        }

        let values = col.gather_f64(rows);
        float_statistic(&values, self.op).map(AggregateResult::Float)
    }
}

fn float_statistic(values: &[f64], op: AggregateOp) -> Option<f64> {
    match op {
        AggregateOp::Count => Some(values.len() as f64),
        AggregateOp::Sum => stats::sum(values),
        AggregateOp::Mean => stats::mean(values),
        AggregateOp::Median => stats::median(values),
        AggregateOp::StdDev => stats::std_dev(values),
        AggregateOp::Variance => stats::variance(values),
        AggregateOp::Percentile(p) => stats::quantile(values, p),
        AggregateOp::Iqr => stats::iqr(values),
        AggregateOp::Min => stats::min(values),
        AggregateOp::Max => stats::max(values),
        AggregateOp::First => values.first().copied(),
        AggregateOp::Last => values.last().copied(),
    }
}

/// Fluent builder over [`aggregate`]
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    dataset: &'a Dataset,
    filters: FilterSpec,
    group_by: Option<KeyExpr>,
    aggregations: Vec<Aggregation>,
    sort: SortPolicy,
    limit: Option<usize>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            filters: FilterSpec::new(),
            group_by: None,
            aggregations: Vec::new(),
            sort: SortPolicy::default(),
            limit: None,
        }
    }

    /// Add a filter condition on a raw field
    pub fn filter(mut self, column: &str, predicate: FilterPredicate) -> Self {
        self.filters.push(KeyExpr::field(column), predicate);
        self
    }

    /// Add a filter condition on a derived key, e.g. the year of a date
    pub fn filter_key(mut self, key: KeyExpr, predicate: FilterPredicate) -> Self {
        self.filters.push(key, predicate);
        self
    }

    /// Add every clause of an existing spec
    pub fn filters(mut self, spec: &FilterSpec) -> Self {
        for (key, predicate) in spec.clauses() {
            self.filters.push(key.clone(), predicate.clone());
        }
        self
    }

    /// Group by a raw field
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by = Some(KeyExpr::field(column));
        self
    }

    /// Group by a derived key
    pub fn group_by_key(mut self, key: KeyExpr) -> Self {
        self.group_by = Some(key);
        self
    }

    /// Count records per group
    pub fn count(mut self) -> Self {
        self.aggregations.push(Aggregation::count());
        self
    }

    pub fn aggregate(mut self, column: &str, op: AggregateOp) -> Self {
        self.aggregations.push(Aggregation::new(column, op));
        self
    }

    /// Add an aggregation with a custom alias
    pub fn aggregate_as(mut self, column: &str, op: AggregateOp, alias: &str) -> Self {
        self.aggregations
            .push(Aggregation::new(column, op).alias(alias));
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn sort(mut self, policy: SortPolicy) -> Self {
        self.sort = policy;
        self
    }

    /// Keep only the first `n` rows after sorting
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn execute(self) -> Result<SummaryTable, EngineError> {
        let mut table = aggregate(
            self.dataset,
            &self.filters,
            self.group_by.as_ref(),
            &self.aggregations,
            self.sort,
        )?;
        if let Some(n) = self.limit {
            table.truncate(n);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Value;
    use chrono::NaiveDate;

    fn make_test_dataset() -> Dataset {
        let dates = [
            (2014, 1, 3),
            (2014, 5, 9),
            (2015, 2, 1),
            (2015, 8, 17),
            (2016, 3, 3),
            (2016, 4, 4),
        ]
        .iter()
        .map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
        .collect();

        Dataset::from_columns(vec![
            ("date", Column::from_dates(dates)),
            (
                "borough",
                Column::from_strs(&["QUEENS", "BRONX", "QUEENS", "BROOKLYN", "BRONX", "QUEENS"]),
            ),
            ("injured", Column::from_i64(vec![1, 0, 2, 3, 0, 4])),
            (
                "speed",
                Column::Float64(vec![Some(30.0), None, Some(45.0), Some(25.0), None, None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_group_by_year_sorted_by_key() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .group_by_key(KeyExpr::year("date"))
            .count()
            .aggregate("injured", AggregateOp::Sum)
            .execute()
            .unwrap();

        assert_eq!(table.key_label, "year");
        assert_eq!(table.measures, vec!["count", "injured_sum"]);
        let years: Vec<GroupKey> = table.keys().cloned().collect();
        assert_eq!(
            years,
            vec![
                GroupKey::Value(Value::Int(2014)),
                GroupKey::Value(Value::Int(2015)),
                GroupKey::Value(Value::Int(2016)),
            ]
        );
        assert_eq!(table.rows[1].values[1], Some(AggregateResult::Int(5)));
    }

    #[test]
    fn test_first_seen_order() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .group_by("borough")
            .count()
            .sort(SortPolicy::FirstSeen)
            .execute()
            .unwrap();
        let keys: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["QUEENS", "BRONX", "BROOKLYN"]);
    }

    #[test]
    fn test_group_counts_cover_filtered_rows() {
        let ds = make_test_dataset();
        let filter = FilterSpec::new().field("injured", FilterPredicate::GreaterThan(Value::Int(0)));
        let matched = filter.apply(&ds).unwrap().len();
        let table = ds
            .query()
            .filters(&filter)
            .group_by("borough")
            .count()
            .execute()
            .unwrap();
        let total: f64 = table.column(0).iter().flatten().sum();
        assert_eq!(total as usize, matched);
    }

    #[test]
    fn test_all_missing_group_is_excluded() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .group_by("borough")
            .aggregate("speed", AggregateOp::Mean)
            .execute()
            .unwrap();
        // BRONX has no speed readings
        let keys: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["BROOKLYN", "QUEENS"]);
        assert_eq!(
            table.rows[1].values[0],
            Some(AggregateResult::Float(37.5))
        );
    }

    #[test]
    fn test_undefined_cell_kept_when_other_measure_defined() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .group_by("borough")
            .count()
            .aggregate("speed", AggregateOp::StdDev)
            .execute()
            .unwrap();
        assert_eq!(table.len(), 3);
        let bronx = table
            .get(&GroupKey::Value(Value::from("BRONX")))
            .unwrap();
        assert_eq!(bronx.values, vec![Some(AggregateResult::Int(2)), None]);
    }

    #[test]
    fn test_empty_filter_result_is_zero_row_table() {
        let ds = make_test_dataset();
        let grouped = ds
            .query()
            .filter_key(
                KeyExpr::year("date"),
                FilterPredicate::Between(Value::Int(2020), Value::Int(2010)),
            )
            .group_by("borough")
            .count()
            .execute()
            .unwrap();
        assert!(grouped.is_empty());

        let whole = ds
            .query()
            .filter("borough", FilterPredicate::Equals(Value::from("STATEN ISLAND")))
            .aggregate("injured", AggregateOp::Median)
            .execute()
            .unwrap();
        assert!(whole.is_empty());
    }

    #[test]
    fn test_whole_set_statistics() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .aggregate("injured", AggregateOp::Percentile(50.0))
            .aggregate("injured", AggregateOp::Median)
            .aggregate("injured", AggregateOp::Iqr)
            .execute()
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].key, GroupKey::All);
        assert_eq!(table.rows[0].values[0], table.rows[0].values[1]);
        assert_eq!(table.rows[0].values[0], Some(AggregateResult::Float(1.5)));
    }

    #[test]
    fn test_ranked_top_n() {
        let ds = make_test_dataset();
        let table = ds
            .query()
            .group_by("borough")
            .aggregate("injured", AggregateOp::Sum)
            .sort(SortPolicy::Descending(0))
            .limit(2)
            .execute()
            .unwrap();
        let keys: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["QUEENS", "BROOKLYN"]);
    }

    #[test]
    fn test_schema_and_type_errors() {
        let ds = make_test_dataset();
        let unknown = ds.query().aggregate("severity", AggregateOp::Sum).execute();
        assert!(matches!(unknown, Err(EngineError::Schema(_))));

        let non_numeric = ds.query().aggregate("borough", AggregateOp::Mean).execute();
        assert!(matches!(non_numeric, Err(EngineError::Type(_))));

        let bad_p = ds
            .query()
            .aggregate("injured", AggregateOp::Percentile(150.0))
            .execute();
        assert!(matches!(bad_p, Err(EngineError::InvalidArgument(_))));

        let none = ds.query().group_by("borough").execute();
        assert!(matches!(none, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_same_query_twice_is_identical() {
        let ds = make_test_dataset();
        let run = || {
            ds.query()
                .group_by_key(KeyExpr::year("date"))
                .aggregate("speed", AggregateOp::Mean)
                .aggregate("injured", AggregateOp::StdDev)
                .execute()
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_int_sum_past_i64_range_falls_back_to_float() {
        let ds = Dataset::from_columns(vec![("v", Column::from_i64(vec![i64::MAX, 1]))]).unwrap();
        let table = ds.query().aggregate("v", AggregateOp::Sum).execute().unwrap();
        match table.rows[0].values[0] {
            Some(AggregateResult::Float(total)) => assert!((total - 9.223_372_036_854_776e18).abs() < 1e4),
            other => panic!("expected a float sum, got {other:?}"),
        }

        let small = Dataset::from_columns(vec![("v", Column::from_i64(vec![i64::MAX, -1]))]).unwrap();
        let table = small.query().aggregate("v", AggregateOp::Sum).execute().unwrap();
        assert_eq!(table.rows[0].values[0], Some(AggregateResult::Int(i64::MAX - 1)));
    }

    #[test]
    fn test_count_first_last_skip_missing_cells() {
        let ds = Dataset::from_columns(vec![
            ("ints", Column::Int64(vec![None, Some(5), None, Some(7), None])),
            ("floats", Column::Float64(vec![None, Some(1.5), None, Some(2.5), None])),
        ])
        .unwrap();

        let table = ds
            .query()
            .count()
            .aggregate("ints", AggregateOp::Count)
            .aggregate("ints", AggregateOp::First)
            .aggregate("ints", AggregateOp::Last)
            .aggregate("floats", AggregateOp::Count)
            .aggregate("floats", AggregateOp::First)
            .aggregate("floats", AggregateOp::Last)
            .execute()
            .unwrap();

        assert_eq!(
            table.rows[0].values,
            vec![
                Some(AggregateResult::Int(5)),
                Some(AggregateResult::Int(2)),
                Some(AggregateResult::Int(5)),
                Some(AggregateResult::Int(7)),
                Some(AggregateResult::Int(2)),
                Some(AggregateResult::Float(1.5)),
                Some(AggregateResult::Float(2.5)),
            ]
        );
    }
}
