use serde::{Deserialize, Serialize};

use crate::dashboard::{InputId, ViewContext};
use crate::processor::{
    AggregateOp, AggregateResult, Aggregation, EngineError, GroupKey, KeyExpr, SortPolicy,
    SummaryRow, SummaryTable, aggregate, sliding_returns, stats,
};

/// Built-in table shapes a dashboard can show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewKind {
    /// Selected metric per calendar year
    Timeline { date_field: String },
    /// Selected metric per category, ranked, optionally top-N
    Ranked { field: String },
    /// Selected metric per hour of day
    Hourly { time_field: String },
    /// Selected metric per unordered pair of categories, ranked
    Pairs { left: String, right: String },
    /// Describe statistics of one numeric field over the filtered set
    Distribution { field: String },
    /// Year-end value of `value_field`, then returns over `window` years
    Returns {
        date_field: String,
        value_field: String,
        window: usize,
    },
}

impl ViewKind {
    /// Inputs whose change makes this view stale
    pub fn depends_on(&self) -> Vec<InputId> {
        let mut inputs = vec![InputId::YearRange, InputId::Categories];
        match self {
            ViewKind::Timeline { .. } | ViewKind::Hourly { .. } => inputs.push(InputId::Metric),
            ViewKind::Ranked { .. } | ViewKind::Pairs { .. } => {
                inputs.extend([InputId::Metric, InputId::Sort, InputId::TopN])
            }
            ViewKind::Distribution { .. } | ViewKind::Returns { .. } => {}
        }
        inputs
    }

    pub fn compute(&self, ctx: &ViewContext<'_>) -> Result<SummaryTable, EngineError> {
        let metric = [ctx.selections.metric.aggregation()];
        let ranked = ctx.selections.sort.policy(0);

        let mut table = match self {
            ViewKind::Timeline { date_field } => aggregate(
                ctx.dataset,
                ctx.filter,
                Some(&KeyExpr::year(date_field)),
                &metric,
                SortPolicy::Key,
            )?,
            ViewKind::Ranked { field } => aggregate(
                ctx.dataset,
                ctx.filter,
                Some(&KeyExpr::field(field)),
                &metric,
                ranked,
            )?,
            ViewKind::Hourly { time_field } => aggregate(
                ctx.dataset,
                ctx.filter,
                Some(&KeyExpr::hour_of_day(time_field)),
                &metric,
                SortPolicy::Key,
            )?,
            ViewKind::Pairs { left, right } => aggregate(
                ctx.dataset,
                ctx.filter,
                Some(&KeyExpr::pair(left, right)),
                &metric,
                ranked,
            )?,
            ViewKind::Distribution { field } => return distribution(ctx, field),
            ViewKind::Returns {
                date_field,
                value_field,
                window,
            } => {
                let closes = aggregate(
                    ctx.dataset,
                    ctx.filter,
                    Some(&KeyExpr::year(date_field)),
                    &[Aggregation::new(value_field, AggregateOp::Last)],
                    SortPolicy::Key,
                )?;
                return sliding_returns(&closes, 0, *window);
            }
        };

        if matches!(self, ViewKind::Ranked { .. } | ViewKind::Pairs { .. }) {
            if let Some(n) = ctx.selections.top_n {
                table.truncate(n);
            }
        }
        Ok(table)
    }
}

/// One [`GroupKey::All`] row of describe statistics, or no row when the
/// filtered set has no value for `field`
fn distribution(ctx: &ViewContext<'_>, field: &str) -> Result<SummaryTable, EngineError> {
    let col = ctx.dataset.get_col(field)?;
    if !col.column_type().is_numeric() {
        return Err(EngineError::Type(format!(
            "cannot describe non-numeric field {field}"
        )));
    }
    let rows = ctx.filter.apply(ctx.dataset)?;
    let d = stats::describe(&col.gather_f64(&rows));

    let measures = ["count", "mean", "std_dev", "min", "q1", "median", "q3", "max"];
    let mut table = SummaryTable::new("group", measures.map(String::from).to_vec());
    if d.count > 0 {
        let mut values = vec![Some(AggregateResult::Int(d.count as i64))];
        values.extend(
            [d.mean, d.std_dev, d.min, d.q1, d.median, d.q3, d.max]
                .map(|v| v.map(AggregateResult::Float)),
        );
        table.rows.push(SummaryRow {
            key: GroupKey::All,
            values,
        });
    }
    Ok(table)
}
