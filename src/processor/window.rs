use crate::processor::{
    AggregateResult, EngineError,
    group_key::GroupKey,
    summary::{SummaryRow, SummaryTable},
};

/// Multi-period returns over a timeline.
///
/// Rows of `timeline` are ordered by key; for every start index whose window
/// of `window` periods fits inside the timeline, emits
/// `(value_end - value_start) / value_start` keyed by the start period.
/// A zero or undefined endpoint gives an undefined (blank) return.
/// Rows keyed [`GroupKey::Missing`] or [`GroupKey::All`] are not part of the timeline.
///
/// # Errors
/// [`EngineError::InvalidArgument`] for `window == 0` or an unknown measure.
pub fn sliding_returns(
    timeline: &SummaryTable,
    measure: usize,
    window: usize,
) -> Result<SummaryTable, EngineError> {
    if window == 0 {
        return Err(EngineError::InvalidArgument(
            "window must span at least one period".into(),
        ));
    }
    if measure >= timeline.measures.len() {
        return Err(EngineError::InvalidArgument(format!(
            "measure {measure} out of range ({} measures)",
            timeline.measures.len()
        )));
    }

    let mut ordered: Vec<&SummaryRow> = timeline
        .rows
        .iter()
        .filter(|r| matches!(r.key, GroupKey::Value(_)))
        .collect();
    ordered.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out = SummaryTable::new(&timeline.key_label, vec![format!("return_{window}")]);
    if ordered.len() < window {
        return Ok(out);
    }

    for start in 0..=ordered.len() - window {
        let end = start + window - 1;
        let first = ordered[start].values[measure].map(|v| v.as_f64());
        let last = ordered[end].values[measure].map(|v| v.as_f64());
        let ret = match (first, last) {
            (Some(a), Some(b)) if a != 0.0 => Some(AggregateResult::Float((b - a) / a)),
            _ => None,
        };
        out.rows.push(SummaryRow {
            key: ordered[start].key.clone(),
            values: vec![ret],
        });
    }
    Ok(out)
}
