use std::{cmp::Ordering, fmt, io};

#[cfg(feature = "arrow")]
use arrow2::{
    array::{Array, Float64Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema},
};
#[cfg(feature = "arrow")]
use std::sync::Arc;

use crate::processor::{AggregateResult, EngineError, SortPolicy, group_key::GroupKey};

/// One output row: a group key and one cell per measure (`None` = undefined)
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub values: Vec<Option<AggregateResult>>,
}

/// Chart-ready table of per-group statistics
///
/// Group keys are unique within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub key_label: String,
    pub measures: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new(key_label: &str, measures: Vec<String>) -> Self {
        SummaryTable {
            key_label: key_label.to_string(),
            measures,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> + '_ {
        self.rows.iter().map(|r| &r.key)
    }

    pub fn get(&self, key: &GroupKey) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    /// Values of one measure in row order
    pub fn column(&self, measure: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|r| r.values.get(measure).copied().flatten().map(|v| v.as_f64()))
            .collect()
    }

    /// Reorders rows. Ranked policies break ties by natural key order and
    /// put undefined values last in both directions.
    pub fn sort(&mut self, policy: SortPolicy) -> Result<(), EngineError> {
        match policy {
            SortPolicy::FirstSeen => {}
            SortPolicy::Key => self.rows.sort_by(|a, b| a.key.cmp(&b.key)),
            SortPolicy::Ascending(m) | SortPolicy::Descending(m) => {
                if m >= self.measures.len() {
                    return Err(EngineError::InvalidArgument(format!(
                        "sort measure {m} out of range ({} measures)",
                        self.measures.len()
                    )));
                }
                let descending = matches!(policy, SortPolicy::Descending(_));
                self.rows.sort_by(|a, b| a.key.cmp(&b.key));
                // stable: equal values keep key order
                self.rows
                    .sort_by(|a, b| rank(a.values[m], b.values[m], descending));
            }
        }
        Ok(())
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    /// Writes the table as CSV; undefined cells and the missing key are blank
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), EngineError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(std::iter::once(&self.key_label).chain(&self.measures))?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.key.to_string());
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Arrow view for columnar renderers: a Utf8 key column plus one
    /// nullable Float64 column per measure
    #[cfg(feature = "arrow")]
    pub fn to_arrow(&self) -> (Schema, Chunk<Arc<dyn Array>>) {
        let mut fields = vec![Field::new(self.key_label.clone(), DataType::Utf8, true)];
        fields.extend(
            self.measures
                .iter()
                .map(|m| Field::new(m.clone(), DataType::Float64, true)),
        );

        let keys: Vec<Option<String>> = self
            .rows
            .iter()
            .map(|r| match r.key {
                GroupKey::Missing => None,
                _ => Some(r.key.to_string()),
            })
            .collect();

        let mut arrays: Vec<Arc<dyn Array>> = vec![Arc::new(Utf8Array::<i32>::from(keys))];
        for m in 0..self.measures.len() {
            arrays.push(Arc::new(Float64Array::from(self.column(m))));
        }

        (Schema::from(fields), Chunk::new(arrays))
    }
}

fn rank(a: Option<AggregateResult>, b: Option<AggregateResult>, descending: bool) -> Ordering {
    // NaN ranks with the undefined cells
    let defined = |v: Option<AggregateResult>| v.filter(|r| !r.as_f64().is_nan());
    match (defined(a), defined(b)) {
        (Some(x), Some(y)) => {
            let ord = x.as_f64().total_cmp(&y.as_f64());
            if descending { ord.reverse() } else { ord }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = std::iter::once(self.key_label.clone())
            .chain(self.measures.iter().cloned())
            .collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                std::iter::once(r.key.to_string())
                    .chain(r.values.iter().map(|v| match v {
                        Some(AggregateResult::Float(x)) => format!("{x:.4}"),
                        Some(AggregateResult::Int(x)) => x.to_string(),
                        None => String::new(),
                    }))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|c| {
                body.iter()
                    .map(|r| r[c].len())
                    .chain(std::iter::once(header[c].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for line in std::iter::once(&header).chain(&body) {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, &w)| format!("{cell:<w$}"))
                .collect();
            writeln!(f, "{}", cells.join("  ").trim_end())?;
        }
        Ok(())
    }
}
