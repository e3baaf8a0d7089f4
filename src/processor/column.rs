use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::processor::Value;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "int")]
    Int64,
    #[serde(alias = "float")]
    Float64,
    #[serde(alias = "string")]
    Str,
    Date,
    Time,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }

    /// Parses one cell as this type
    pub fn parse(&self, text: &str) -> Option<Value> {
        match self {
            ColumnType::Int64 => parse_int(text.as_bytes()).map(Value::Int),
            ColumnType::Float64 => parse_float(text.as_bytes()).map(Value::Float),
            ColumnType::Str => Some(Value::Str(text.to_string())),
            ColumnType::Date => parse_date(text).map(Value::Date),
            ColumnType::Time => parse_time(text).map(Value::Time),
        }
    }

    /// Whether `text` is spelled as this type. Non-finite floats are
    /// accepted here and become missing when parsed.
    fn accepts(&self, text: &str) -> bool {
        match self {
            ColumnType::Float64 => fast_float::parse::<f64, _>(text.as_bytes()).is_ok(),
            _ => self.parse(text).is_some(),
        }
    }

    /// Narrowest type every non-missing cell parses as
    pub fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnType {
        let mut cells = cells.peekable();
        if cells.peek().is_none() {
            return ColumnType::Str;
        }
        let candidates = [
            ColumnType::Int64,
            ColumnType::Float64,
            ColumnType::Date,
            ColumnType::Time,
        ];
        candidates
            .into_iter()
            .find(|ty| cells.clone().all(|c| ty.accepts(c)))
            .unwrap_or(ColumnType::Str)
    }
}

pub(crate) fn parse_int(field: &[u8]) -> Option<i64> {
    atoi_simd::parse::<i64>(field).ok()
}

/// `nan` and `inf` spellings are not values
pub(crate) fn parse_float(field: &[u8]) -> Option<f64> {
    fast_float::parse::<f64, _>(field)
        .ok()
        .filter(|v: &f64| v.is_finite())
}

pub(crate) fn parse_date(field: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(field, fmt).ok())
}

pub(crate) fn parse_time(field: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(field, fmt).ok())
}

/// Typed storage for one field; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
}

impl Column {
    pub fn from_i64(values: Vec<i64>) -> Self {
        Column::Int64(values.into_iter().map(Some).collect())
    }

    /// Non-finite values are stored as missing
    pub fn from_f64(values: Vec<f64>) -> Self {
        Column::Float64(
            values
                .into_iter()
                .map(|v| v.is_finite().then_some(v))
                .collect(),
        )
    }

    pub fn from_strs(values: &[&str]) -> Self {
        Column::Str(values.iter().map(|s| Some(s.to_string())).collect())
    }

    pub fn from_dates(values: Vec<NaiveDate>) -> Self {
        Column::Date(values.into_iter().map(Some).collect())
    }

    /// Builds a column of `ty` from already-typed values; mismatched values become missing
    pub fn from_values(ty: ColumnType, values: Vec<Option<Value>>) -> Self {
        match ty {
            ColumnType::Int64 => Column::Int64(
                values
                    .into_iter()
                    .map(|v| match v {
                        Some(Value::Int(i)) => Some(i),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnType::Float64 => Column::Float64(
                values
                    .into_iter()
                    .map(|v| v.and_then(|v| v.as_f64()))
                    .collect(),
            ),
            ColumnType::Str => Column::Str(
                values
                    .into_iter()
                    .map(|v| match v {
                        Some(Value::Str(s)) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnType::Date => Column::Date(
                values
                    .into_iter()
                    .map(|v| match v {
                        Some(Value::Date(d)) => Some(d),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnType::Time => Column::Time(
                values
                    .into_iter()
                    .map(|v| match v {
                        Some(Value::Time(t)) => Some(t),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
            Column::Date(_) => ColumnType::Date,
            Column::Time(_) => ColumnType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Random access
    pub fn get(&self, idx: usize) -> Option<Value> {
        match self {
            Column::Int64(v) => v.get(idx).copied().flatten().map(Value::Int),
            Column::Float64(v) => v.get(idx).copied().flatten().map(Value::Float),
            Column::Str(v) => v.get(idx).cloned().flatten().map(Value::Str),
            Column::Date(v) => v.get(idx).copied().flatten().map(Value::Date),
            Column::Time(v) => v.get(idx).copied().flatten().map(Value::Time),
        }
    }

    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Column::Int64(v) => v.get(idx).copied().flatten().map(|i| i as f64),
            Column::Float64(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    pub fn get_str(&self, idx: usize) -> Option<&str> {
        match self {
            Column::Str(v) => v.get(idx).and_then(|s| s.as_deref()),
            _ => None,
        }
    }

    pub fn get_date(&self, idx: usize) -> Option<NaiveDate> {
        match self {
            Column::Date(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    pub fn get_time(&self, idx: usize) -> Option<NaiveTime> {
        match self {
            Column::Time(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    /// Non-missing numeric values at `rows`, in row order
    /// Finite values at `rows`, skipping missing cells
    pub fn gather_f64(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter()
            .filter_map(|&i| self.get_f64(i))
            .filter(|v| v.is_finite())
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.get(i).is_none()).count()
    }
}
