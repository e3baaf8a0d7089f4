use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

pub mod column;
pub mod dataset;
pub mod filter;
pub mod group_key;
pub mod query_builder;
pub mod stats;
pub mod summary;
pub mod window;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unknown field: {0}")]
    Schema(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Source dataset has no records")]
    EmptyDataset,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Outcome of loading a CSV file
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

/// A cell or row the loader could not use
#[derive(Debug, Clone)]
pub struct ParseError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub error: String,
}

/// Typed scalar held by a cell, a group key or a predicate literal
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer column
    Int(i64),
    /// Float column
    Float(f64),
    /// String / categorical column
    Str(String),
    /// Calendar date column
    Date(NaiveDate),
    /// Time-of-day column
    Time(NaiveTime),
}

impl Value {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Float(_) => 0,
            Value::Date(_) => 1,
            Value::Time(_) => 2,
            Value::Str(_) => 3,
        }
    }

    /// Comparison used by predicates: ints and floats compare numerically,
    /// values of unrelated kinds do not compare.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ if self.kind_rank() != other.kind_rank() => None,
            _ => Some(self.cmp(other)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            // Int(1) and Float(1.0) are distinct values, ints first
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// Filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    /// Inclusive on both ends
    Between(Value, Value),
    /// Membership in a set of values
    In(Vec<Value>),
}

/// Aggregate operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateOp {
    /// Number of records, or of non-missing values when a field is given
    Count,
    /// Sum of all numeric values
    Sum,
    /// Arithmetic mean
    Mean,
    /// 50th percentile
    Median,
    /// Sample standard deviation (n - 1)
    StdDev,
    /// Sample variance (n - 1)
    Variance,
    /// Type-7 percentile, `p` in `[0, 100]`
    Percentile(f64),
    /// 75th minus 25th percentile
    Iqr,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// First non-missing value in dataset order
    First,
    /// Last non-missing value in dataset order
    Last,
}

impl AggregateOp {
    /// Short name used for default measure labels
    pub fn name(&self) -> String {
        match self {
            AggregateOp::Count => "count".into(),
            AggregateOp::Sum => "sum".into(),
            AggregateOp::Mean => "mean".into(),
            AggregateOp::Median => "median".into(),
            AggregateOp::StdDev => "std_dev".into(),
            AggregateOp::Variance => "variance".into(),
            AggregateOp::Percentile(p) => format!("p{p}"),
            AggregateOp::Iqr => "iqr".into(),
            AggregateOp::Min => "min".into(),
            AggregateOp::Max => "max".into(),
            AggregateOp::First => "first".into(),
            AggregateOp::Last => "last".into(),
        }
    }
}

/// Result of an aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateResult {
    Int(i64),
    Float(f64),
}

impl AggregateResult {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggregateResult::Int(v) => *v as f64,
            AggregateResult::Float(v) => *v,
        }
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateResult::Int(v) => write!(f, "{v}"),
            AggregateResult::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One requested statistic: operation, optional source field and output name
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub field: Option<String>,
    pub op: AggregateOp,
    pub alias: Option<String>,
}

impl Aggregation {
    pub fn new(field: &str, op: AggregateOp) -> Self {
        Self {
            field: Some(field.to_string()),
            op,
            alias: None,
        }
    }

    /// Record count per group
    pub fn count() -> Self {
        Self {
            field: None,
            op: AggregateOp::Count,
            alias: None,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Measure name in the output table
    pub fn label(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.field {
            Some(field) => format!("{}_{}", field, self.op.name()).to_lowercase(),
            None => self.op.name(),
        }
    }
}

/// Row ordering of a summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortPolicy {
    /// Order in which groups first appear in the filtered rows
    FirstSeen,
    /// Natural key order
    #[default]
    Key,
    /// Ranked by the measure at this index, smallest first
    Ascending(usize),
    /// Ranked by the measure at this index, largest first
    Descending(usize),
}

pub use column::{Column, ColumnType};
pub use dataset::{Dataset, LoadOptions, Record};
pub use filter::FilterSpec;
pub use group_key::{GroupKey, KeyExpr};
pub use query_builder::{QueryBuilder, aggregate};
pub use summary::{SummaryRow, SummaryTable};
pub use window::sliding_returns;
