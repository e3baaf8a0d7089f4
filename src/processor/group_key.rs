use chrono::{Datelike, Timelike};
use std::fmt;

use crate::processor::{
    EngineError, Value,
    column::{Column, ColumnType},
    dataset::Dataset,
};

/// Bucket a record falls into
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// The whole filtered set (no grouping)
    All,
    Value(Value),
    /// The key expression had no value for the record
    Missing,
}

impl From<Option<Value>> for GroupKey {
    fn from(v: Option<Value>) -> Self {
        match v {
            // -0.0 and 0.0 share a group
            Some(Value::Float(f)) => GroupKey::Value(Value::Float(f + 0.0)),
            Some(v) => GroupKey::Value(v),
            None => GroupKey::Missing,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("All"),
            GroupKey::Value(v) => write!(f, "{v}"),
            GroupKey::Missing => Ok(()),
        }
    }
}

/// Raw or derived field used for filtering and grouping
#[derive(Debug, Clone, PartialEq)]
pub enum KeyExpr {
    Field(String),
    /// Calendar year of a date field; integer fields pass through
    Year(String),
    /// Month (1-12) of a date field
    Month(String),
    /// Hour (0-23) of a time field
    HourOfDay(String),
    /// Unordered pair of two categorical fields, e.g. the vehicle types in a collision
    Pair(String, String),
    /// Histogram bin `floor(v / width) * width` of a numeric field
    Bucket(String, f64),
}

impl KeyExpr {
    pub fn field(name: &str) -> Self {
        KeyExpr::Field(name.to_string())
    }

    pub fn year(name: &str) -> Self {
        KeyExpr::Year(name.to_string())
    }

    pub fn month(name: &str) -> Self {
        KeyExpr::Month(name.to_string())
    }

    pub fn hour_of_day(name: &str) -> Self {
        KeyExpr::HourOfDay(name.to_string())
    }

    pub fn pair(a: &str, b: &str) -> Self {
        KeyExpr::Pair(a.to_string(), b.to_string())
    }

    pub fn bucket(name: &str, width: f64) -> Self {
        KeyExpr::Bucket(name.to_string(), width)
    }

    /// Column header for the key in a summary table
    pub fn label(&self) -> String {
        match self {
            KeyExpr::Field(name) => name.clone(),
            KeyExpr::Year(_) => "year".to_string(),
            KeyExpr::Month(_) => "month".to_string(),
            KeyExpr::HourOfDay(_) => "hour".to_string(),
            KeyExpr::Pair(a, b) => format!("{a} / {b}"),
            KeyExpr::Bucket(name, _) => format!("{name}_bucket"),
        }
    }

    /// Resolves the expression against a dataset schema
    ///
    /// # Errors
    /// [`EngineError::Schema`] for an unknown field, [`EngineError::Type`] when
    /// the column cannot produce this kind of key.
    pub fn bind<'a>(&self, dataset: &'a Dataset) -> Result<BoundKey<'a>, EngineError> {
        let bound = match self {
            KeyExpr::Field(name) => BoundKey::Field(dataset.get_col(name)?),
            KeyExpr::Year(name) => {
                let col = dataset.get_col(name)?;
                expect_type(name, col, &[ColumnType::Date, ColumnType::Int64], "year")?;
                BoundKey::Year(col)
            }
            KeyExpr::Month(name) => {
                let col = dataset.get_col(name)?;
                expect_type(name, col, &[ColumnType::Date], "month")?;
                BoundKey::Month(col)
            }
            KeyExpr::HourOfDay(name) => {
                let col = dataset.get_col(name)?;
                expect_type(name, col, &[ColumnType::Time], "hour of day")?;
                BoundKey::Hour(col)
            }
            KeyExpr::Pair(a, b) => {
                let left = dataset.get_col(a)?;
                let right = dataset.get_col(b)?;
                expect_type(a, left, &[ColumnType::Str], "pair")?;
                expect_type(b, right, &[ColumnType::Str], "pair")?;
                BoundKey::Pair(left, right)
            }
            KeyExpr::Bucket(name, width) => {
                let col = dataset.get_col(name)?;
                expect_type(name, col, &[ColumnType::Int64, ColumnType::Float64], "bucket")?;
                if !(width.is_finite() && *width > 0.0) {
                    return Err(EngineError::InvalidArgument(format!(
                        "bucket width must be positive, got {width}"
                    )));
                }
                BoundKey::Bucket(col, *width)
            }
        };
        Ok(bound)
    }
}

fn expect_type(
    name: &str,
    col: &Column,
    allowed: &[ColumnType],
    what: &str,
) -> Result<(), EngineError> {
    let ty = col.column_type();
    if allowed.contains(&ty) {
        Ok(())
    } else {
        Err(EngineError::Type(format!(
            "cannot derive {what} from {name} ({ty:?})"
        )))
    }
}

/// A [`KeyExpr`] resolved to the columns it reads
#[derive(Debug, Clone, Copy)]
pub enum BoundKey<'a> {
    Field(&'a Column),
    Year(&'a Column),
    Month(&'a Column),
    Hour(&'a Column),
    Pair(&'a Column, &'a Column),
    Bucket(&'a Column, f64),
}

impl BoundKey<'_> {
    /// Key value of one row; `None` when the source cell is missing
    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            BoundKey::Field(col) => col.get(row),
            BoundKey::Year(col) => match col {
                Column::Date(_) => col.get_date(row).map(|d| Value::Int(d.year() as i64)),
                _ => col.get(row),
            },
            BoundKey::Month(col) => col.get_date(row).map(|d| Value::Int(d.month() as i64)),
            BoundKey::Hour(col) => col.get_time(row).map(|t| Value::Int(t.hour() as i64)),
            BoundKey::Pair(left, right) => match (left.get_str(row), right.get_str(row)) {
                (Some(a), Some(b)) => {
                    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                    Some(Value::Str(format!("{lo} / {hi}")))
                }
                (Some(one), None) | (None, Some(one)) => Some(Value::Str(one.to_string())),
                (None, None) => None,
            },
            BoundKey::Bucket(col, width) => col
                .get_f64(row)
                .map(|v| Value::Float((v / width).floor() * width)),
        }
    }

    /// Type of the values [`BoundKey::value`] produces
    pub fn value_type(&self) -> ColumnType {
        match self {
            BoundKey::Field(col) => col.column_type(),
            BoundKey::Year(_) | BoundKey::Month(_) | BoundKey::Hour(_) => ColumnType::Int64,
            BoundKey::Pair(_, _) => ColumnType::Str,
            BoundKey::Bucket(_, _) => ColumnType::Float64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn collisions() -> Dataset {
        Dataset::from_columns(vec![
            (
                "date",
                Column::from_dates(vec![
                    NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2015, 7, 9).unwrap(),
                    NaiveDate::from_ymd_opt(2015, 12, 31).unwrap(),
                ]),
            ),
            (
                "time",
                Column::Time(vec![
                    NaiveTime::from_hms_opt(8, 15, 0),
                    None,
                    NaiveTime::from_hms_opt(23, 59, 0),
                ]),
            ),
            (
                "vehicle_1",
                Column::Str(vec![Some("Taxi".into()), Some("Bike".into()), None]),
            ),
            (
                "vehicle_2",
                Column::Str(vec![Some("Bus".into()), None, None]),
            ),
            ("injured", Column::from_f64(vec![0.0, 2.5, 7.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_derived_date_and_time_keys() {
        let ds = collisions();
        let year = KeyExpr::year("date").bind(&ds).unwrap();
        let month = KeyExpr::month("date").bind(&ds).unwrap();
        let hour = KeyExpr::hour_of_day("time").bind(&ds).unwrap();
        assert_eq!(year.value(1), Some(Value::Int(2015)));
        assert_eq!(month.value(2), Some(Value::Int(12)));
        assert_eq!(hour.value(0), Some(Value::Int(8)));
        assert_eq!(hour.value(1), None);
        assert_eq!(year.value_type(), ColumnType::Int64);
    }

    #[test]
    fn test_pair_key_is_unordered() {
        let ds = collisions();
        let pair = KeyExpr::pair("vehicle_1", "vehicle_2").bind(&ds).unwrap();
        assert_eq!(pair.value(0), Some(Value::from("Bus / Taxi")));
        assert_eq!(pair.value(1), Some(Value::from("Bike")));
        assert_eq!(pair.value(2), None);
    }

    #[test]
    fn test_bucket_key() {
        let ds = collisions();
        let bucket = KeyExpr::bucket("injured", 2.0).bind(&ds).unwrap();
        assert_eq!(bucket.value(1), Some(Value::Float(2.0)));
        assert_eq!(bucket.value(2), Some(Value::Float(6.0)));
        assert!(matches!(
            KeyExpr::bucket("injured", 0.0).bind(&ds),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_signed_zero_shares_a_group() {
        let ds = Dataset::from_columns(vec![("v", Column::from_f64(vec![-0.0, 0.0, 0.5, -0.5]))])
            .unwrap();

        let by_value = ds.query().group_by("v").count().execute().unwrap();
        let keys: Vec<String> = by_value.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["-0.5", "0", "0.5"]);
        assert_eq!(by_value.column(0), vec![Some(1.0), Some(2.0), Some(1.0)]);

        let by_bucket = ds
            .query()
            .group_by_key(KeyExpr::bucket("v", 1.0))
            .count()
            .execute()
            .unwrap();
        let keys: Vec<String> = by_bucket.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["-1", "0"]);
        assert_eq!(by_bucket.column(0), vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn test_bind_rejects_unknown_and_mistyped_fields() {
        let ds = collisions();
        assert!(matches!(
            KeyExpr::year("crash_date").bind(&ds),
            Err(EngineError::Schema(_))
        ));
        assert!(matches!(
            KeyExpr::hour_of_day("date").bind(&ds),
            Err(EngineError::Type(_))
        ));
    }

    #[test]
    fn test_group_key_order_puts_missing_last() {
        let mut keys = vec![
            GroupKey::Missing,
            GroupKey::Value(Value::Int(3)),
            GroupKey::Value(Value::Int(1)),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::Value(Value::Int(1)),
                GroupKey::Value(Value::Int(3)),
                GroupKey::Missing
            ]
        );
    }
}
