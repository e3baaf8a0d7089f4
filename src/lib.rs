//! # columnar-dashboard
//!
//! Turns an in-memory table of records into the summary tables behind a
//! dashboard's charts. It supports:
//!
//! - CSV loading through a memory map, with per-column type inference
//!   (int, float, date, time, string) parsed in parallel with Rayon
//! - Filtering by field values, ranges and derived keys (year, hour of day)
//! - Grouping by a field, a derived key or an unordered pair of fields
//! - Count, sum, mean, median, percentiles, IQR, variance and standard deviation
//! - Sliding-window returns over a key-ordered timeline
//! - Dashboard sessions that recompute only the tables an input feeds
//!
//! # Example
//!
//! ```rust
//! use columnar_dashboard::processor::{
//!     AggregateOp, Column, Dataset, FilterPredicate, SortPolicy, Value,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Dataset::from_columns(vec![
//!         ("borough", Column::from_strs(&["QUEENS", "BRONX", "QUEENS"])),
//!         ("injured", Column::from_i64(vec![2, 1, 4])),
//!     ])?;
//!
//!     let table = dataset
//!         .query()
//!         .filter("injured", FilterPredicate::GreaterThan(Value::Int(0)))
//!         .group_by("borough")
//!         .aggregate("injured", AggregateOp::Sum)
//!         .sort(SortPolicy::Descending(0))
//!         .execute()?;
//!
//!     println!("{table}");
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod config;
pub mod dashboard;
pub mod processor;
