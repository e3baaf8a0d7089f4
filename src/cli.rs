//! Command-line arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use columnar_dashboard::dashboard::{Metric, SortOrder};

/// Summarise a CSV file into the tables behind a dashboard
///
/// Examples:
///   columnar-dashboard --data collisions.csv --config dashboard.toml
///   columnar-dashboard --data collisions.csv --config dashboard.toml --years 2014:2016
///   columnar-dashboard --data prices.csv --format csv
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV file to load
    #[arg(short, long, value_name = "FILE", env = "DASHBOARD_DATA")]
    pub data: PathBuf,

    /// Dashboard configuration (TOML)
    ///
    /// Without one, a distribution table is printed for every numeric column.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Inclusive year range, e.g. 2014:2016
    #[arg(long, value_name = "START:END", value_parser = parse_year_range)]
    pub years: Option<(i64, i64)>,

    /// Metric for timeline and ranked tables, e.g. persons_injured
    #[arg(short, long)]
    pub metric: Option<Metric>,

    /// Ranking direction
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Keep only the first N rows of ranked tables
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortOrder::Ascending,
            SortArg::Desc => SortOrder::Descending,
        }
    }
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

fn parse_year_range(s: &str) -> Result<(i64, i64), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
    let start = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start year '{start}': {e}"))?;
    let end = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end year '{end}': {e}"))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "columnar-dashboard",
            "--data",
            "c.csv",
            "--years",
            "2014:2016",
            "--metric",
            "persons_killed",
            "--sort",
            "asc",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(args.years, Some((2014, 2016)));
        assert_eq!(args.metric, Some(Metric::PersonsKilled));
        assert_eq!(args.sort.map(SortOrder::from), Some(SortOrder::Ascending));
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn test_bad_year_range() {
        assert!(parse_year_range("2014").is_err());
        assert!(parse_year_range("2014:x").is_err());
        assert_eq!(parse_year_range("2016:2014"), Ok((2016, 2014)));
    }
}
