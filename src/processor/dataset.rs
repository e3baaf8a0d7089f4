use memmap2::Mmap;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::{collections::HashMap, collections::HashSet, fs::File, path::Path};
use tracing::{info, warn};

use crate::processor::{
    EngineError, FilterSpec, LoadSummary, ParseError, Value,
    column::{Column, ColumnType},
    query_builder::QueryBuilder,
};

/// Options for [`Dataset::load_csv`]
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Cell texts read as missing values, compared ignoring ASCII case
    pub missing_tokens: Vec<String>,
    /// Column types that skip inference
    pub column_types: HashMap<String, ColumnType>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b',',
            missing_tokens: ["", "NA", "NaN", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            column_types: HashMap::new(),
        }
    }
}

/// Immutable, column-oriented table of records
///
/// # Examples
///
/// ```rust
/// # use columnar_dashboard::processor::{Column, Dataset};
/// let dataset = Dataset::from_columns(vec![
///     ("borough", Column::from_strs(&["QUEENS", "BRONX"])),
///     ("injured", Column::from_i64(vec![1, 0])),
/// ])
/// .unwrap();
/// assert_eq!(dataset.row_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from named columns of equal length
    ///
    /// # Errors
    /// [`EngineError::EmptyDataset`] when there are no rows,
    /// [`EngineError::InvalidArgument`] on ragged columns or duplicate names.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Column)>) -> Result<Self, EngineError> {
        let (headers, columns): (Vec<String>, Vec<Column>) = columns
            .into_iter()
            .map(|(name, col)| (name.into(), col))
            .unzip();

        let mut seen = HashSet::new();
        if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(EngineError::InvalidArgument(format!(
                "duplicate column name: {dup}"
            )));
        }

        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        if row_count == 0 {
            return Err(EngineError::EmptyDataset);
        }
        if let Some((name, col)) = headers
            .iter()
            .zip(&columns)
            .find(|(_, c)| c.len() != row_count)
        {
            return Err(EngineError::InvalidArgument(format!(
                "column {} has {} rows, expected {}",
                name,
                col.len(),
                row_count
            )));
        }

        Ok(Dataset {
            headers,
            columns,
            row_count,
        })
    }

    /// Loads a CSV file using memory mapping
    ///
    /// Column types are inferred from every non-missing cell unless
    /// `options.column_types` fixes them.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if:
    /// - File cannot be opened or mapped
    /// - CSV is malformed
    /// - The file holds no data rows
    pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<(Self, LoadSummary), EngineError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let (dataset, summary) = Self::from_csv_bytes(&mmap[..], options)?;

        info!(
            path = %path.display(),
            rows = dataset.row_count,
            columns = dataset.headers.len(),
            skipped = summary.errors.len(),
            "Loaded dataset"
        );
        Ok((dataset, summary))
    }

    /// Parses CSV bytes (header line first)
    pub fn from_csv_bytes(buf: &[u8], options: &LoadOptions) -> Result<(Self, LoadSummary), EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(buf);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                let row = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx + 2);
                warn!(row, fields = record.len(), "Skipping row with wrong field count");
                errors.push(ParseError {
                    row,
                    column: String::new(),
                    value: format!("Expected {} fields, got {}", headers.len(), record.len()),
                    error: "field count mismatch".to_string(),
                });
                continue;
            }
            rows.push(record);
        }

        if rows.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        // Infer and parse columns in parallel
        let parsed: Vec<(Column, Vec<ParseError>)> = (0..headers.len())
            .into_par_iter()
            .map(|col_idx| Self::parse_column(col_idx, &headers[col_idx], &rows, options))
            .collect();

        let mut columns = Vec::with_capacity(parsed.len());
        for (col, col_errors) in parsed {
            columns.push(col);
            errors.extend(col_errors);
        }

        let rows_processed = rows.len();
        let dataset = Self::from_columns(headers.into_iter().zip(columns).collect())?;

        Ok((
            dataset,
            LoadSummary {
                rows_processed,
                errors,
            },
        ))
    }

    fn parse_column(
        col_idx: usize,
        name: &str,
        rows: &[csv::StringRecord],
        options: &LoadOptions,
    ) -> (Column, Vec<ParseError>) {
        let is_missing = |cell: &str| options
            .missing_tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case(cell));

        let ty = match options.column_types.get(name) {
            Some(ty) => *ty,
            None => ColumnType::infer(
                rows.iter()
                    .map(|r| &r[col_idx])
                    .filter(|c| !is_missing(*c)),
            ),
        };

        let mut errors = Vec::new();
        let values: Vec<Option<Value>> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let cell = &r[col_idx];
                if is_missing(cell) {
                    return None;
                }
                let parsed = ty.parse(cell);
                if parsed.is_none() {
                    errors.push(ParseError {
                        row: r.position().map(|p| p.line() as usize).unwrap_or(i + 2),
                        column: name.to_string(),
                        value: cell.to_string(),
                        error: format!("not a valid {ty:?}"),
                    });
                }
                parsed
            })
            .collect();

        (Column::from_values(ty, values), errors)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn get_col(&self, col_name: &str) -> Result<&Column, EngineError> {
        let col_pos = self
            .headers
            .iter()
            .position(|cn| cn == col_name)
            .ok_or_else(|| EngineError::Schema(col_name.to_string()))?;

        self.columns
            .get(col_pos)
            .ok_or_else(|| EngineError::Schema(col_name.to_string()))
    }

    /// Names of Int64 and Float64 columns, in schema order
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .zip(&self.columns)
            .filter(|(_, c)| c.column_type().is_numeric())
            .map(|(h, _)| h.as_str())
            .collect()
    }

    pub fn record(&self, row: usize) -> Option<Record<'_>> {
        (row < self.row_count).then_some(Record { dataset: self, row })
    }

    /// Row indices matching every predicate in `spec`, in dataset order
    pub fn filter(&self, spec: &FilterSpec) -> Result<Vec<usize>, EngineError> {
        spec.apply(self)
    }

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    dataset: &'a Dataset,
    row: usize,
}

impl Record<'_> {
    /// Value of `field` in this row; `Ok(None)` for a missing cell
    pub fn get(&self, field: &str) -> Result<Option<Value>, EngineError> {
        Ok(self.dataset.get_col(field)?.get(self.row))
    }
}
