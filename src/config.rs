//! TOML dashboard configuration.
//!
//! ```toml
//! [dataset]
//! year_field = "CRASH DATE"
//! missing_tokens = ["", "NA", "Unspecified"]
//!
//! [dataset.column_types]
//! "ZIP CODE" = "str"
//!
//! [selections]
//! year_range = [2014, 2016]
//! metric = "persons_injured"
//!
//! [[tables]]
//! name = "by_borough"
//! kind = "ranked"
//! field = "BOROUGH"
//! ```

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

use crate::dashboard::{Selections, ViewKind};
use crate::processor::{ColumnType, EngineError, LoadOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dataset: DatasetConfig,
    pub selections: Selections,
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Date field the year-range selection filters on
    pub year_field: Option<String>,
    pub delimiter: char,
    pub missing_tokens: Vec<String>,
    pub column_types: HashMap<String, ColumnType>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let defaults = LoadOptions::default();
        DatasetConfig {
            year_field: None,
            delimiter: char::from(defaults.delimiter),
            missing_tokens: defaults.missing_tokens,
            column_types: defaults.column_types,
        }
    }
}

impl DatasetConfig {
    pub fn load_options(&self) -> Result<LoadOptions, EngineError> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ))
            })?;
        Ok(LoadOptions {
            delimiter,
            missing_tokens: self.missing_tokens.clone(),
            column_types: self.column_types.clone(),
        })
    }
}

/// One `[[tables]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(flatten)]
    pub view: ViewKind,
}

impl DashboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
