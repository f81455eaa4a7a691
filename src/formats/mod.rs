//! Import/export formats for localization resources.
//!
//! - `csv`: spreadsheet-friendly export and import, one column per culture
//! - `json`: nested object rendering of one language for client bundles

pub mod csv;
pub mod json;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("CSV is missing the '{}' column", csv::RESOURCE_KEY_COLUMN)]
    MissingResourceKeyColumn,

    #[error("Row {row} has an empty resource key")]
    EmptyKey { row: usize },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("CSV output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
