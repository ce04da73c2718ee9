// Error types for loading and rendering the rainfall dashboard.
use std::path::PathBuf;
use thiserror::Error;

/// The data file could not be turned into a table.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// File missing or unreadable
    #[error("Failed to open data source '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Header lacks one or more of the required columns
    #[error("Data source '{path}' is missing required columns: {}", missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    /// A row could not be read or a numeric cell is not a number
    #[error("Malformed row {row} (column '{column}'): {detail}")]
    MalformedRow {
        row: usize,
        column: String,
        detail: String,
    },

    /// File parsed but holds no observations
    #[error("Data source '{0}' contains no observations")]
    Empty(PathBuf),
}

/// A `date` or `datetime` cell that is not a recognised calendar value.
#[derive(Error, Debug)]
#[error("Failed to parse {column} value '{value}' on row {row}")]
pub struct DateParseError {
    pub row: usize,
    pub column: &'static str,
    pub value: String,
}

/// Top-level error for one dashboard cycle.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    DateParse(#[from] DateParseError),

    /// Chart drawing failed
    #[error("Failed to draw {chart}: {detail}")]
    Chart { chart: &'static str, detail: String },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Output directory holds files the dashboard did not write
    #[error("Refusing to replace '{path}': it contains '{entry}'")]
    OutputDir { path: PathBuf, entry: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
