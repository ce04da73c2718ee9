use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::aggregate::SummaryStatistics;
use crate::filter::DateBounds;

/// One CSV record as read from disk, before any typing.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub date: Option<String>,
    pub province: Option<String>,
    pub tambon: Option<String>,
    pub rain: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub datetime: Option<String>,
}

/// A single rainfall observation.
///
/// Numeric fields are optional: an empty cell is a missing value that
/// statistics skip, mirroring a NaN in a dataframe.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub province: String,
    pub tambon: String,
    pub date: NaiveDate,
    pub datetime: NaiveDateTime,
    pub rain: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The immutable base table for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RainTable {
    rows: Vec<Observation>,
}

impl RainTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct provinces in order of first appearance.
    pub fn provinces(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for r in &self.rows {
            if !seen.contains(&r.province.as_str()) {
                seen.push(&r.province);
            }
        }
        seen
    }

    /// Earliest and latest `date`, or `None` for an empty table.
    pub fn date_bounds(&self) -> Option<DateBounds> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some(DateBounds { min, max })
    }
}

/// A row subset of a [`RainTable`], borrowed for one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    rows: Vec<&'a Observation>,
}

impl<'a> View<'a> {
    pub fn new(rows: Vec<&'a Observation>) -> Self {
        Self { rows }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Observation> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Console/CSV rendering of an observation in the view preview.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ObservationRow {
    pub date: String,
    pub province: String,
    pub tambon: String,
    pub rain: String,
    pub latitude: String,
    pub longitude: String,
    pub datetime: String,
}

/// One line of the summary statistics table: a statistic across the
/// numeric columns.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DescribeRow {
    #[tabled(rename = "")]
    pub statistic: String,
    pub rain: String,
    pub latitude: String,
    pub longitude: String,
}

/// Machine-readable digest of one render cycle, written as `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryJson {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub province: Option<String>,
    pub total_rows: usize,
    pub view_rows: usize,
    pub highest_province: Option<String>,
    pub highest_date: Option<NaiveDate>,
    pub lowest_province: Option<String>,
    pub lowest_date: Option<NaiveDate>,
    pub statistics: SummaryStatistics,
}
