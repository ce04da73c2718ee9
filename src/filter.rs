// Row selection for the dashboard view.
use crate::types::{RainTable, View};
use chrono::NaiveDate;

/// Earliest and latest observation dates in the base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

/// Current widget selections.
///
/// Constructors and setters clamp the dates the way the sidebar date
/// pickers do: `min <= start_date <= end_date <= max`. The fields stay
/// public so callers can still build an out-of-range state on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub province: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FilterState {
    /// No province, full date range.
    pub fn initial(bounds: DateBounds) -> Self {
        Self {
            province: None,
            start_date: bounds.min,
            end_date: bounds.max,
        }
    }

    /// Blank labels count as no selection.
    pub fn with_province(mut self, province: Option<String>) -> Self {
        self.province = province.filter(|p| !p.is_empty());
        self
    }

    pub fn with_start(mut self, start: NaiveDate, bounds: DateBounds) -> Self {
        self.start_date = start.max(bounds.min).min(bounds.max);
        self.end_date = self.end_date.max(self.start_date).min(bounds.max);
        self
    }

    pub fn with_end(mut self, end: NaiveDate, bounds: DateBounds) -> Self {
        self.end_date = end.max(self.start_date).min(bounds.max);
        self
    }

    pub fn selected_province(&self) -> Option<&str> {
        self.province.as_deref().filter(|p| !p.is_empty())
    }
}

/// Select the rows shown by the dashboard.
///
/// Rows dated within `start_date..=end_date` are kept. When a province is
/// selected the date range is discarded and the result is every row of that
/// province from the full table. Row order follows the table; `start_date >
/// end_date` without a province gives an empty view.
pub fn filter<'a>(
    table: &'a RainTable,
    start_date: NaiveDate,
    end_date: NaiveDate,
    province: Option<&str>,
) -> View<'a> {
    match province.filter(|p| !p.is_empty()) {
        Some(p) => View::new(table.rows().iter().filter(|r| r.province == p).collect()),
        None => View::new(
            table
                .rows()
                .iter()
                .filter(|r| start_date <= r.date && r.date <= end_date)
                .collect(),
        ),
    }
}

pub fn apply<'a>(table: &'a RainTable, state: &FilterState) -> View<'a> {
    filter(
        table,
        state.start_date,
        state.end_date,
        state.selected_province(),
    )
}
