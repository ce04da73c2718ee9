//! One dashboard cycle: filter the base table, aggregate, build charts.
//!
//! `render` is a pure function of the table and the widget state, so the
//! event loop can call it after every input change and tests can call it
//! without any terminal or file system.

use crate::aggregate::{highlights, summary_statistics, Highlights, SummaryStatistics};
use crate::charts::{BarChart, LineChart, MapAnimation};
use crate::filter::{apply, FilterState};
use crate::types::{ObservationRow, RainTable, SummaryJson};
use crate::util::format_optional;
use log::{debug, warn};

/// Everything the presentation layer shows for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub state: FilterState,
    pub total_rows: usize,
    pub view_rows: Vec<ObservationRow>,
    pub bar: BarChart,
    pub line: LineChart,
    pub map: MapAnimation,
    pub statistics: SummaryStatistics,
    pub highlights: Highlights,
}

pub fn render(table: &RainTable, state: &FilterState) -> Dashboard {
    let view = apply(table, state);
    debug!(
        "Rendering view of {} / {} rows (province: {:?}, {}..={})",
        view.len(),
        table.len(),
        state.selected_province(),
        state.start_date,
        state.end_date
    );
    if view.is_empty() {
        warn!("No observations match the current filter");
    }
    Dashboard {
        state: state.clone(),
        total_rows: table.len(),
        view_rows: view
            .iter()
            .map(|r| ObservationRow {
                date: r.date.to_string(),
                province: r.province.clone(),
                tambon: r.tambon.clone(),
                rain: format_optional(r.rain, 2),
                latitude: format_optional(r.latitude, 4),
                longitude: format_optional(r.longitude, 4),
                datetime: r.datetime.to_string(),
            })
            .collect(),
        bar: BarChart::from_view(&view),
        line: LineChart::from_view(&view),
        map: MapAnimation::from_view(&view),
        statistics: summary_statistics(&view),
        highlights: highlights(table),
    }
}

impl Dashboard {
    pub fn heading(&self) -> String {
        format!(
            "Daily Rainfall By Date {} and {}",
            self.state.start_date, self.state.end_date
        )
    }

    pub fn range_line(&self) -> String {
        format!(
            "start_date: {} end_date: {}",
            self.state.start_date, self.state.end_date
        )
    }

    pub fn highest_line(&self) -> String {
        format!(
            "The province with the highest average rainfall is {} on {}",
            label(self.highlights.highest_province.as_ref().map(|(p, _)| p.to_string())),
            label(self.highlights.highest_date.map(|(d, _)| d.to_string())),
        )
    }

    pub fn lowest_line(&self) -> String {
        format!(
            "The province with the lowest average rainfall is {} on {}",
            label(self.highlights.lowest_province.as_ref().map(|(p, _)| p.to_string())),
            label(self.highlights.lowest_date.map(|(d, _)| d.to_string())),
        )
    }

    pub fn summary_json(&self) -> SummaryJson {
        SummaryJson {
            start_date: self.state.start_date,
            end_date: self.state.end_date,
            province: self.state.province.clone(),
            total_rows: self.total_rows,
            view_rows: self.view_rows.len(),
            highest_province: self.highlights.highest_province.clone().map(|(p, _)| p),
            highest_date: self.highlights.highest_date.map(|(d, _)| d),
            lowest_province: self.highlights.lowest_province.clone().map(|(p, _)| p),
            lowest_date: self.highlights.lowest_date.map(|(d, _)| d),
            statistics: self.statistics.clone(),
        }
    }
}

fn label(value: Option<String>) -> String {
    value.unwrap_or_else(|| "n/a".to_string())
}
