use crate::charts::{draw_bar_chart, draw_line_chart, draw_map_frames};
use crate::error::{DashboardError, Result};
use crate::pipeline::Dashboard;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub const BAR_CHART_FILE: &str = "bar_chart.svg";
pub const LINE_CHART_FILE: &str = "line_chart.svg";
pub const MAP_DIR: &str = "map_frames";
pub const STATISTICS_FILE: &str = "summary_statistics.csv";
pub const VIEW_FILE: &str = "filtered_view.csv";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows, or `(no rows)`.
pub fn table_preview<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

/// Files written for one cycle.
#[derive(Debug, Clone)]
pub struct Written {
    pub bar_chart: PathBuf,
    pub line_chart: PathBuf,
    pub map_frames: Vec<PathBuf>,
    pub statistics: PathBuf,
    pub view: PathBuf,
    pub summary: PathBuf,
}

const STAGING_PREFIX: &str = ".dashboard-staging-";
const RETIRED_PREFIX: &str = ".dashboard-retired-";

fn frame_name(idx: usize, when: NaiveDateTime) -> String {
    format!("frame_{:04}_{}.svg", idx + 1, when.format("%Y%m%dT%H%M%S"))
}

/// Draw every chart, then write the whole cycle under `out_dir`.
///
/// The cycle is written into a staging directory next to `out_dir` and
/// swapped in with a rename once every file is complete. A failure at any
/// step leaves the previous cycle's output untouched.
pub fn write_dashboard(dash: &Dashboard, out_dir: &Path) -> Result<Written> {
    let parent = match out_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)?;
    let frame_names = stage_dashboard(dash, staging.path())?;
    replace_dir(staging.path(), out_dir, &parent)?;

    info!(
        "Wrote dashboard to {:?} ({} map frames)",
        out_dir,
        frame_names.len()
    );
    let map_dir = out_dir.join(MAP_DIR);
    Ok(Written {
        bar_chart: out_dir.join(BAR_CHART_FILE),
        line_chart: out_dir.join(LINE_CHART_FILE),
        map_frames: frame_names.iter().map(|n| map_dir.join(n)).collect(),
        statistics: out_dir.join(STATISTICS_FILE),
        view: out_dir.join(VIEW_FILE),
        summary: out_dir.join(SUMMARY_FILE),
    })
}

/// Write every file of one cycle into `dir`. Returns the map frame file
/// names in chronological order.
fn stage_dashboard(dash: &Dashboard, dir: &Path) -> Result<Vec<String>> {
    let bar_svg = draw_bar_chart(&dash.bar)?;
    let line_svg = draw_line_chart(&dash.line)?;
    let frames = draw_map_frames(&dash.map)?;

    fs::write(dir.join(BAR_CHART_FILE), bar_svg)?;
    fs::write(dir.join(LINE_CHART_FILE), line_svg)?;
    let map_dir = dir.join(MAP_DIR);
    fs::create_dir_all(&map_dir)?;
    let mut names = Vec::with_capacity(frames.len());
    for (idx, (when, svg)) in frames.into_iter().enumerate() {
        let name = frame_name(idx, when);
        fs::write(map_dir.join(&name), svg)?;
        names.push(name);
    }
    write_csv(&dir.join(STATISTICS_FILE), &dash.statistics.to_rows())?;
    write_csv(&dir.join(VIEW_FILE), &dash.view_rows)?;
    write_json(&dir.join(SUMMARY_FILE), &dash.summary_json())?;
    Ok(names)
}

/// Only directories holding nothing but dashboard output may be replaced.
fn check_replaceable(out_dir: &Path) -> Result<()> {
    const OWNED: [&str; 6] = [
        BAR_CHART_FILE,
        LINE_CHART_FILE,
        MAP_DIR,
        STATISTICS_FILE,
        VIEW_FILE,
        SUMMARY_FILE,
    ];
    for entry in fs::read_dir(out_dir)? {
        let name = entry?.file_name();
        if !OWNED.iter().any(|o| name.as_os_str() == *o) {
            return Err(DashboardError::OutputDir {
                path: out_dir.to_path_buf(),
                entry: name.to_string_lossy().into_owned(),
            });
        }
    }
    Ok(())
}

/// Move `staged` to `out_dir`, retiring the previous output.
fn replace_dir(staged: &Path, out_dir: &Path, parent: &Path) -> Result<()> {
    if !out_dir.exists() {
        fs::rename(staged, out_dir)?;
        return Ok(());
    }
    check_replaceable(out_dir)?;
    // Dropping `retired` deletes the previous cycle.
    let retired = tempfile::Builder::new()
        .prefix(RETIRED_PREFIX)
        .tempdir_in(parent)?;
    let previous = retired.path().join("previous");
    fs::rename(out_dir, &previous)?;
    if let Err(e) = fs::rename(staged, out_dir) {
        if let Err(restore) = fs::rename(&previous, out_dir) {
            warn!("Could not restore {:?}: {}", out_dir, restore);
        }
        return Err(e.into());
    }
    debug!("Retired previous output of {:?}", out_dir);
    Ok(())
}

/// Console text for one cycle.
pub fn dashboard_text(dash: &Dashboard, preview_rows: usize) -> String {
    let mut out = String::new();
    out.push_str("Rainfall Analysis\n\n");
    out.push_str(&dash.heading());
    out.push_str("\n\n");
    out.push_str(&format!(
        "Showing {} of {} rows",
        crate::util::format_int(dash.view_rows.len()),
        crate::util::format_int(dash.total_rows)
    ));
    if let Some(p) = dash.state.selected_province() {
        out.push_str(&format!(" (province: {})", p));
    }
    out.push_str("\n\n");
    out.push_str(&table_preview(&dash.view_rows, preview_rows));
    out.push_str("\n\nSummary Statistics\n\n");
    out.push_str(&table_preview(&dash.statistics.to_rows(), usize::MAX));
    out.push_str("\n\n");
    out.push_str(&dash.range_line());
    out.push('\n');
    out.push_str(&dash.highest_line());
    out.push('\n');
    out.push_str(&dash.lowest_line());
    out.push('\n');
    out
}

/// Print the cycle to stdout and write its files.
pub fn present(dash: &Dashboard, out_dir: &Path, preview_rows: usize) -> Result<Written> {
    let written = write_dashboard(dash, out_dir)?;
    println!("{}", dashboard_text(dash, preview_rows));
    println!(
        "(Charts exported to {} and {}, {} map frames in {})",
        written.bar_chart.display(),
        written.line_chart.display(),
        written.map_frames.len(),
        out_dir.join(MAP_DIR).display()
    );
    println!(
        "(Summaries exported to {}, {} and {})\n",
        written.statistics.display(),
        written.view.display(),
        written.summary.display()
    );
    Ok(written)
}
