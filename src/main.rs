// Entry point and interactive session loop.
//
// Each cycle runs load -> read widget state -> filter -> aggregate ->
// render. The base table is loaded once through the session's
// `LoadCache`; everything else is recomputed whenever a selection changes.
mod aggregate;
mod charts;
mod error;
mod filter;
mod loader;
mod output;
mod pipeline;
mod types;
mod util;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use filter::{DateBounds, FilterState};
use loader::LoadCache;
use log::{error, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "rainfall_dashboard",
    version,
    about = "Interactive rainfall analysis over a province/tambon CSV"
)]
struct Cli {
    /// Rainfall CSV with date, province, tambon, rain, latitude, longitude, datetime
    #[arg(long, default_value = "rain.csv")]
    data: PathBuf,

    /// Directory receiving charts and summaries
    #[arg(long, default_value = "dashboard_output")]
    out_dir: PathBuf,

    /// Initially selected province
    #[arg(long)]
    province: Option<String>,

    /// Initial start date (YYYY-MM-DD), clamped to the data range
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<NaiveDate>,

    /// Initial end date (YYYY-MM-DD), clamped to the data range
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<NaiveDate>,

    /// Render a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Rows of the filtered view shown in the console
    #[arg(long, default_value_t = 8)]
    preview_rows: usize,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    util::parse_date(s).ok_or_else(|| format!("'{}' is not a YYYY-MM-DD date", s))
}

/// Print `label` and read one trimmed line. `None` on end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Province selector: a numbered list with `0` for no selection.
fn select_province(provinces: &[&str]) -> Option<Option<String>> {
    println!("Select Province");
    println!("[0] (none)");
    for (i, p) in provinces.iter().enumerate() {
        println!("[{}] {}", i + 1, p);
    }
    loop {
        let choice = prompt("Enter choice: ")?;
        match choice.parse::<usize>() {
            Ok(0) => return Some(None),
            Ok(n) if n <= provinces.len() => return Some(Some(provinces[n - 1].to_string())),
            _ => println!("Invalid choice. Please enter 0-{}.", provinces.len()),
        }
    }
}

/// Date picker limited to `min..=max`; out-of-range input is clamped by
/// the caller's `FilterState` setter.
fn select_date(label: &str, current: NaiveDate, min: NaiveDate, max: NaiveDate) -> Option<NaiveDate> {
    loop {
        let text = prompt(&format!("{} [{}] ({} to {}): ", label, current, min, max))?;
        if text.is_empty() {
            return Some(current);
        }
        match util::parse_date(&text) {
            Some(d) => return Some(d),
            None => println!("Invalid date. Please use YYYY-MM-DD."),
        }
    }
}

/// Run one full cycle. A failure is reported and the previous output kept.
fn run_cycle(cache: &LoadCache, cli: &Cli, state: &FilterState) -> anyhow::Result<()> {
    let table = cache.get_or_load(&cli.data)?;
    let dash = pipeline::render(&table, state);
    output::present(&dash, &cli.out_dir, cli.preview_rows)?;
    Ok(())
}

fn report_cycle(cache: &LoadCache, cli: &Cli, state: &FilterState) {
    if let Err(e) = run_cycle(cache, cli, state) {
        error!("Render failed: {:#}", e);
        eprintln!("Failed to render dashboard: {:#}\n", e);
    }
}

fn initial_state(cli: &Cli, bounds: DateBounds) -> FilterState {
    let mut state = FilterState::initial(bounds).with_province(cli.province.clone());
    if let Some(start) = cli.start {
        state = state.with_start(start, bounds);
    }
    if let Some(end) = cli.end {
        state = state.with_end(end, bounds);
    }
    state
}

fn describe_source(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cache = LoadCache::new();

    // A load failure here is fatal for the session.
    let table = cache
        .get_or_load(&cli.data)
        .with_context(|| format!("Failed to load {}", cli.data.display()))?;
    let bounds = table
        .date_bounds()
        .context("Rainfall table has no dates")?;
    let provinces: Vec<String> = table.provinces().iter().map(|p| p.to_string()).collect();
    info!(
        "Session started on {} ({} rows, {} provinces, {} to {})",
        describe_source(cache.source().unwrap_or(cli.data.as_path())),
        table.len(),
        provinces.len(),
        bounds.min,
        bounds.max
    );

    let mut state = initial_state(&cli, bounds);
    if cli.once {
        return run_cycle(&cache, &cli, &state);
    }
    report_cycle(&cache, &cli, &state);

    loop {
        println!("Filter Options");
        println!("[1] Select Province ({})", state.selected_province().unwrap_or("none"));
        println!("[2] Select Start Date ({})", state.start_date);
        println!("[3] Select End Date ({})", state.end_date);
        println!("[4] Refresh");
        println!("[0] Exit\n");
        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        let next = match choice.as_str() {
            "1" => {
                let names: Vec<&str> = provinces.iter().map(String::as_str).collect();
                select_province(&names).map(|p| state.clone().with_province(p))
            }
            "2" => select_date("Select Start Date", state.start_date, bounds.min, bounds.max)
                .map(|d| state.clone().with_start(d, bounds)),
            "3" => select_date("Select End Date", state.end_date, state.start_date, bounds.max)
                .map(|d| state.clone().with_end(d, bounds)),
            "4" => Some(state.clone()),
            "0" => break,
            _ => {
                println!("Invalid choice. Please enter 0-4.\n");
                continue;
            }
        };
        let Some(next) = next else {
            break;
        };
        state = next;
        report_cycle(&cache, &cli, &state);
    }
    println!("Exiting the program.");
    Ok(())
}
