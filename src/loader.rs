use crate::error::{DataSourceError, DateParseError, Result};
use crate::types::{Observation, RainTable, RawRow};
use crate::util::{parse_date, parse_datetime, parse_f64_cell};
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "date",
    "province",
    "tambon",
    "rain",
    "latitude",
    "longitude",
    "datetime",
];

/// Read the rainfall CSV at `path` into a typed table.
///
/// Fails on a missing file, absent required columns, a non-numeric
/// `rain`/`latitude`/`longitude` cell, or an unparseable `date`/`datetime`.
pub fn load(path: &Path) -> Result<RainTable> {
    let open_err = |source| DataSourceError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(open_err)?;

    let headers = rdr.headers().map_err(open_err)?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DataSourceError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        }
        .into());
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let raw = result.map_err(|e| DataSourceError::MalformedRow {
            row: line,
            column: "*".to_string(),
            detail: e.to_string(),
        })?;
        rows.push(to_observation(raw, line)?);
    }

    let table = RainTable::new(rows);
    if table.is_empty() {
        return Err(DataSourceError::Empty(path.to_path_buf()).into());
    }
    info!("Loaded {} observations from {:?}", table.len(), path);
    Ok(table)
}

fn to_observation(raw: RawRow, line: usize) -> Result<Observation> {
    let date_text = raw.date.unwrap_or_default();
    let date = parse_date(&date_text).ok_or(DateParseError {
        row: line,
        column: "date",
        value: date_text.clone(),
    })?;
    let datetime_text = raw.datetime.unwrap_or_default();
    let datetime = parse_datetime(&datetime_text).ok_or(DateParseError {
        row: line,
        column: "datetime",
        value: datetime_text.clone(),
    })?;

    let numeric = |column: &str, cell: Option<String>| {
        parse_f64_cell(cell.as_deref()).map_err(|_| DataSourceError::MalformedRow {
            row: line,
            column: column.to_string(),
            detail: format!("'{}' is not a number", cell.unwrap_or_default()),
        })
    };

    Ok(Observation {
        province: raw.province.unwrap_or_default(),
        tambon: raw.tambon.unwrap_or_default(),
        date,
        datetime,
        rain: numeric("rain", raw.rain)?,
        latitude: numeric("latitude", raw.latitude)?,
        longitude: numeric("longitude", raw.longitude)?,
    })
}

/// Load-once holder for the session's base table.
///
/// Populated by the first successful [`LoadCache::get_or_load`]; a failed
/// load leaves it empty so the next cycle tries again. Passed around
/// explicitly so each test can start from a fresh cache.
#[derive(Debug, Default)]
pub struct LoadCache {
    table: OnceCell<Arc<RainTable>>,
    path: OnceCell<PathBuf>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table, loading it from `path` on first use.
    ///
    /// The cache is keyed by nothing: once populated, later calls return
    /// the same table whatever path they pass.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<RainTable>> {
        if let Some(table) = self.table.get() {
            debug!("Cache hit for rainfall table");
            return Ok(Arc::clone(table));
        }
        let table = self.table.get_or_try_init(|| load(path).map(Arc::new))?;
        let _ = self.path.set(path.to_path_buf());
        Ok(Arc::clone(table))
    }

    /// Path the cached table was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.path.get().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "date,province,tambon,rain,latitude,longitude,datetime";

    fn csv_file(body: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", body).unwrap();
        f
    }

    fn sample() -> NamedTempFile {
        csv_file(&format!(
            "{HEADER}\n\
             2024-01-01,A,T1,10,13.7,100.5,2024-01-01 00:00:00\n\
             2024-01-02,A,T2,20,13.8,100.6,2024-01-02 00:00:00\n\
             2024-01-01,B,T3,5,14.0,101.0,2024-01-01 00:00:00\n"
        ))
    }

    #[test]
    fn loads_typed_rows() {
        let f = sample();
        let table = load(f.path()).unwrap();
        assert_eq!(table.len(), 3);
        let first = &table.rows()[0];
        assert_eq!(first.province, "A");
        assert_eq!(first.tambon, "T1");
        assert_eq!(first.date, chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.rain, Some(10.0));
        assert_eq!(first.latitude, Some(13.7));
        assert_eq!(table.provinces(), vec!["A", "B"]);
    }

    #[test]
    fn empty_numeric_cell_is_missing_value() {
        let f = csv_file(&format!("{HEADER}\n2024-01-01,A,T1,,,,2024-01-01\n"));
        let table = load(f.path()).unwrap();
        assert_eq!(table.rows()[0].rain, None);
        assert_eq!(table.rows()[0].longitude, None);
    }

    #[test]
    fn column_order_and_extra_columns_do_not_matter() {
        let f = csv_file(
            "id,rain,province,tambon,date,datetime,longitude,latitude\n\
             1,3.5,A,T1,2024-02-01,2024-02-01 12:00:00,100.0,13.0\n",
        );
        let table = load(f.path()).unwrap();
        assert_eq!(table.rows()[0].rain, Some(3.5));
        assert_eq!(table.rows()[0].latitude, Some(13.0));
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let err = load(Path::new("/definitely/not/here/rain.csv")).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::DataSource(DataSourceError::Open { .. })
        ));
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let f = csv_file("date,province,rain\n2024-01-01,A,1\n");
        match load(f.path()).unwrap_err() {
            DashboardError::DataSource(DataSourceError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["tambon", "latitude", "longitude", "datetime"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_date_propagates() {
        let f = csv_file(&format!("{HEADER}\nyesterday,A,T1,1,13,100,2024-01-01\n"));
        match load(f.path()).unwrap_err() {
            DashboardError::DateParse(e) => {
                assert_eq!(e.row, 2);
                assert_eq!(e.column, "date");
                assert_eq!(e.value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_datetime_propagates() {
        let f = csv_file(&format!("{HEADER}\n2024-01-01,A,T1,1,13,100,noon\n"));
        assert!(matches!(
            load(f.path()).unwrap_err(),
            DashboardError::DateParse(DateParseError { column: "datetime", .. })
        ));
    }

    #[test]
    fn non_numeric_rain_is_malformed() {
        let f = csv_file(&format!("{HEADER}\n2024-01-01,A,T1,lots,13,100,2024-01-01\n"));
        match load(f.path()).unwrap_err() {
            DashboardError::DataSource(DataSourceError::MalformedRow { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "rain");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exponent_form_numbers_load() {
        let f = csv_file(&format!(
            "{HEADER}\n2024-01-01,A,T1,1e-05,1.37E+01,1.005e2,2024-01-01\n"
        ));
        let table = load(f.path()).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.rain, Some(1e-05));
        assert_eq!(row.latitude, Some(13.7));
        assert_eq!(row.longitude, Some(100.5));
    }

    #[test]
    fn header_only_file_is_empty_source() {
        let f = csv_file(&format!("{HEADER}\n"));
        assert!(matches!(
            load(f.path()).unwrap_err(),
            DashboardError::DataSource(DataSourceError::Empty(_))
        ));
    }

    #[test]
    fn cache_loads_once_and_returns_identical_table() {
        let f = sample();
        let cache = LoadCache::new();
        assert_eq!(cache.source(), None);
        let first = cache.get_or_load(f.path()).unwrap();
        let second = cache.get_or_load(f.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(cache.source(), Some(f.path()));
    }

    #[test]
    fn cache_ignores_later_paths_and_file_changes() {
        let f = sample();
        let cache = LoadCache::new();
        let first = cache.get_or_load(f.path()).unwrap();
        drop(f);
        let again = cache.get_or_load(Path::new("/gone.csv")).unwrap();
        assert_eq!(again.len(), first.len());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let cache = LoadCache::new();
        assert!(cache.get_or_load(Path::new("/definitely/not/here.csv")).is_err());
        assert_eq!(cache.source(), None);
        let f = sample();
        assert_eq!(cache.get_or_load(f.path()).unwrap().len(), 3);
    }
}
