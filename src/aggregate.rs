use crate::types::{DescribeRow, Observation, RainTable, View};
use crate::util::{average, format_int, format_optional, quantile_sorted, sample_std};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Mean rain per group, iterated in ascending key order. A group whose rows
/// all lack a rain value maps to `None`.
pub type GroupMeans<K> = BTreeMap<K, Option<f64>>;

pub fn mean_by_group<'a, K, I, F>(rows: I, key: F) -> GroupMeans<K>
where
    K: Ord,
    I: IntoIterator<Item = &'a Observation>,
    F: Fn(&Observation) -> K,
{
    let mut acc: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for r in rows {
        let values = acc.entry(key(r)).or_default();
        if let Some(rain) = r.rain {
            values.push(rain);
        }
    }
    acc.into_iter().map(|(k, v)| (k, average(&v))).collect()
}

pub fn mean_by_province(table: &RainTable) -> GroupMeans<String> {
    mean_by_group(table.rows(), |r| r.province.clone())
}

pub fn mean_by_date(table: &RainTable) -> GroupMeans<NaiveDate> {
    mean_by_group(table.rows(), |r| r.date)
}

/// Group with the largest mean; the first key in order wins a tie.
pub fn argmax<K: Clone>(means: &GroupMeans<K>) -> Option<(K, f64)> {
    pick(means, Ordering::Greater)
}

/// Group with the smallest mean; the first key in order wins a tie.
pub fn argmin<K: Clone>(means: &GroupMeans<K>) -> Option<(K, f64)> {
    pick(means, Ordering::Less)
}

fn pick<K: Clone>(means: &GroupMeans<K>, want: Ordering) -> Option<(K, f64)> {
    let mut best: Option<(&K, f64)> = None;
    for (k, mean) in means {
        let Some(m) = *mean else { continue };
        match best {
            Some((_, b)) if m.partial_cmp(&b) != Some(want) => {}
            _ => best = Some((k, m)),
        }
    }
    best.map(|(k, m)| (k.clone(), m))
}

/// Wettest and driest province and date by mean rain over the whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlights {
    pub highest_province: Option<(String, f64)>,
    pub highest_date: Option<(NaiveDate, f64)>,
    pub lowest_province: Option<(String, f64)>,
    pub lowest_date: Option<(NaiveDate, f64)>,
}

/// Always computed from the unfiltered table, independent of the view.
pub fn highlights(table: &RainTable) -> Highlights {
    let by_province = mean_by_province(table);
    let by_date = mean_by_date(table);
    Highlights {
        highest_province: argmax(&by_province),
        highest_date: argmax(&by_date),
        lowest_province: argmin(&by_province),
        lowest_date: argmin(&by_date),
    }
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    /// Summarise the present values, ignoring missing ones.
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut v: Vec<f64> = values.into_iter().flatten().collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        Self {
            count: v.len(),
            mean: average(&v),
            std: sample_std(&v),
            min: v.first().copied(),
            q25: quantile_sorted(&v, 0.25),
            q50: quantile_sorted(&v, 0.5),
            q75: quantile_sorted(&v, 0.75),
            max: v.last().copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub rain: ColumnSummary,
    pub latitude: ColumnSummary,
    pub longitude: ColumnSummary,
}

pub fn summary_statistics(view: &View<'_>) -> SummaryStatistics {
    SummaryStatistics {
        rain: ColumnSummary::from_values(view.iter().map(|r| r.rain)),
        latitude: ColumnSummary::from_values(view.iter().map(|r| r.latitude)),
        longitude: ColumnSummary::from_values(view.iter().map(|r| r.longitude)),
    }
}

impl SummaryStatistics {
    /// One row per statistic, numeric columns across, as a describe table.
    pub fn to_rows(&self) -> Vec<DescribeRow> {
        let cols = [&self.rain, &self.latitude, &self.longitude];
        let stats: [(&str, fn(&ColumnSummary) -> Option<f64>); 7] = [
            ("mean", |c| c.mean),
            ("std", |c| c.std),
            ("min", |c| c.min),
            ("25%", |c| c.q25),
            ("50%", |c| c.q50),
            ("75%", |c| c.q75),
            ("max", |c| c.max),
        ];
        let mut rows = vec![DescribeRow {
            statistic: "count".to_string(),
            rain: format_int(cols[0].count),
            latitude: format_int(cols[1].count),
            longitude: format_int(cols[2].count),
        }];
        for (name, get) in stats {
            rows.push(DescribeRow {
                statistic: name.to_string(),
                rain: format_optional(get(cols[0]), 6),
                latitude: format_optional(get(cols[1]), 6),
                longitude: format_optional(get(cols[2]), 6),
            });
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(province: &str, date: NaiveDate, rain: Option<f64>) -> Observation {
        Observation {
            province: province.to_string(),
            tambon: "t".to_string(),
            date,
            datetime: date.and_hms_opt(0, 0, 0).unwrap(),
            rain,
            latitude: Some(13.5),
            longitude: Some(100.5),
        }
    }

    fn example_table() -> RainTable {
        RainTable::new(vec![
            obs("A", d(2024, 1, 1), Some(10.0)),
            obs("A", d(2024, 1, 2), Some(20.0)),
            obs("B", d(2024, 1, 1), Some(5.0)),
        ])
    }

    #[test]
    fn province_means_match_example() {
        let means = mean_by_province(&example_table());
        let expected: GroupMeans<String> =
            [("A".to_string(), Some(15.0)), ("B".to_string(), Some(5.0))]
                .into_iter()
                .collect();
        assert_eq!(means, expected);
        assert_eq!(argmax(&means), Some(("A".to_string(), 15.0)));
        assert_eq!(argmin(&means), Some(("B".to_string(), 5.0)));
    }

    #[test]
    fn date_means_are_sorted_chronologically() {
        let means = mean_by_date(&example_table());
        let keys: Vec<NaiveDate> = means.keys().copied().collect();
        assert_eq!(keys, vec![d(2024, 1, 1), d(2024, 1, 2)]);
        assert_eq!(means[&d(2024, 1, 1)], Some(7.5));
        assert_eq!(argmax(&means), Some((d(2024, 1, 2), 20.0)));
        assert_eq!(argmin(&means), Some((d(2024, 1, 1), 7.5)));
    }

    #[test]
    fn ties_resolve_to_first_key() {
        let t = RainTable::new(vec![
            obs("C", d(2024, 1, 1), Some(3.0)),
            obs("B", d(2024, 1, 1), Some(3.0)),
            obs("D", d(2024, 1, 1), Some(3.0)),
        ]);
        let means = mean_by_province(&t);
        assert_eq!(argmax(&means).unwrap().0, "B");
        assert_eq!(argmin(&means).unwrap().0, "B");
    }

    #[test]
    fn groups_without_rain_are_skipped() {
        let t = RainTable::new(vec![
            obs("A", d(2024, 1, 1), None),
            obs("B", d(2024, 1, 1), Some(2.0)),
            obs("B", d(2024, 1, 2), None),
        ]);
        let means = mean_by_province(&t);
        assert_eq!(means["A"], None);
        assert_eq!(means["B"], Some(2.0));
        assert_eq!(argmax(&means).unwrap().0, "B");
        assert_eq!(argmin(&means).unwrap().0, "B");
        assert_eq!(argmax(&GroupMeans::<String>::new()), None);
    }

    #[test]
    fn aggregates_are_reproducible() {
        let t = example_table();
        let first = highlights(&t);
        for _ in 0..5 {
            let again = highlights(&t);
            assert_eq!(again, first);
            let (_, m1) = again.highest_province.clone().unwrap();
            let (_, m0) = first.highest_province.clone().unwrap();
            assert_eq!(m1.to_bits(), m0.to_bits());
        }
    }

    #[test]
    fn highlights_ignore_the_view() {
        let t = example_table();
        let h = highlights(&t);
        assert_eq!(h.highest_province.unwrap().0, "A");
        assert_eq!(h.lowest_province.unwrap().0, "B");
        assert_eq!(h.highest_date.unwrap().0, d(2024, 1, 2));
        assert_eq!(h.lowest_date.unwrap().0, d(2024, 1, 1));
    }

    #[test]
    fn summary_of_view() {
        let t = example_table();
        let v = filter(&t, d(2024, 1, 1), d(2024, 1, 2), None);
        let s = summary_statistics(&v);
        assert_eq!(s.rain.count, 3);
        assert_eq!(s.rain.mean, Some(35.0 / 3.0));
        assert_eq!(s.rain.min, Some(5.0));
        assert_eq!(s.rain.q25, Some(7.5));
        assert_eq!(s.rain.q50, Some(10.0));
        assert_eq!(s.rain.q75, Some(15.0));
        assert_eq!(s.rain.max, Some(20.0));
        assert_eq!(s.latitude.std, Some(0.0));
    }

    #[test]
    fn summary_of_empty_view_has_zero_count() {
        let t = example_table();
        let v = filter(&t, d(2024, 1, 2), d(2024, 1, 1), None);
        let s = summary_statistics(&v);
        assert_eq!(s.rain.count, 0);
        assert_eq!(s.rain.mean, None);
        assert_eq!(s.rain.max, None);
        let rows = s.to_rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].rain, "0");
        assert!(rows[1..].iter().all(|r| r.rain == "NaN"));
    }

    #[test]
    fn describe_rows_are_labelled_in_order() {
        let t = example_table();
        let v = filter(&t, d(2024, 1, 1), d(2024, 1, 2), None);
        let labels: Vec<String> = summary_statistics(&v)
            .to_rows()
            .into_iter()
            .map(|r| r.statistic)
            .collect();
        assert_eq!(labels, ["count", "mean", "std", "min", "25%", "50%", "75%", "max"]);
    }
}
