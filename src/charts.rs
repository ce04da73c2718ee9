// Chart data for the dashboard and its SVG drawing.
//
// Building the series is pure and cheap; drawing goes through plotters'
// SVG backend into an in-memory string.
use crate::error::{DashboardError, Result};
use crate::types::View;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::collections::BTreeMap;

pub const CHART_TITLE: &str = "Daily Rainfall";
pub const RAIN_LABEL: &str = "Rainfall (mm)";
/// Diameter in pixels of the marker for the largest rain value.
pub const MAP_SIZE_MAX: f64 = 55.0;

const CHART_SIZE: (u32, u32) = (960, 600);
const MAP_SIZE: (u32, u32) = (900, 900);

/// Rain per province, stacked by tambon.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    /// Categories along x, first-appearance order.
    pub provinces: Vec<String>,
    /// Stack colours, first-appearance order.
    pub tambons: Vec<String>,
    /// `(province index, tambon index, rain total)`
    pub segments: Vec<(usize, usize, f64)>,
}

impl BarChart {
    pub fn from_view(view: &View<'_>) -> Self {
        let mut provinces: Vec<String> = Vec::new();
        let mut tambons: Vec<String> = Vec::new();
        let mut totals: Vec<(usize, usize, f64)> = Vec::new();
        for r in view.iter() {
            let Some(rain) = r.rain else { continue };
            let p = index_of(&mut provinces, &r.province);
            let t = index_of(&mut tambons, &r.tambon);
            match totals.iter_mut().find(|(sp, st, _)| *sp == p && *st == t) {
                Some(seg) => seg.2 += rain,
                None => totals.push((p, t, rain)),
            }
        }
        Self {
            provinces,
            tambons,
            segments: totals,
        }
    }

    /// Height of the tallest stack.
    pub fn max_total(&self) -> f64 {
        let mut per_province = vec![0.0; self.provinces.len()];
        for (p, _, v) in &self.segments {
            per_province[*p] += v;
        }
        per_province.into_iter().fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn index_of(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|n| n == name) {
        Some(i) => i,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

/// Rain over date, one line per province in view row order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub series: Vec<(String, Vec<(NaiveDate, f64)>)>,
}

impl LineChart {
    pub fn from_view(view: &View<'_>) -> Self {
        let mut series: Vec<(String, Vec<(NaiveDate, f64)>)> = Vec::new();
        for r in view.iter() {
            let Some(rain) = r.rain else { continue };
            match series.iter_mut().find(|(p, _)| *p == r.province) {
                Some((_, points)) => points.push((r.date, rain)),
                None => series.push((r.province.clone(), vec![(r.date, rain)])),
            }
        }
        Self { series }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub rain: f64,
    pub tambon: String,
}

/// Scatter map frames keyed by `datetime`, in chronological order.
///
/// Rows missing a coordinate or a rain value are not plotted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapAnimation {
    pub frames: BTreeMap<NaiveDateTime, Vec<MapPoint>>,
}

impl MapAnimation {
    pub fn from_view(view: &View<'_>) -> Self {
        let mut frames: BTreeMap<NaiveDateTime, Vec<MapPoint>> = BTreeMap::new();
        for r in view.iter() {
            let (Some(latitude), Some(longitude), Some(rain)) = (r.latitude, r.longitude, r.rain)
            else {
                continue;
            };
            frames.entry(r.datetime).or_default().push(MapPoint {
                latitude,
                longitude,
                rain,
                tambon: r.tambon.clone(),
            });
        }
        Self { frames }
    }

    fn points(&self) -> impl Iterator<Item = &MapPoint> {
        self.frames.values().flatten()
    }

    /// Largest rain value across every frame, so marker scale stays fixed.
    pub fn max_rain(&self) -> f64 {
        self.points().map(|p| p.rain).fold(0.0, f64::max)
    }

    /// `(lon range, lat range)` over all frames, padded so a single point
    /// still spans a visible area.
    pub fn extent(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut pts = self.points().peekable();
        pts.peek()?;
        let (mut lon0, mut lon1, mut lat0, mut lat1) =
            (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for p in pts {
            lon0 = lon0.min(p.longitude);
            lon1 = lon1.max(p.longitude);
            lat0 = lat0.min(p.latitude);
            lat1 = lat1.max(p.latitude);
        }
        let pad = |lo: f64, hi: f64| {
            let margin = ((hi - lo) * 0.1).max(0.05);
            (lo - margin, hi + margin)
        };
        Some((pad(lon0, lon1), pad(lat0, lat1)))
    }

    /// Marker diameter in pixels; area grows with rain.
    pub fn marker_size(&self, rain: f64) -> f64 {
        let max = self.max_rain();
        if max <= 0.0 || rain <= 0.0 {
            return 1.0;
        }
        (MAP_SIZE_MAX * (rain / max).sqrt()).max(1.0)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

type DrawError = DrawingAreaErrorKind<std::io::Error>;

fn chart_err(chart: &'static str) -> impl Fn(DrawError) -> DashboardError {
    move |e| DashboardError::Chart {
        chart,
        detail: e.to_string(),
    }
}

fn series_color(idx: usize) -> RGBAColor {
    Palette99::pick(idx).to_rgba()
}

/// Blue for dry through red for the wettest reading.
fn rain_color(rain: f64, max: f64) -> RGBColor {
    let t = if max > 0.0 { (rain / max).clamp(0.0, 1.0) } else { 0.0 };
    RGBColor((40.0 + 215.0 * t) as u8, 60, (230.0 * (1.0 - t) + 20.0) as u8)
}

pub fn draw_bar_chart(chart: &BarChart) -> Result<String> {
    let err = chart_err("bar chart");
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;
        if chart.is_empty() {
            root.titled(CHART_TITLE, ("sans-serif", 28)).map_err(&err)?;
            root.present().map_err(&err)?;
            drop(root);
            return Ok(svg);
        }
        let n = chart.provinces.len() as u32;
        let y_max = chart.max_total() * 1.05;
        let mut ctx = ChartBuilder::on(&root)
            .caption(CHART_TITLE, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(64)
            .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max.max(1.0))
            .map_err(&err)?;
        let names = &chart.provinces;
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_desc("province")
            .y_desc(RAIN_LABEL)
            .x_labels(names.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    names.get(*i as usize).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .draw()
            .map_err(&err)?;

        let mut stacked = vec![0.0; names.len()];
        for (t, tambon) in chart.tambons.iter().enumerate() {
            let color = series_color(t);
            let mut bars = Vec::new();
            for (p, _, v) in chart.segments.iter().filter(|(_, st, _)| *st == t) {
                let y0 = stacked[*p];
                stacked[*p] += v;
                let p = *p as u32;
                bars.push(Rectangle::new(
                    [
                        (SegmentValue::Exact(p), y0),
                        (SegmentValue::Exact(p + 1), stacked[p as usize]),
                    ],
                    color.filled(),
                ));
            }
            ctx.draw_series(bars)
                .map_err(&err)?
                .label(tambon.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        ctx.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(&err)?;
        root.present().map_err(&err)?;
    }
    Ok(svg)
}

pub fn draw_line_chart(chart: &LineChart) -> Result<String> {
    let err = chart_err("line chart");
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;
        if chart.is_empty() {
            root.titled(CHART_TITLE, ("sans-serif", 28)).map_err(&err)?;
            root.present().map_err(&err)?;
            drop(root);
            return Ok(svg);
        }
        // Dates are plotted as day numbers and labelled back as dates.
        let (mut d0, mut d1, mut y1) = (i32::MAX, i32::MIN, 0f64);
        for (d, v) in chart.series.iter().flat_map(|(_, pts)| pts.iter()) {
            let day = d.num_days_from_ce();
            d0 = d0.min(day);
            d1 = d1.max(day);
            y1 = y1.max(*v);
        }
        if d0 == d1 {
            d0 -= 1;
            d1 += 1;
        }
        let mut ctx = ChartBuilder::on(&root)
            .caption(CHART_TITLE, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(64)
            .build_cartesian_2d(d0..d1, 0f64..(y1 * 1.05).max(1.0))
            .map_err(&err)?;
        ctx.configure_mesh()
            .x_desc("date")
            .y_desc(RAIN_LABEL)
            .x_label_formatter(&|day| {
                NaiveDate::from_num_days_from_ce_opt(*day)
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            })
            .draw()
            .map_err(&err)?;
        for (idx, (province, pts)) in chart.series.iter().enumerate() {
            let color = series_color(idx);
            ctx.draw_series(LineSeries::new(
                pts.iter().map(|(d, v)| (d.num_days_from_ce(), *v)),
                color.stroke_width(2),
            ))
            .map_err(&err)?
            .label(province.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
        ctx.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(&err)?;
        root.present().map_err(&err)?;
    }
    Ok(svg)
}

/// One SVG per animation frame, in frame order.
pub fn draw_map_frames(map: &MapAnimation) -> Result<Vec<(NaiveDateTime, String)>> {
    if map.is_empty() {
        return Ok(Vec::new());
    }
    let Some(((lon0, lon1), (lat0, lat1))) = map.extent() else {
        return Ok(Vec::new());
    };
    let err = chart_err("rainfall map");
    let max_rain = map.max_rain();
    let mut out = Vec::with_capacity(map.len());
    for (when, points) in &map.frames {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, MAP_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(&err)?;
            let mut ctx = ChartBuilder::on(&root)
                .caption(format!("Rainfall Map  datetime={when}"), ("sans-serif", 24))
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(56)
                .build_cartesian_2d(lon0..lon1, lat0..lat1)
                .map_err(&err)?;
            ctx.configure_mesh()
                .x_desc("longitude")
                .y_desc("latitude")
                .draw()
                .map_err(&err)?;
            ctx.draw_series(points.iter().map(|p| {
                let radius = (map.marker_size(p.rain) / 2.0).round() as i32;
                let color = rain_color(p.rain, max_rain);
                EmptyElement::at((p.longitude, p.latitude))
                    + Circle::new((0, 0), radius, color.mix(0.7).filled())
                    + Text::new(format!("{} {:.1} mm", p.tambon, p.rain), (radius + 2, -6), ("sans-serif", 12).into_font())
            }))
            .map_err(&err)?;
            root.present().map_err(&err)?;
        }
        out.push((*when, svg));
    }
    Ok(out)
}
