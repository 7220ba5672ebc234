//! Dashboard controls and the pure view function.
//!
//! `render` turns a cached table plus the user's selections into a
//! serializable [`DashboardView`]. It performs no I/O; whatever drives the UI
//! calls it again after every interaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::detection::{FireDetection, FireTable};
use crate::filter::{available_dates, filter_by_date, latest_date};
use crate::stats::{
    HourBin, Kpis, LabelBin, SliceShare, compute_kpis, confidence_histogram, hourly_histogram,
    satellite_share,
};

pub const TITLE: &str = "Canada Wildfire Dashboard";
pub const CAPTION: &str = "Powered by NASA FIRMS - MODIS C6.1 (Last 7 Days)";
pub const EMPTY_MESSAGE: &str = "No fire data available for selected date.";
pub const EXPORT_FILE_NAME: &str = "filtered_fires.csv";

/// Initial map view over Canada.
pub const MAP_CENTER: (f64, f64) = (56.0, -106.0);
pub const MAP_ZOOM: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Province {
    #[default]
    All,
    Quebec,
    Alberta,
    Ontario,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum City {
    #[default]
    All,
    #[serde(rename = "Red Deer")]
    RedDeer,
    Toronto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Basemap {
    #[default]
    OpenStreetMap,
    #[serde(rename = "CartoDB.Positron")]
    CartoDbPositron,
    #[serde(rename = "CartoDB.DarkMatter")]
    CartoDbDarkMatter,
}

impl Basemap {
    pub const ALL: [Basemap; 3] = [
        Basemap::OpenStreetMap,
        Basemap::CartoDbPositron,
        Basemap::CartoDbDarkMatter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => "OpenStreetMap",
            Basemap::CartoDbPositron => "CartoDB.Positron",
            Basemap::CartoDbDarkMatter => "CartoDB.DarkMatter",
        }
    }

    pub fn tile_url(&self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            Basemap::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
            Basemap::CartoDbDarkMatter => {
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => "© OpenStreetMap contributors",
            _ => "© OpenStreetMap contributors © CARTO",
        }
    }
}

impl fmt::Display for Basemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Basemap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Basemap::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown basemap '{s}'"))
    }
}

impl FromStr for Province {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Province::All),
            "quebec" => Ok(Province::Quebec),
            "alberta" => Ok(Province::Alberta),
            "ontario" => Ok(Province::Ontario),
            _ => Err(format!("unknown province '{s}'")),
        }
    }
}

impl FromStr for City {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(City::All),
            "red deer" | "red_deer" | "reddeer" => Ok(City::RedDeer),
            "toronto" => Ok(City::Toronto),
            _ => Err(format!("unknown city '{s}'")),
        }
    }
}

/// Layer toggles. Only hotspots has backing data; the weather layers are
/// reported as unavailable and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layers {
    pub hotspots: bool,
    pub temperature: bool,
    pub wind: bool,
    pub precipitation: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Layers {
            hotspots: true,
            temperature: false,
            wind: false,
            precipitation: false,
        }
    }
}

/// Everything the user can select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub province: Province,
    pub city: City,
    /// `None` selects the most recent date in the feed.
    pub date: Option<NaiveDate>,
    pub basemap: Basemap,
    pub layers: Layers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
}

/// Heat-map sample, weighted by the detection's `value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub basemap: &'static str,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub markers: Vec<Marker>,
    pub heatmap: Option<Vec<HeatPoint>>,
    pub layers: Vec<LayerStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub satellite_share: Vec<SliceShare>,
    pub hourly: Vec<HourBin>,
    pub confidence: Vec<LabelBin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    Ready,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub caption: &'static str,
    pub state: DashboardState,
    pub selected_date: Option<NaiveDate>,
    pub available_dates: Vec<NaiveDate>,
    pub status: ViewStatus,
    pub message: Option<&'static str>,
    pub map: MapView,
    pub kpis: Kpis,
    pub charts: Charts,
    /// File name offered for download, `None` when there is nothing to export.
    pub export: Option<&'static str>,
}

/// Resolves the date the view should show: the explicit choice or the latest available.
pub fn selected_date(table: &FireTable, state: &DashboardState) -> Option<NaiveDate> {
    state.date.or_else(|| latest_date(table))
}

/// Rows the current selection shows. Province and city are not applied;
/// the feed carries no administrative boundaries.
pub fn select<'a>(table: &'a FireTable, state: &DashboardState) -> Vec<&'a FireDetection> {
    match selected_date(table, state) {
        Some(date) => filter_by_date(table, date),
        None => Vec::new(),
    }
}

fn popup(row: &FireDetection) -> String {
    let bright = row
        .brightness
        .map(|b| b.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "🔥 {}<br>Bright: {}<br>Conf: {}",
        row.acq_date, bright, row.confidence
    )
}

pub fn render_map(rows: &[&FireDetection], basemap: Basemap, layers: Layers) -> MapView {
    let markers = rows
        .iter()
        .map(|r| Marker {
            lat: r.latitude,
            lon: r.longitude,
            popup: popup(r),
        })
        .collect();

    let heatmap = (layers.hotspots && !rows.is_empty()).then(|| {
        rows.iter()
            .filter_map(|r| {
                r.value.map(|weight| HeatPoint {
                    lat: r.latitude,
                    lon: r.longitude,
                    weight,
                })
            })
            .collect()
    });

    MapView {
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        basemap: basemap.name(),
        tile_url: basemap.tile_url(),
        attribution: basemap.attribution(),
        markers,
        heatmap,
        layers: vec![
            LayerStatus { name: "hotspots", enabled: layers.hotspots, available: true },
            LayerStatus { name: "temperature", enabled: layers.temperature, available: false },
            LayerStatus { name: "wind", enabled: layers.wind, available: false },
            LayerStatus { name: "precipitation", enabled: layers.precipitation, available: false },
        ],
    }
}

pub fn render_charts(rows: &[&FireDetection]) -> Charts {
    Charts {
        satellite_share: satellite_share(rows),
        hourly: hourly_histogram(rows),
        confidence: confidence_histogram(rows),
    }
}

/// Builds the full dashboard for `state` from `table`.
pub fn render(table: &FireTable, state: &DashboardState) -> DashboardView {
    let date = selected_date(table, state);
    let rows = select(table, state);
    let empty = rows.is_empty();

    DashboardView {
        title: TITLE,
        caption: CAPTION,
        state: state.clone(),
        selected_date: date,
        available_dates: available_dates(table),
        status: if empty { ViewStatus::Empty } else { ViewStatus::Ready },
        message: empty.then_some(EMPTY_MESSAGE),
        map: render_map(&rows, state.basemap, state.layers),
        kpis: compute_kpis(&rows),
        charts: render_charts(&rows),
        export: (!empty).then_some(EXPORT_FILE_NAME),
    }
}
