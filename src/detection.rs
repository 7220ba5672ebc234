//! Normalized hotspot records and the table that holds them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Coordinate reference system tag. The feed is always WGS84 lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Crs {
    pub epsg: u32,
}

impl Crs {
    pub const WGS84: Crs = Crs { epsg: 4326 };
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// A point geometry, `x` = longitude and `y` = latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Point {
            x: longitude,
            y: latitude,
        }
    }
}

/// Detection confidence. MODIS reports a percentage, VIIRS a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Confidence {
    Percent(f64),
    Category(String),
    Unknown,
}

impl Confidence {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Confidence::Unknown;
        };

        match s.parse::<f64>() {
            Ok(v) if (0.0..=100.0).contains(&v) => Confidence::Percent(v),
            Ok(_) => Confidence::Unknown,
            Err(_) => Confidence::Category(s.to_string()),
        }
    }

    /// Histogram label: ten-point bins for percentages, spelled-out levels for categories.
    pub fn label(&self) -> String {
        match self {
            Confidence::Percent(p) => {
                let lo = percent_bin(*p) * 10;
                let hi = if lo == 90 { 100 } else { lo + 9 };
                format!("{lo}-{hi}")
            }
            Confidence::Category(c) => match c.as_str() {
                "l" => "low".to_string(),
                "n" => "nominal".to_string(),
                "h" => "high".to_string(),
                other => other.to_string(),
            },
            Confidence::Unknown => "unknown".to_string(),
        }
    }

    /// Ordering key for histogram bins; percentages first, then low/nominal/high.
    pub(crate) fn sort_key(&self) -> u32 {
        match self {
            Confidence::Percent(p) => percent_bin(*p),
            Confidence::Category(c) => match c.as_str() {
                "l" => 100,
                "n" => 101,
                "h" => 102,
                _ => 200,
            },
            Confidence::Unknown => 300,
        }
    }
}

fn percent_bin(p: f64) -> u32 {
    ((p / 10.0).floor() as u32).min(9)
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Percent(p) => write!(f, "{p}"),
            Confidence::Category(c) => f.write_str(c),
            Confidence::Unknown => Ok(()),
        }
    }
}

/// One hotspot after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireDetection {
    pub latitude: f64,
    pub longitude: f64,
    pub acq_date: NaiveDate,
    /// HHMM, UTC.
    pub acq_time: Option<u32>,
    pub brightness: Option<f64>,
    pub confidence: Confidence,
    pub satellite: String,
    pub geometry: Point,
    /// Heat-map weight, mirrors `brightness`.
    pub value: Option<f64>,

    pub scan: Option<f64>,
    pub track: Option<f64>,
    pub bright_t31: Option<f64>,
    pub frp: Option<f64>,
    pub daynight: Option<String>,
    pub instrument: Option<String>,
    pub version: Option<String>,
}

impl FireDetection {
    /// Hour of day (0-23) derived from the HHMM acquisition time.
    pub fn hour_bucket(&self) -> Option<u32> {
        self.acq_time.map(hour_bucket)
    }
}

#[cfg(test)]
impl FireDetection {
    pub(crate) fn sample(date: &str, brightness: f64, satellite: &str) -> Self {
        FireDetection {
            latitude: 55.0,
            longitude: -110.0,
            acq_date: date.parse().unwrap(),
            acq_time: Some(1200),
            brightness: Some(brightness),
            confidence: Confidence::Percent(70.0),
            satellite: satellite.to_string(),
            geometry: Point::from_lon_lat(-110.0, 55.0),
            value: Some(brightness),
            scan: None,
            track: None,
            bright_t31: None,
            frp: None,
            daynight: None,
            instrument: None,
            version: None,
        }
    }
}

pub fn hour_bucket(acq_time: u32) -> u32 {
    acq_time / 100
}

/// The normalized feed. Rows are shared and never mutated once built.
#[derive(Debug, Clone)]
pub struct FireTable {
    pub rows: Arc<[FireDetection]>,
    pub crs: Crs,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    /// Raw rows removed during validation.
    pub dropped: usize,
}

impl FireTable {
    pub fn new(rows: Vec<FireDetection>, source: impl Into<String>, dropped: usize) -> Self {
        FireTable {
            rows: rows.into(),
            crs: Crs::WGS84,
            source: source.into(),
            fetched_at: Utc::now(),
            dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FireDetection> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_is_lon_lat() {
        let p = Point::from_lon_lat(-106.5, 56.2);
        assert_eq!(p.x, -106.5);
        assert_eq!(p.y, 56.2);
    }

    #[test]
    fn test_crs_display() {
        assert_eq!(Crs::WGS84.to_string(), "EPSG:4326");
    }

    #[test]
    fn test_hour_bucket() {
        assert_eq!(hour_bucket(1345), 13);
        assert_eq!(hour_bucket(59), 0);
        assert_eq!(hour_bucket(2359), 23);
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!(Confidence::parse(Some("85")), Confidence::Percent(85.0));
        assert_eq!(Confidence::parse(Some("85.5")), Confidence::Percent(85.5));
        assert_eq!(Confidence::parse(Some(" n ")), Confidence::Category("n".into()));
        assert_eq!(Confidence::parse(Some("")), Confidence::Unknown);
        assert_eq!(Confidence::parse(None), Confidence::Unknown);
        assert_eq!(Confidence::parse(Some("140")), Confidence::Unknown);
    }

    #[test]
    fn test_confidence_labels() {
        assert_eq!(Confidence::Percent(0.0).label(), "0-9");
        assert_eq!(Confidence::Percent(85.0).label(), "80-89");
        assert_eq!(Confidence::Percent(100.0).label(), "90-100");
        assert_eq!(Confidence::Category("h".into()).label(), "high");
        assert_eq!(Confidence::Unknown.label(), "unknown");
    }

    #[test]
    fn test_fractional_confidence_keeps_feed_text() {
        let c = Confidence::parse(Some("89.7"));
        assert_eq!(c.to_string(), "89.7");
        assert_eq!(c.label(), "80-89");
        assert_eq!(Confidence::parse(Some("85")).to_string(), "85");
    }
}
