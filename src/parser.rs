//! CSV parser and normalizer for FIRMS active fire feeds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::detection::{Confidence, FireDetection, FireTable, Point};
use crate::error::{FeedError, Result};

/// Columns every feed must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "latitude",
    "longitude",
    "acq_date",
    "acq_time",
    "brightness",
    "confidence",
    "satellite",
];

/// A row as it appears in the feed. Everything is text so that a bad value
/// drops the row instead of failing the whole document.
#[derive(Debug, Deserialize)]
struct RawDetection {
    latitude: Option<String>,
    longitude: Option<String>,
    acq_date: Option<String>,
    acq_time: Option<String>,
    brightness: Option<String>,
    confidence: Option<String>,
    satellite: Option<String>,

    scan: Option<String>,
    track: Option<String>,
    bright_t31: Option<String>,
    frp: Option<String>,
    daynight: Option<String>,
    instrument: Option<String>,
    version: Option<String>,
}

/// Parses and normalizes a FIRMS CSV document into a [`FireTable`].
///
/// Rows with a missing or unparseable latitude, longitude or acquisition date
/// are dropped. A document with a valid header and no usable rows yields an
/// empty table.
///
/// # Errors
///
/// Returns [`FeedError::Schema`] if a required column is absent and
/// [`FeedError::Csv`] if the document is not well-formed CSV.
pub fn parse_feed(bytes: &[u8], source: &str) -> Result<FireTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(FeedError::Schema(column));
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0;

    for result in rdr.deserialize() {
        let raw: RawDetection = result?;
        match normalize(raw) {
            Some(detection) => rows.push(detection),
            None => dropped += 1,
        }
    }

    debug!(source, kept = rows.len(), dropped, "Feed normalized");
    Ok(FireTable::new(rows, source, dropped))
}

fn normalize(raw: RawDetection) -> Option<FireDetection> {
    let latitude = parse_f64(raw.latitude.as_deref())?;
    let longitude = parse_f64(raw.longitude.as_deref())?;
    let acq_date = parse_acq_date(raw.acq_date.as_deref()?)?;
    let brightness = parse_f64(raw.brightness.as_deref());

    Some(FireDetection {
        latitude,
        longitude,
        acq_date,
        acq_time: parse_acq_time(raw.acq_time.as_deref()),
        brightness,
        confidence: Confidence::parse(raw.confidence.as_deref()),
        satellite: raw.satellite.unwrap_or_default(),
        geometry: Point::from_lon_lat(longitude, latitude),
        value: brightness,
        scan: parse_f64(raw.scan.as_deref()),
        track: parse_f64(raw.track.as_deref()),
        bright_t31: parse_f64(raw.bright_t31.as_deref()),
        frp: parse_f64(raw.frp.as_deref()),
        daynight: raw.daynight,
        instrument: raw.instrument,
        version: raw.version,
    })
}

fn parse_f64(s: Option<&str>) -> Option<f64> {
    s?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an acquisition date, returning `None` for anything unrecognized.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339.
pub fn parse_acq_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parses an HHMM acquisition time. Values outside 0000-2359 are rejected.
pub fn parse_acq_time(s: Option<&str>) -> Option<u32> {
    let t = s?.trim().parse::<u32>().ok()?;
    (t % 100 < 60 && t / 100 < 24).then_some(t)
}
