//! Output formatting and persistence for dashboard views and exports.
//!
//! Supports pretty-printing, JSON serialization, and CSV export of the
//! selected detections.

use anyhow::Result;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use crate::dashboard::DashboardView;
use crate::detection::FireDetection;
use csv::WriterBuilder;
use std::fs::File;

/// Flat CSV row. Column order follows the FIRMS feed.
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    latitude: f64,
    longitude: f64,
    brightness: Option<f64>,
    scan: Option<f64>,
    track: Option<f64>,
    acq_date: String,
    acq_time: Option<u32>,
    satellite: &'a str,
    instrument: Option<&'a str>,
    confidence: String,
    version: Option<&'a str>,
    bright_t31: Option<f64>,
    frp: Option<f64>,
    daynight: Option<&'a str>,
    value: Option<f64>,
    geometry: String,
}

impl<'a> From<&'a FireDetection> for ExportRecord<'a> {
    fn from(r: &'a FireDetection) -> Self {
        ExportRecord {
            latitude: r.latitude,
            longitude: r.longitude,
            brightness: r.brightness,
            scan: r.scan,
            track: r.track,
            acq_date: r.acq_date.to_string(),
            acq_time: r.acq_time,
            satellite: &r.satellite,
            instrument: r.instrument.as_deref(),
            confidence: r.confidence.to_string(),
            version: r.version.as_deref(),
            bright_t31: r.bright_t31,
            frp: r.frp,
            daynight: r.daynight.as_deref(),
            value: r.value,
            geometry: format!("POINT ({} {})", r.geometry.x, r.geometry.y),
        }
    }
}

/// Logs a dashboard view using Rust's debug pretty-print format.
pub fn print_pretty(view: &DashboardView) {
    debug!("{:#?}", view);
}

/// Logs a dashboard view as pretty-printed JSON.
pub fn print_json(view: &DashboardView) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

fn write_rows<W: std::io::Write>(writer: W, rows: &[&FireDetection]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(ExportRecord::from(*row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes the selection to CSV text. Returns `None` for an empty
/// selection, in which case no download is offered.
pub fn export_csv(rows: &[&FireDetection]) -> Result<Option<Bytes>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    write_rows(&mut buf, rows)?;
    Ok(Some(Bytes::from(buf)))
}

/// Writes the selection to `path`. Nothing is written for an empty
/// selection; returns whether a file was produced.
pub fn write_export(path: &str, rows: &[&FireDetection]) -> Result<bool> {
    if rows.is_empty() {
        debug!(path, "Empty selection, skipping export");
        return Ok(false);
    }
    let file = File::create(path)?;
    write_rows(file, rows)?;
    info!(path, rows = rows.len(), "Export written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{DashboardState, render};
    use crate::detection::FireTable;
    use std::env;
    use std::fs;
    use std::path::Path;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let table = FireTable::new(vec![], "test", 0);
        print_pretty(&render(&table, &DashboardState::default()));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let table = FireTable::new(vec![FireDetection::sample("2024-05-02", 300.0, "Aqua")], "test", 0);
        print_json(&render(&table, &DashboardState::default())).unwrap();
    }

    #[test]
    fn test_export_empty_is_none() {
        assert!(export_csv(&[]).unwrap().is_none());
    }

    #[test]
    fn test_export_has_header_and_rows() {
        let a = FireDetection::sample("2024-05-02", 310.5, "Aqua");
        let b = FireDetection::sample("2024-05-02", 295.0, "Terra");
        let bytes = export_csv(&[&a, &b]).unwrap().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("latitude,longitude,brightness,"));
        assert!(lines[0].ends_with(",value,geometry"));
        assert!(lines[1].contains("2024-05-02"));
        assert!(lines[1].contains("Aqua"));
        assert!(lines[1].ends_with("310.5,POINT (-110 55)"));
    }

    #[test]
    fn test_write_export_skips_empty() {
        let path = temp_path("wildfire_dash_test_empty_export.csv");
        let _ = fs::remove_file(&path);

        assert!(!write_export(&path, &[]).unwrap());
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_write_export_creates_file() {
        let path = temp_path("wildfire_dash_test_export.csv");
        let _ = fs::remove_file(&path);

        let a = FireDetection::sample("2024-05-02", 310.5, "Aqua");
        assert!(write_export(&path, &[&a]).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }
}
