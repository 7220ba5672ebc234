//! Aggregates over a selection of detections: key metrics and chart series.
//!
//! Every function accepts an empty selection and returns an empty series or
//! `None` metrics rather than failing.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::detection::FireDetection;

/// Placeholder shown for metrics that are undefined on an empty selection.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub count: usize,
    pub max_brightness: Option<f64>,
    pub latest_date: Option<NaiveDate>,
}

impl Kpis {
    /// Display strings in the order count, max brightness, latest detection.
    pub fn display(&self) -> [String; 3] {
        [
            self.count.to_string(),
            self.max_brightness
                .map(|b| format!("{b:.1}"))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            self.latest_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceShare {
    pub name: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBin {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBin {
    pub label: String,
    pub count: usize,
}

pub fn compute_kpis(rows: &[&FireDetection]) -> Kpis {
    Kpis {
        count: rows.len(),
        max_brightness: rows
            .iter()
            .filter_map(|r| r.brightness)
            .fold(None, |acc: Option<f64>, b| Some(acc.map_or(b, |a| a.max(b)))),
        latest_date: rows.iter().map(|r| r.acq_date).max(),
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Share of detections per satellite in percent, rounded to two decimals.
///
/// Sorted by descending count, ties broken by name.
pub fn satellite_share(rows: &[&FireDetection]) -> Vec<SliceShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        *counts.entry(r.satellite.as_str()).or_default() += 1;
    }

    let mut shares: Vec<SliceShare> = counts
        .into_iter()
        .map(|(name, count)| SliceShare {
            name: name.to_string(),
            count,
            percent: round2(pct(count, rows.len())),
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    shares
}

/// Detections per UTC hour (`acq_time / 100`). Only hours that occur are listed.
pub fn hourly_histogram(rows: &[&FireDetection]) -> Vec<HourBin> {
    let mut bins: BTreeMap<u32, usize> = BTreeMap::new();
    for hour in rows.iter().filter_map(|r| r.hour_bucket()) {
        *bins.entry(hour).or_default() += 1;
    }
    bins.into_iter()
        .map(|(hour, count)| HourBin { hour, count })
        .collect()
}

/// Detections per confidence label, percent bins first then categories.
pub fn confidence_histogram(rows: &[&FireDetection]) -> Vec<LabelBin> {
    let mut bins: BTreeMap<(u32, String), usize> = BTreeMap::new();
    for r in rows {
        *bins
            .entry((r.confidence.sort_key(), r.confidence.label()))
            .or_default() += 1;
    }
    bins.into_iter()
        .map(|((_, label), count)| LabelBin { label, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Confidence;

    fn rows(data: &[(&str, f64, &str)]) -> Vec<FireDetection> {
        data.iter()
            .map(|(d, b, s)| FireDetection::sample(d, *b, s))
            .collect()
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_kpis_for_selected_date() {
        let owned = rows(&[("2024-05-02", 310.5, "Aqua"), ("2024-05-02", 295.0, "Terra")]);
        let sel: Vec<&FireDetection> = owned.iter().collect();
        let k = compute_kpis(&sel);

        assert_eq!(k.count, 2);
        assert_eq!(k.max_brightness, Some(310.5));
        assert_eq!(k.latest_date, Some("2024-05-02".parse().unwrap()));
        assert_eq!(k.display(), ["2".to_string(), "310.5".into(), "2024-05-02".into()]);
    }

    #[test]
    fn test_kpis_empty_use_placeholder() {
        let k = compute_kpis(&[]);
        assert_eq!(k.count, 0);
        assert_eq!(k.max_brightness, None);
        assert_eq!(k.latest_date, None);
        assert_eq!(k.display()[1], PLACEHOLDER);
        assert_eq!(k.display()[2], PLACEHOLDER);
    }

    #[test]
    fn test_satellite_share() {
        let owned = rows(&[
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Terra"),
        ]);
        let sel: Vec<&FireDetection> = owned.iter().collect();
        let shares = satellite_share(&sel);

        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].name, "Aqua");
        assert_eq!(shares[0].percent, 66.67);
        assert_eq!(shares[1].name, "Terra");
        assert_eq!(shares[1].percent, 33.33);
        let total: f64 = shares.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 0.02);
    }

    #[test]
    fn test_hourly_histogram_buckets() {
        let mut owned = rows(&[
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Terra"),
        ]);
        owned[0].acq_time = Some(1345);
        owned[1].acq_time = Some(59);
        owned[2].acq_time = Some(1301);
        let sel: Vec<&FireDetection> = owned.iter().collect();

        assert_eq!(
            hourly_histogram(&sel),
            vec![HourBin { hour: 0, count: 1 }, HourBin { hour: 13, count: 2 }]
        );
    }

    #[test]
    fn test_confidence_histogram_orders_bins() {
        let mut owned = rows(&[
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Aqua"),
            ("2024-05-02", 300.0, "Terra"),
            ("2024-05-02", 300.0, "Terra"),
        ]);
        owned[0].confidence = Confidence::Percent(85.0);
        owned[1].confidence = Confidence::Percent(12.0);
        owned[2].confidence = Confidence::Category("h".into());
        owned[3].confidence = Confidence::Percent(81.0);
        let sel: Vec<&FireDetection> = owned.iter().collect();

        let labels: Vec<(String, usize)> = confidence_histogram(&sel)
            .into_iter()
            .map(|b| (b.label, b.count))
            .collect();
        assert_eq!(
            labels,
            vec![("10-19".to_string(), 1), ("80-89".to_string(), 2), ("high".to_string(), 1)]
        );
    }

    #[test]
    fn test_empty_series() {
        assert!(satellite_share(&[]).is_empty());
        assert!(hourly_histogram(&[]).is_empty());
        assert!(confidence_histogram(&[]).is_empty());
    }
}
