//! Pollen point-forecast baseline.
//!
//! Deterministic seasonal model: a sinusoid over the day of year plus a
//! small PM2.5 term, clamped to the 0–100 pollen index scale. Stands in
//! until a trained model replaces it; the output shape is already the one
//! the API layer serves.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

pub const MODEL_VERSION: &str = "baseline-v1";

/// One forecast point, serialized as
/// `{date, pollen_index, pollen_type, model_version}`.
#[derive(Debug, Clone, Serialize)]
pub struct PollenForecast {
    pub date: NaiveDate,
    pub pollen_index: f64,
    pub pollen_type: String,
    pub model_version: String,
}

/// Seasonal baseline index for a date, given a PM2.5 proxy (µg/m³).
pub fn baseline_index(date: NaiveDate, pm25_proxy: f64) -> f64 {
    let day_of_year = date.ordinal() as f64;
    let seasonal = 20.0 + 30.0 * (2.0 * std::f64::consts::PI * day_of_year / 365.0).sin();
    (seasonal + 0.05 * pm25_proxy).clamp(0.0, 100.0)
}

/// Produces `days` consecutive daily forecasts starting at `from`.
pub fn forecast_points(from: NaiveDate, days: u32, pm25_proxy: f64) -> Vec<PollenForecast> {
    (0..days)
        .map(|d| {
            let date = from + Duration::days(d as i64);
            PollenForecast {
                date,
                pollen_index: baseline_index(date, pm25_proxy),
                pollen_type: "general".to_string(),
                model_version: MODEL_VERSION.to_string(),
            }
        })
        .collect()
}

/// Picks a PM2.5 proxy for a location from recent readings: the value of
/// the nearest reading carrying one, within `max_km`.
pub fn pm25_proxy_near(
    readings: &[crate::reading::Reading],
    lat: f64,
    lon: f64,
    max_km: f64,
) -> Option<f64> {
    readings
        .iter()
        .filter_map(|r| {
            let pm25 = r.pm25?;
            let d = crate::geo::haversine_km(lat, lon, r.lat, r.lon);
            (d <= max_km).then_some((d, pm25))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, pm25)| pm25)
}
