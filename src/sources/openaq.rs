//! OpenAQ adapter: a concentration-based feed.
//!
//! Serves raw pollutant concentrations (µg/m³) per monitoring location;
//! the aggregator derives indices from them later. Authentication is an
//! `X-API-Key` header, so the adapter is typically constructed over an
//! [`ApiKey`](crate::fetch::auth::ApiKey)-wrapped client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::aqi::Pollutant;
use crate::error::SourceError;
use crate::fetch::{HttpClient, fetch_json};
use crate::reading::{Bounds, Reading};
use crate::sources::SourceAdapter;

pub const SOURCE_NAME: &str = "openaq";
const BASE_URL: &str = "https://api.openaq.org/v3";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    results: Vec<LatestResult>,
}

#[derive(Debug, Deserialize)]
struct LatestResult {
    coordinates: Option<Coordinates>,
    location: Option<String>,
    #[serde(default)]
    measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    parameter: String,
    value: Option<f64>,
    date: Option<MeasurementDate>,
}

#[derive(Debug, Deserialize)]
struct MeasurementDate {
    utc: String,
}

pub struct OpenAqSource<C> {
    client: C,
    base_url: String,
    country: String,
    limit: usize,
}

impl<C> OpenAqSource<C> {
    pub fn new(client: C, country: impl Into<String>) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            country: country.into(),
            limit: 1000,
        }
    }
}

#[async_trait]
impl<C: HttpClient> SourceAdapter for OpenAqSource<C> {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, bounds: &Bounds) -> Result<Vec<Reading>, SourceError> {
        let url = format!(
            "{}/latest?country={}&limit={}",
            self.base_url, self.country, self.limit
        );

        let resp: LatestResponse = fetch_json(&self.client, &url).await?;
        let (readings, skipped) = readings_from_latest(resp, bounds);

        if skipped > 0 {
            debug!(skipped, "OpenAQ records skipped as malformed");
        }

        Ok(readings)
    }
}

/// Normalizes a latest-measurements payload, returning the readings inside
/// `bounds` plus the count of records skipped as malformed.
fn readings_from_latest(resp: LatestResponse, bounds: &Bounds) -> (Vec<Reading>, usize) {
    let mut readings = Vec::new();
    let mut skipped = 0usize;

    for result in resp.results {
        let Some(Coordinates {
            latitude: Some(lat),
            longitude: Some(lon),
        }) = result.coordinates
        else {
            skipped += 1;
            continue;
        };

        if !bounds.contains(lat, lon) {
            continue;
        }

        let mut reading = Reading {
            lat,
            lon,
            source: SOURCE_NAME.to_string(),
            location_name: result.location,
            verified: true,
            ..Default::default()
        };

        let mut observed_at: Option<DateTime<Utc>> = None;

        for m in &result.measurements {
            let Some(pollutant) = Pollutant::from_parameter(&m.parameter) else {
                continue;
            };
            let Some(value) = m.value else { continue };
            reading.set_concentration(pollutant, Some(value));

            if let Some(date) = &m.date {
                if let Ok(ts) = DateTime::parse_from_rfc3339(&date.utc) {
                    let ts = ts.with_timezone(&Utc);
                    // Latest observation across the station's sensors.
                    observed_at = Some(observed_at.map_or(ts, |prev| prev.max(ts)));
                }
            }
        }

        let Some(observed_at) = observed_at else {
            skipped += 1;
            continue;
        };
        reading.observed_at = observed_at;

        match reading.validated() {
            Ok(r) => readings.push(r),
            Err(_) => skipped += 1,
        }
    }

    (readings, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bounds() -> Bounds {
        Bounds::new(37.6, 6.4, 97.25, 68.7).unwrap()
    }

    fn payload(json: serde_json::Value) -> LatestResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parses_concentration_records() {
        let resp = payload(serde_json::json!({
            "results": [{
                "location": "Anand Vihar",
                "coordinates": {"latitude": 28.65, "longitude": 77.31},
                "measurements": [
                    {"parameter": "pm25", "value": 180.0, "date": {"utc": "2025-11-02T06:00:00Z"}},
                    {"parameter": "pm10", "value": 290.0, "date": {"utc": "2025-11-02T06:00:00Z"}}
                ]
            }]
        }));

        let (readings, skipped) = readings_from_latest(resp, &test_bounds());
        assert_eq!(skipped, 0);
        assert_eq!(readings.len(), 1);
        let r = &readings[0];
        assert_eq!(r.pm25, Some(180.0));
        assert_eq!(r.pm10, Some(290.0));
        assert_eq!(r.index, None);
        assert_eq!(r.source, "openaq");
        assert!(r.verified);
        assert_eq!(r.location_name.as_deref(), Some("Anand Vihar"));
    }

    #[test]
    fn test_skips_records_missing_coordinates() {
        let resp = payload(serde_json::json!({
            "results": [
                {"measurements": [{"parameter": "pm25", "value": 12.0,
                                   "date": {"utc": "2025-11-02T06:00:00Z"}}]},
                {"coordinates": {"latitude": 28.65, "longitude": 77.31},
                 "measurements": [{"parameter": "pm25", "value": 12.0,
                                   "date": {"utc": "2025-11-02T06:00:00Z"}}]}
            ]
        }));

        let (readings, skipped) = readings_from_latest(resp, &test_bounds());
        assert_eq!(readings.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_filters_to_bounds() {
        let resp = payload(serde_json::json!({
            "results": [{
                "coordinates": {"latitude": 51.5, "longitude": -0.1},
                "measurements": [{"parameter": "pm25", "value": 9.0,
                                  "date": {"utc": "2025-11-02T06:00:00Z"}}]
            }]
        }));

        let (readings, skipped) = readings_from_latest(resp, &test_bounds());
        assert!(readings.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_unknown_parameters_ignored() {
        let resp = payload(serde_json::json!({
            "results": [{
                "coordinates": {"latitude": 28.65, "longitude": 77.31},
                "measurements": [
                    {"parameter": "bc", "value": 5.0, "date": {"utc": "2025-11-02T06:00:00Z"}},
                    {"parameter": "no2", "value": 41.0, "date": {"utc": "2025-11-02T07:00:00Z"}}
                ]
            }]
        }));

        let (readings, _) = readings_from_latest(resp, &test_bounds());
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].no2, Some(41.0));
        assert_eq!(
            readings[0].observed_at,
            DateTime::parse_from_rfc3339("2025-11-02T07:00:00Z").unwrap()
        );
    }
}
