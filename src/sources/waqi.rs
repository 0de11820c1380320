//! WAQI adapters: station-index feeds.
//!
//! WAQI serves precomputed station indices rather than raw concentrations.
//! [`WaqiCitySource`] polls a configured city list through the per-city
//! feed endpoint; [`WaqiBoundsSource`] queries every station inside a
//! bounding box in one call. Both expect the API token as a `token` URL
//! parameter, so construct them over a
//! [`UrlParam`](crate::fetch::auth::UrlParam)-wrapped client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::fetch::{HttpClient, fetch_json};
use crate::reading::{Bounds, Reading};
use crate::sources::{SourceAdapter, value_as_index};

const BASE_URL: &str = "https://api.waqi.info";

/// Default polling list: the major Indian cities with reliable stations.
pub const DEFAULT_CITIES: &[&str] = &[
    "delhi",
    "mumbai",
    "bangalore",
    "hyderabad",
    "ahmedabad",
    "chennai",
    "kolkata",
    "pune",
    "jaipur",
    "lucknow",
];

pub struct WaqiCitySource<C> {
    client: C,
    base_url: String,
    cities: Vec<String>,
}

impl<C> WaqiCitySource<C> {
    pub fn new(client: C, cities: Vec<String>) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            cities,
        }
    }
}

#[async_trait]
impl<C: HttpClient> SourceAdapter for WaqiCitySource<C> {
    fn name(&self) -> &str {
        "waqi-city"
    }

    async fn fetch(&self, bounds: &Bounds) -> Result<Vec<Reading>, SourceError> {
        let mut readings = Vec::new();
        let mut last_error: Option<SourceError> = None;

        for city in &self.cities {
            let url = format!("{}/feed/{}/", self.base_url, city);
            match fetch_json::<_, Value>(&self.client, &url).await {
                Ok(payload) => match reading_from_city_payload(&payload, self.name()) {
                    Some(r) if bounds.contains(r.lat, r.lon) => readings.push(r),
                    Some(_) => {}
                    None => debug!(city, "WAQI city payload skipped as malformed"),
                },
                Err(e) => {
                    warn!(city, error = %e, "WAQI city fetch failed");
                    last_error = Some(e);
                }
            }
        }

        // One dead city is tolerable; a completely dark feed is not.
        if readings.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(readings)
    }
}

/// Normalizes one `/feed/{city}/` payload:
/// `data.{city.{name,geo}, aqi, iaqi.{pm25,pm10,...}.v, time.iso}`.
fn reading_from_city_payload(payload: &Value, source: &str) -> Option<Reading> {
    if payload["status"].as_str() != Some("ok") {
        return None;
    }
    let data = &payload["data"];

    let geo = data["city"]["geo"].as_array()?;
    let lat = geo.first()?.as_f64()?;
    let lon = geo.get(1)?.as_f64()?;

    let observed_at = data["time"]["iso"]
        .as_str()
        .and_then(|iso| DateTime::parse_from_rfc3339(iso).ok())
        .map(|ts| ts.with_timezone(&Utc))?;

    let reading = Reading {
        lat,
        lon,
        pm25: data["iaqi"]["pm25"]["v"].as_f64(),
        pm10: data["iaqi"]["pm10"]["v"].as_f64(),
        index: value_as_index(&data["aqi"]),
        source: source.to_string(),
        location_name: data["city"]["name"].as_str().map(str::to_string),
        observed_at,
        verified: true,
        ..Default::default()
    };

    reading.validated().ok()
}

pub struct WaqiBoundsSource<C> {
    client: C,
    base_url: String,
}

impl<C> WaqiBoundsSource<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> SourceAdapter for WaqiBoundsSource<C> {
    fn name(&self) -> &str {
        "waqi-bounds"
    }

    async fn fetch(&self, bounds: &Bounds) -> Result<Vec<Reading>, SourceError> {
        let url = format!(
            "{}/map/bounds?latlng={}",
            self.base_url,
            bounds.as_latlng_param()
        );

        let payload: Value = fetch_json(&self.client, &url).await?;
        let (readings, skipped) = readings_from_bounds_payload(&payload, self.name())?;

        if skipped > 0 {
            debug!(skipped, "WAQI stations skipped as malformed");
        }

        Ok(readings)
    }
}

/// Normalizes a `/map/bounds` payload: `data[].{lat, lon, aqi, station.name}`.
/// Stations are stamped with the fetch time; the bounds API carries none.
fn readings_from_bounds_payload(
    payload: &Value,
    source: &str,
) -> Result<(Vec<Reading>, usize), SourceError> {
    if payload["status"].as_str() != Some("ok") {
        return Err(SourceError::Malformed(format!(
            "WAQI status was not ok: {}",
            payload["data"].as_str().unwrap_or("unknown")
        )));
    }

    let stations = payload["data"]
        .as_array()
        .ok_or_else(|| SourceError::Malformed("WAQI bounds data is not an array".into()))?;

    let now = Utc::now();
    let mut readings = Vec::new();
    let mut skipped = 0usize;

    for station in stations {
        let candidate = (|| {
            let reading = Reading {
                lat: station["lat"].as_f64()?,
                lon: station["lon"].as_f64()?,
                index: Some(value_as_index(&station["aqi"])?),
                source: source.to_string(),
                location_name: station["station"]["name"].as_str().map(str::to_string),
                observed_at: now,
                verified: true,
                ..Default::default()
            };
            reading.validated().ok()
        })();

        match candidate {
            Some(r) => readings.push(r),
            None => skipped += 1,
        }
    }

    Ok((readings, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_city_payload_parses() {
        let payload = json!({
            "status": "ok",
            "data": {
                "aqi": 183,
                "city": {"name": "Delhi", "geo": [28.64, 77.22]},
                "iaqi": {"pm25": {"v": 183.0}, "pm10": {"v": 121.0}},
                "time": {"iso": "2025-11-02T06:00:00+05:30"}
            }
        });

        let r = reading_from_city_payload(&payload, "waqi-city").unwrap();
        assert_eq!(r.lat, 28.64);
        assert_eq!(r.lon, 77.22);
        assert_eq!(r.index, Some(183));
        assert_eq!(r.pm25, Some(183.0));
        assert_eq!(r.location_name.as_deref(), Some("Delhi"));
    }

    #[test]
    fn test_city_payload_error_status_skipped() {
        let payload = json!({"status": "error", "data": "Unknown station"});
        assert!(reading_from_city_payload(&payload, "waqi-city").is_none());
    }

    #[test]
    fn test_city_payload_missing_geo_skipped() {
        let payload = json!({
            "status": "ok",
            "data": {"aqi": 50, "city": {"name": "Nowhere"},
                     "time": {"iso": "2025-11-02T06:00:00Z"}}
        });
        assert!(reading_from_city_payload(&payload, "waqi-city").is_none());
    }

    #[test]
    fn test_bounds_payload_parses_and_counts_malformed() {
        let payload = json!({
            "status": "ok",
            "data": [
                {"lat": 28.6, "lon": 77.2, "aqi": "166", "station": {"name": "ITO, Delhi"}},
                {"lat": 19.1, "lon": 72.9, "aqi": 95, "station": {"name": "Bandra"}},
                {"lat": 22.5, "lon": 88.3, "aqi": "-"}
            ]
        });

        let (readings, skipped) = readings_from_bounds_payload(&payload, "waqi-bounds").unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(readings[0].index, Some(166));
        assert_eq!(readings[1].index, Some(95));
        assert!(readings.iter().all(|r| !r.has_any_concentration()));
    }

    #[test]
    fn test_bounds_payload_error_status_is_source_error() {
        let payload = json!({"status": "error", "data": "Invalid key"});
        assert!(matches!(
            readings_from_bounds_payload(&payload, "waqi-bounds"),
            Err(SourceError::Malformed(_))
        ));
    }
}
