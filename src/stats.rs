//! Per-cycle summary over merged readings, for logging and inspection.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::reading::Reading;

#[derive(Debug, Default, Serialize)]
pub struct ReadingStats {
    pub total: usize,

    // field coverage
    pub with_pm25: usize,
    pub with_pm10: usize,
    pub with_index: usize,
    pub verified: usize,

    pub sources: usize,

    // over readings with a defined index
    pub mean_index: f64,
    pub stddev_index: f64,
    pub max_index: Option<u16>,
}

impl ReadingStats {
    pub fn from_readings(readings: &[Reading]) -> Self {
        let mut s = ReadingStats {
            total: readings.len(),
            ..Default::default()
        };

        let mut sources = BTreeSet::new();
        let mut indices = Vec::new();

        for r in readings {
            if r.pm25.is_some() {
                s.with_pm25 += 1;
            }
            if r.pm10.is_some() {
                s.with_pm10 += 1;
            }
            if let Some(idx) = r.index {
                s.with_index += 1;
                indices.push(idx as f64);
                s.max_index = Some(s.max_index.map_or(idx, |m| m.max(idx)));
            }
            if r.verified {
                s.verified += 1;
            }
            sources.insert(r.source.as_str());
        }

        s.sources = sources.len();
        s.mean_index = mean(&indices);
        s.stddev_index = stddev(&indices, s.mean_index);

        s
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(source: &str, index: Option<u16>, pm25: Option<f64>) -> Reading {
        Reading {
            lat: 28.6,
            lon: 77.2,
            pm25,
            index,
            source: source.to_string(),
            observed_at: Utc::now(),
            verified: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        let s = ReadingStats::from_readings(&[]);
        assert_eq!(s.total, 0);
        assert_eq!(s.mean_index, 0.0);
        assert_eq!(s.max_index, None);
    }

    #[test]
    fn test_coverage_counts() {
        let rows = vec![
            reading("openaq", None, Some(80.0)),
            reading("waqi-city", Some(120), Some(120.0)),
            reading("waqi-bounds", Some(160), None),
        ];
        let s = ReadingStats::from_readings(&rows);

        assert_eq!(s.total, 3);
        assert_eq!(s.with_pm25, 2);
        assert_eq!(s.with_index, 2);
        assert_eq!(s.verified, 3);
        assert_eq!(s.sources, 3);
        assert_eq!(s.mean_index, 140.0);
        assert_eq!(s.max_index, Some(160));
    }

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
        assert_eq!(stddev(&[2.0, 4.0], 3.0), 1.0);
    }
}
