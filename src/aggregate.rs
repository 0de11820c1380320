//! Multi-source aggregation: concurrent fetch with partial-failure
//! reporting, then deterministic dedup and index normalization.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, info, warn};

use crate::aqi;
use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::reading::{Bounds, Reading};
use crate::sources::SourceAdapter;

/// Inverse of the location rounding step used in the dedup key
/// (1e4 per degree, ~11 m).
const LOCATION_PRECISION: f64 = 1e4;
/// Time-bucket width for the dedup key, in seconds.
const TIME_BUCKET_SECS: i64 = 3600;

/// A half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

/// One source's failure during a fetch cycle. Non-fatal: the cycle's other
/// sources still contribute.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: SourceError,
}

/// Everything one fetch cycle produced.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub readings: Vec<Reading>,
    pub failures: Vec<SourceFailure>,
}

impl FetchReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Aggregator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, config: AggregatorConfig) -> Self {
        Self { sources, config }
    }

    /// Fetches every configured source concurrently under the configured
    /// ceiling, with a per-source deadline. Always returns whatever
    /// succeeded; failures are reported, never propagated.
    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn fetch_all(&self, bounds: &Bounds) -> FetchReport {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency));
        let timeout = self.config.per_source_timeout;

        let mut tasks = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let sem = semaphore.clone();
            let source = source.clone();
            let bounds = *bounds;

            let span = tracing::info_span!("fetch_source", source = %source.name());

            tasks.push(tokio::spawn(
                async move {
                    let _permit = sem.acquire().await.unwrap();
                    let name = source.name().to_string();

                    let outcome = match tokio::time::timeout(timeout, source.fetch(&bounds)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout(timeout.as_secs())),
                    };

                    (name, outcome)
                }
                .instrument(span),
            ));
        }

        let mut report = FetchReport::default();

        for task in tasks {
            match task.await {
                Ok((source, Ok(readings))) => {
                    info!(source, count = readings.len(), "Source fetch succeeded");
                    report.readings.extend(readings);
                }
                Ok((source, Err(error))) => {
                    warn!(source, error = %error, "Source fetch failed");
                    report.failures.push(SourceFailure { source, error });
                }
                Err(e) => {
                    warn!(error = %e, "Source fetch task panicked");
                    report.failures.push(SourceFailure {
                        source: "unknown".to_string(),
                        error: SourceError::Malformed(format!("task join error: {e}")),
                    });
                }
            }
        }

        report
    }
}

/// Merges one cycle's readings: window filter, dedup by (source, rounded
/// location, time bucket), index normalization, deterministic ordering.
///
/// For duplicates, a reading with a precomputed index beats one that needs
/// conversion; among equals the more recently observed wins. The output
/// order depends only on the readings themselves, not on arrival order.
pub fn merge(readings: Vec<Reading>, window: &TimeWindow) -> Vec<Reading> {
    let mut chosen: HashMap<(String, i64, i64, i64), Reading> = HashMap::new();

    for reading in readings {
        if !window.contains(reading.observed_at) {
            continue;
        }

        let key = dedup_key(&reading);
        match chosen.get_mut(&key) {
            Some(incumbent) => {
                if wins_over(&reading, incumbent) {
                    *incumbent = reading;
                }
            }
            None => {
                chosen.insert(key, reading);
            }
        }
    }

    let mut merged: Vec<Reading> = chosen.into_values().map(normalize_index).collect();

    merged.sort_by(|a, b| {
        a.lat
            .total_cmp(&b.lat)
            .then(a.lon.total_cmp(&b.lon))
            .then(a.observed_at.cmp(&b.observed_at))
            .then_with(|| a.source.cmp(&b.source))
    });

    merged
}

fn dedup_key(r: &Reading) -> (String, i64, i64, i64) {
    (
        r.source.clone(),
        (r.lat * LOCATION_PRECISION).round() as i64,
        (r.lon * LOCATION_PRECISION).round() as i64,
        r.observed_at.timestamp().div_euclid(TIME_BUCKET_SECS),
    )
}

/// Total preference order so the winner is independent of arrival order.
fn wins_over(candidate: &Reading, incumbent: &Reading) -> bool {
    candidate
        .index
        .is_some()
        .cmp(&incumbent.index.is_some())
        .then(candidate.observed_at.cmp(&incumbent.observed_at))
        .then(candidate.index.cmp(&incumbent.index))
        .then(
            candidate
                .pm25
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&incumbent.pm25.unwrap_or(f64::NEG_INFINITY)),
        )
        == Ordering::Greater
}

/// Fills a missing overall index from concentrations. A concentration
/// outside breakpoint coverage stays undefined rather than becoming zero.
fn normalize_index(mut reading: Reading) -> Reading {
    if reading.index.is_none() {
        let sub_indices = crate::aqi::Pollutant::ALL
            .iter()
            .filter_map(|p| reading.concentration(*p).and_then(|c| aqi::sub_index(*p, c)));
        reading.index = aqi::overall_index(sub_indices);
    }
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 2, hour, min, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow {
            start: at(0, 0),
            end: Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap(),
        }
    }

    fn reading(lat: f64, lon: f64, observed_at: DateTime<Utc>) -> Reading {
        Reading {
            lat,
            lon,
            pm25: Some(80.0),
            source: "test".to_string(),
            observed_at,
            verified: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_fills_index_from_concentration() {
        let merged = merge(vec![reading(28.6, 77.2, at(6, 0))], &window());
        assert_eq!(merged.len(), 1);
        // PM2.5 = 80 falls in the 55.5–150.4 tier
        assert_eq!(merged[0].index, Some(164));
    }

    #[test]
    fn test_merge_keeps_undefined_index_undefined() {
        let mut r = reading(28.6, 77.2, at(6, 0));
        r.pm25 = Some(9999.0); // beyond table ceiling
        let merged = merge(vec![r], &window());
        assert_eq!(merged[0].index, None);
    }

    #[test]
    fn test_merge_window_filter() {
        let inside = reading(28.6, 77.2, at(6, 0));
        let outside = reading(19.0, 72.8, Utc.with_ymd_and_hms(2025, 11, 1, 6, 0, 0).unwrap());
        let merged = merge(vec![inside, outside], &window());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].lat, 28.6);
    }

    #[test]
    fn test_merge_precomputed_index_wins_regardless_of_order() {
        let converted = reading(28.6, 77.2, at(6, 30));
        let mut precomputed = reading(28.6, 77.2, at(6, 0));
        precomputed.pm25 = None;
        precomputed.index = Some(120);

        let a = merge(vec![converted.clone(), precomputed.clone()], &window());
        let b = merge(vec![precomputed, converted], &window());

        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].index, Some(120));
    }

    #[test]
    fn test_merge_more_recent_wins_among_converted() {
        let older = reading(28.6, 77.2, at(5, 50));
        let mut newer = reading(28.6, 77.2, at(6, 10));
        newer.pm25 = Some(20.0);

        // 05:50 and 06:10 land in different hour buckets; same bucket case:
        let mut newer_same_bucket = newer.clone();
        newer_same_bucket.observed_at = at(5, 59);

        let merged = merge(vec![older.clone(), newer_same_bucket.clone()], &window());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pm25, Some(20.0));

        let merged = merge(vec![newer_same_bucket, older], &window());
        assert_eq!(merged[0].pm25, Some(20.0));
    }

    #[test]
    fn test_merge_distinct_sources_not_deduped() {
        let a = reading(28.6, 77.2, at(6, 0));
        let mut b = reading(28.6, 77.2, at(6, 0));
        b.source = "other".to_string();
        let merged = merge(vec![a, b], &window());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_output_sorted_by_location_then_time() {
        let rows = vec![
            reading(30.0, 70.0, at(6, 0)),
            reading(10.0, 90.0, at(6, 0)),
            reading(10.0, 80.0, at(9, 0)),
            reading(10.0, 80.0, at(6, 0)),
        ];
        let merged = merge(rows, &window());
        let keys: Vec<_> = merged
            .iter()
            .map(|r| (r.lat as i64, r.lon as i64, r.observed_at))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    struct FakeSource {
        name: &'static str,
        result: Result<Vec<Reading>, ()>,
        delay: Duration,
    }

    #[async_trait]
    impl SourceAdapter for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _bounds: &Bounds) -> Result<Vec<Reading>, SourceError> {
            tokio::time::sleep(self.delay).await;
            match &self.result {
                Ok(rs) => Ok(rs.clone()),
                Err(_) => Err(SourceError::Malformed("boom".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_all_partial_failure() {
        let good = FakeSource {
            name: "good",
            result: Ok(vec![reading(28.6, 77.2, at(6, 0))]),
            delay: Duration::ZERO,
        };
        let bad = FakeSource {
            name: "bad",
            result: Err(()),
            delay: Duration::ZERO,
        };

        let agg = Aggregator::new(
            vec![Arc::new(good), Arc::new(bad)],
            AggregatorConfig::default(),
        );
        let report = agg.fetch_all(&crate::config::default_bounds()).await;

        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "bad");
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn test_fetch_all_slow_source_times_out() {
        let fast = FakeSource {
            name: "fast",
            result: Ok(vec![reading(28.6, 77.2, at(6, 0))]),
            delay: Duration::ZERO,
        };
        let slow = FakeSource {
            name: "slow",
            result: Ok(vec![]),
            delay: Duration::from_secs(60),
        };

        let config = AggregatorConfig {
            concurrency: 2,
            per_source_timeout: Duration::from_millis(50),
        };
        let agg = Aggregator::new(vec![Arc::new(fast), Arc::new(slow)], config);
        let report = agg.fetch_all(&crate::config::default_bounds()).await;

        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, SourceError::Timeout(_)));
    }
}
