//! Explicit pipeline configuration.
//!
//! Credentials and knobs are injected here instead of living in
//! module-level clients, so tests can run the aggregator against fakes.

use std::time::Duration;

use crate::reading::Bounds;

/// Env var holding the OpenAQ API key (sent as an `X-API-Key` header).
pub const OPENAQ_API_KEY_VAR: &str = "OPENAQ_API_KEY";
/// Env var holding the WAQI API token (sent as a `token` URL parameter).
pub const WAQI_API_TOKEN_VAR: &str = "WAQI_API_TOKEN";

/// Knobs for one aggregation cycle.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of sources fetched at once.
    pub concurrency: usize,
    /// Deadline for a single source; a slower source is recorded as a
    /// timeout failure without blocking the others.
    pub per_source_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            concurrency: 5,
            per_source_timeout: Duration::from_secs(30),
        }
    }
}

/// Default coverage region (India).
pub fn default_bounds() -> Bounds {
    Bounds::new(37.6, 6.4, 97.25, 68.7).expect("default bounds are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AggregatorConfig::default();
        assert_eq!(cfg.concurrency, 5);
        assert_eq!(cfg.per_source_timeout, Duration::from_secs(30));
        let b = default_bounds();
        assert!(b.contains(28.6, 77.2));
    }
}
