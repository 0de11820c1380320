//! Adapters over external measurement feeds.
//!
//! Each adapter normalizes one provider's raw payload into [`Reading`]s.
//! Malformed individual records are skipped and counted, never fatal to the
//! batch; only a whole-feed failure (network, non-2xx, unparseable body)
//! becomes a [`SourceError`].

mod openaq;
mod waqi;

pub use openaq::OpenAqSource;
pub use waqi::{DEFAULT_CITIES, WaqiBoundsSource, WaqiCitySource};

use async_trait::async_trait;

use crate::error::SourceError;
use crate::reading::{Bounds, Reading};

/// A single external measurement source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier recorded on every reading this adapter produces.
    fn name(&self) -> &str;

    /// Fetches the current batch of readings within `bounds`.
    async fn fetch(&self, bounds: &Bounds) -> Result<Vec<Reading>, SourceError>;
}

/// Extracts an index value that providers encode as either a JSON number
/// or a numeric string (WAQI's bounds API does both; "-" means no data).
pub(crate) fn value_as_index(v: &serde_json::Value) -> Option<u16> {
    match v {
        serde_json::Value::Number(n) => {
            let n = n.as_f64()?;
            (n.is_finite() && n >= 0.0).then(|| n.round() as u16)
        }
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().and_then(|n| {
            (n.is_finite() && n >= 0.0).then(|| n.round() as u16)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_as_index_number_and_string() {
        assert_eq!(value_as_index(&json!(152)), Some(152));
        assert_eq!(value_as_index(&json!(152.4)), Some(152));
        assert_eq!(value_as_index(&json!("87")), Some(87));
        assert_eq!(value_as_index(&json!("-")), None);
        assert_eq!(value_as_index(&json!(-3)), None);
        assert_eq!(value_as_index(&json!(null)), None);
    }
}
