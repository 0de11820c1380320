//! Error taxonomy for the aggregation and interpolation pipeline.
//!
//! One source failing is never fatal to a fetch cycle: [`SourceError`]s are
//! collected into the cycle's partial-failure report. An undefined AQI is
//! `None`, not an error, and interpolating zero samples yields an empty grid.
//! Only contract violations (bad bounds, an empty reading) error eagerly.

use thiserror::Error;

/// A failure of a single source adapter during one fetch cycle.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source did not respond within {0} seconds")]
    Timeout(u64),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Rejection of a single measurement record at construction time.
#[derive(Error, Debug, PartialEq)]
pub enum ReadingError {
    #[error("coordinate out of range: lat={lat}, lon={lon}")]
    OutOfRange { lat: f64, lon: f64 },

    #[error("reading carries neither a concentration nor a precomputed index")]
    Empty,
}

/// Contract violations in grid geometry. These abort immediately rather
/// than produce a misleading lattice.
#[derive(Error, Debug, PartialEq)]
pub enum GridError {
    #[error("invalid bounds: north={north} must exceed south={south}, east={east} must exceed west={west}")]
    InvalidBounds {
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    },

    #[error("grid step must be a positive finite number, got {0}")]
    InvalidStep(f64),
}
