//! Core record types: normalized measurements, geographic bounds, and
//! interpolated grid points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aqi::Pollutant;
use crate::error::{GridError, ReadingError};

/// One normalized point-in-time air-quality measurement, produced by a
/// source adapter and immutable thereafter.
///
/// Kept flat (one optional column per pollutant) so a reading round-trips
/// through CSV without nesting. At least one concentration or the
/// precomputed index must be present; [`Reading::validated`] enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub lat: f64,
    pub lon: f64,

    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub o3: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,

    /// Precomputed overall index, when the source supplies one directly.
    pub index: Option<u16>,

    pub source: String,
    pub location_name: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub verified: bool,
}

impl Reading {
    /// Sanitizes and validates a freshly constructed reading.
    ///
    /// Non-finite or negative concentrations are dropped to `None`. Errors
    /// when coordinates are out of range or nothing measurable remains.
    pub fn validated(mut self) -> Result<Self, ReadingError> {
        if !self.lat.is_finite()
            || !self.lon.is_finite()
            || self.lat < -90.0
            || self.lat > 90.0
            || self.lon < -180.0
            || self.lon > 180.0
        {
            return Err(ReadingError::OutOfRange {
                lat: self.lat,
                lon: self.lon,
            });
        }

        for pollutant in Pollutant::ALL {
            let slot = self.concentration_mut(pollutant);
            if let Some(v) = *slot {
                if !v.is_finite() || v < 0.0 {
                    *slot = None;
                }
            }
        }

        if self.index.is_none() && !self.has_any_concentration() {
            return Err(ReadingError::Empty);
        }

        Ok(self)
    }

    pub fn concentration(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
        }
    }

    fn concentration_mut(&mut self, pollutant: Pollutant) -> &mut Option<f64> {
        match pollutant {
            Pollutant::Pm25 => &mut self.pm25,
            Pollutant::Pm10 => &mut self.pm10,
            Pollutant::O3 => &mut self.o3,
            Pollutant::No2 => &mut self.no2,
            Pollutant::So2 => &mut self.so2,
            Pollutant::Co => &mut self.co,
        }
    }

    pub fn set_concentration(&mut self, pollutant: Pollutant, value: Option<f64>) {
        *self.concentration_mut(pollutant) = value;
    }

    pub fn has_any_concentration(&self) -> bool {
        Pollutant::ALL
            .iter()
            .any(|p| self.concentration(*p).is_some())
    }
}

impl Default for Reading {
    fn default() -> Self {
        Reading {
            lat: 0.0,
            lon: 0.0,
            pm25: None,
            pm10: None,
            o3: None,
            no2: None,
            so2: None,
            co: None,
            index: None,
            source: String::new(),
            location_name: None,
            observed_at: DateTime::<Utc>::UNIX_EPOCH,
            verified: false,
        }
    }
}

/// Rectangular geographic bounds. North must exceed south and east must
/// exceed west; anti-meridian wraparound is a caller error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, GridError> {
        if !(north > south) || !(east > west) {
            return Err(GridError::InvalidBounds {
                north,
                south,
                east,
                west,
            });
        }
        Ok(Bounds {
            north,
            south,
            east,
            west,
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Formats as `south,west,north,east`, the order bounds-query feeds expect.
    pub fn as_latlng_param(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// Where a grid point's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Interpolated,
    Blended,
}

/// One cell of an interpolated heatmap lattice. Serializes as the
/// `{lat, lon, value}` triple forwarded verbatim by the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    #[serde(skip)]
    pub provenance: Provenance,
}
