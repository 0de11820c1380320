//! Refinement of an interpolated grid with nearby live observations.

use crate::geo::haversine_km;
use crate::reading::{GridPoint, Provenance};

/// An observation: `(lat, lon, value)`.
pub type Observation = (f64, f64, f64);

/// Blends `grid` with `observations` inside `radius_km`, returning a new
/// grid (the input is untouched).
///
/// Each qualifying observation is weighted by `max(0.01, 1 - d/radius)` —
/// linear decay with a floor so boundary observations still contribute and
/// the weight sum can never be zero. The refined value is the plain
/// average of the interpolated value and the weighted observation mean;
/// the model and local ground truth get equal say. Grid points with no
/// observation in range pass through unchanged.
pub fn blend(grid: &[GridPoint], observations: &[Observation], radius_km: f64) -> Vec<GridPoint> {
    if observations.is_empty() || !(radius_km > 0.0) {
        return grid.to_vec();
    }

    grid.iter()
        .map(|point| {
            let mut weight_sum = 0.0;
            let mut value_sum = 0.0;

            for &(lat, lon, value) in observations {
                let d = haversine_km(point.lat, point.lon, lat, lon);
                if d <= radius_km {
                    let w = (1.0 - d / radius_km).max(0.01);
                    weight_sum += w;
                    value_sum += w * value;
                }
            }

            if weight_sum > 0.0 {
                GridPoint {
                    value: (point.value + value_sum / weight_sum) / 2.0,
                    provenance: Provenance::Blended,
                    ..*point
                }
            } else {
                *point
            }
        })
        .collect()
}
