//! Grid interpolation of sparse point samples.

use crate::error::GridError;
use crate::heatmap::delaunay::Triangulation;
use crate::reading::{Bounds, GridPoint, Provenance};

/// A point sample: `(lat, lon, value)`.
pub type Sample = (f64, f64, f64);

/// Interpolates `samples` onto a regular lattice over `bounds` at `step`
/// degrees spacing.
///
/// The lattice runs from the south/west edge in `step` increments,
/// exclusive of the north/east edge. Cells inside the convex hull of the
/// samples get barycentric linear interpolation from a Delaunay
/// triangulation built once up front; cells outside the hull (or every
/// cell, when the scatter is degenerate) get `fill_value`, so coverage is
/// always the full rectangle. Values are clamped to >= 0. Empty `samples`
/// yields an empty grid.
pub fn interpolate(
    samples: &[Sample],
    bounds: &Bounds,
    step: f64,
    fill_value: f64,
) -> Result<Vec<GridPoint>, GridError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(GridError::InvalidStep(step));
    }

    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let samples = collapse_duplicates(samples);
    let points: Vec<(f64, f64)> = samples.iter().map(|s| (s.0, s.1)).collect();
    let values: Vec<f64> = samples.iter().map(|s| s.2).collect();

    let triangulation = Triangulation::build(&points);

    let lat_cells = ((bounds.north - bounds.south) / step).ceil() as usize;
    let lon_cells = ((bounds.east - bounds.west) / step).ceil() as usize;

    let mut grid = Vec::with_capacity(lat_cells * lon_cells);

    for i in 0..lat_cells {
        let lat = bounds.south + i as f64 * step;
        if lat >= bounds.north {
            break;
        }
        for j in 0..lon_cells {
            let lon = bounds.west + j as f64 * step;
            if lon >= bounds.east {
                break;
            }

            let raw = cell_value(&triangulation, &points, &values, lat, lon, fill_value);

            grid.push(GridPoint {
                lat,
                lon,
                value: raw.max(0.0),
                provenance: Provenance::Interpolated,
            });
        }
    }

    Ok(grid)
}

fn cell_value(
    triangulation: &Triangulation,
    points: &[(f64, f64)],
    values: &[f64],
    lat: f64,
    lon: f64,
    fill_value: f64,
) -> f64 {
    if triangulation.is_degenerate() {
        // No hull to speak of; only a cell coincident with a sample keeps
        // its observed value.
        for (k, &(plat, plon)) in points.iter().enumerate() {
            if (plat - lat).abs() < 1e-9 && (plon - lon).abs() < 1e-9 {
                return values[k];
            }
        }
        return fill_value;
    }

    match triangulation.locate(lat, lon) {
        Some((verts, w)) => {
            w[0] * values[verts[0]] + w[1] * values[verts[1]] + w[2] * values[verts[2]]
        }
        None => fill_value,
    }
}

/// Collapses samples sharing a location (to ~1e-9 deg) into their mean, so
/// the triangulation never sees coincident vertices.
fn collapse_duplicates(samples: &[Sample]) -> Vec<Sample> {
    let mut collapsed: Vec<(f64, f64, f64, usize)> = Vec::with_capacity(samples.len());

    'outer: for &(lat, lon, value) in samples {
        for entry in collapsed.iter_mut() {
            if (entry.0 - lat).abs() < 1e-9 && (entry.1 - lon).abs() < 1e-9 {
                entry.2 += value;
                entry.3 += 1;
                continue 'outer;
            }
        }
        collapsed.push((lat, lon, value, 1));
    }

    collapsed
        .into_iter()
        .map(|(lat, lon, sum, n)| (lat, lon, sum / n as f64))
        .collect()
}
