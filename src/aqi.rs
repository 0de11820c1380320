//! Piecewise-linear AQI conversion.
//!
//! Concentrations map to sub-indices through per-pollutant breakpoint
//! tables (US EPA convention). Input outside a table's coverage yields
//! `None` — the conversion never extrapolates past the highest tier.

use serde::{Deserialize, Serialize};

/// Pollutants the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    No2,
    So2,
    Co,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
    ];

    /// Parses the parameter name used by concentration feeds.
    pub fn from_parameter(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pm25" | "pm2.5" => Some(Pollutant::Pm25),
            "pm10" => Some(Pollutant::Pm10),
            "o3" | "ozone" => Some(Pollutant::O3),
            "no2" => Some(Pollutant::No2),
            "so2" => Some(Pollutant::So2),
            "co" => Some(Pollutant::Co),
            _ => None,
        }
    }
}

/// One tier of a breakpoint table: concentrations in `[conc_low, conc_high]`
/// map linearly onto indices in `[index_low, index_high]`.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub conc_low: f64,
    pub conc_high: f64,
    pub index_low: u16,
    pub index_high: u16,
}

const fn bp(conc_low: f64, conc_high: f64, index_low: u16, index_high: u16) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        index_low,
        index_high,
    }
}

/// PM2.5 24-hour breakpoints (µg/m³), 7 EPA tiers up to 500.4.
static PM25_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0, 50),
    bp(12.1, 35.4, 51, 100),
    bp(35.5, 55.4, 101, 150),
    bp(55.5, 150.4, 151, 200),
    bp(150.5, 250.4, 201, 300),
    bp(250.5, 350.4, 301, 400),
    bp(350.5, 500.4, 401, 500),
];

/// PM10 24-hour breakpoints (µg/m³), 7 EPA tiers up to 604.
static PM10_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 154.0, 51, 100),
    bp(155.0, 254.0, 101, 150),
    bp(255.0, 354.0, 151, 200),
    bp(355.0, 424.0, 201, 300),
    bp(425.0, 504.0, 301, 400),
    bp(505.0, 604.0, 401, 500),
];

/// Returns the breakpoint table for a pollutant, if one is defined.
pub fn breakpoints(pollutant: Pollutant) -> Option<&'static [Breakpoint]> {
    match pollutant {
        Pollutant::Pm25 => Some(&PM25_BREAKPOINTS),
        Pollutant::Pm10 => Some(&PM10_BREAKPOINTS),
        _ => None,
    }
}

/// Converts a concentration to its AQI sub-index.
///
/// Returns `None` when the concentration is non-finite, negative, falls in
/// a gap between tiers, exceeds the table ceiling, or the pollutant has no
/// table.
pub fn sub_index(pollutant: Pollutant, concentration: f64) -> Option<u16> {
    if !concentration.is_finite() || concentration < 0.0 {
        return None;
    }

    let table = breakpoints(pollutant)?;

    for tier in table {
        if concentration >= tier.conc_low && concentration <= tier.conc_high {
            let span = tier.conc_high - tier.conc_low;
            let index = (tier.index_high - tier.index_low) as f64 / span
                * (concentration - tier.conc_low)
                + tier.index_low as f64;
            return Some(index.round() as u16);
        }
    }

    None
}

/// Combines sub-indices into the overall index: the worst pollutant
/// dominates. Returns `None` when no sub-index is available.
pub fn overall_index(sub_indices: impl IntoIterator<Item = u16>) -> Option<u16> {
    sub_indices.into_iter().max()
}

/// Human-readable EPA category for an overall index.
///
/// | Range     | Category                       |
/// |-----------|--------------------------------|
/// | 0–50      | Good                           |
/// | 51–100    | Moderate                       |
/// | 101–150   | Unhealthy for Sensitive Groups |
/// | 151–200   | Unhealthy                      |
/// | 201–300   | Very Unhealthy                 |
/// | 301+      | Hazardous                      |
pub fn category(index: u16) -> &'static str {
    match index {
        0..=50 => "Good",
        51..=100 => "Moderate",
        101..=150 => "Unhealthy for Sensitive Groups",
        151..=200 => "Unhealthy",
        201..=300 => "Very Unhealthy",
        _ => "Hazardous",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pm25_tier_endpoints() {
        assert_eq!(sub_index(Pollutant::Pm25, 0.0), Some(0));
        assert_eq!(sub_index(Pollutant::Pm25, 12.0), Some(50));
        assert_eq!(sub_index(Pollutant::Pm25, 12.1), Some(51));
        assert_eq!(sub_index(Pollutant::Pm25, 35.4), Some(100));
        assert_eq!(sub_index(Pollutant::Pm25, 55.4), Some(150));
        assert_eq!(sub_index(Pollutant::Pm25, 150.4), Some(200));
        assert_eq!(sub_index(Pollutant::Pm25, 250.4), Some(300));
        assert_eq!(sub_index(Pollutant::Pm25, 350.4), Some(400));
        assert_eq!(sub_index(Pollutant::Pm25, 500.4), Some(500));
    }

    #[test]
    fn test_pm25_interior_value() {
        // round(50/12 * 10) = 42
        assert_eq!(sub_index(Pollutant::Pm25, 10.0), Some(42));
    }

    #[test]
    fn test_pm10_tier_endpoints() {
        assert_eq!(sub_index(Pollutant::Pm10, 54.0), Some(50));
        assert_eq!(sub_index(Pollutant::Pm10, 55.0), Some(51));
        assert_eq!(sub_index(Pollutant::Pm10, 604.0), Some(500));
    }

    #[test]
    fn test_above_ceiling_is_undefined() {
        assert_eq!(sub_index(Pollutant::Pm25, 500.5), None);
        assert_eq!(sub_index(Pollutant::Pm10, 604.1), None);
    }

    #[test]
    fn test_invalid_concentration_is_undefined() {
        assert_eq!(sub_index(Pollutant::Pm25, -0.1), None);
        assert_eq!(sub_index(Pollutant::Pm25, f64::NAN), None);
        assert_eq!(sub_index(Pollutant::Pm25, f64::INFINITY), None);
    }

    #[test]
    fn test_pollutant_without_table_is_undefined() {
        assert_eq!(sub_index(Pollutant::O3, 10.0), None);
        assert_eq!(sub_index(Pollutant::Co, 1.0), None);
    }

    #[test]
    fn test_continuity_at_shared_boundaries() {
        // Adjacent tiers must agree to within rounding across their seam.
        let below = sub_index(Pollutant::Pm25, 12.0).unwrap();
        let above = sub_index(Pollutant::Pm25, 12.1).unwrap();
        assert!(above - below <= 1);

        let below = sub_index(Pollutant::Pm10, 54.0).unwrap();
        let above = sub_index(Pollutant::Pm10, 55.0).unwrap();
        assert!(above - below <= 1);
    }

    #[test]
    fn test_monotonic_within_tier() {
        let mut last = 0;
        for step in 0..=120 {
            let c = step as f64 * 0.1; // 0.0..=12.0
            let idx = sub_index(Pollutant::Pm25, c).unwrap();
            assert!(idx >= last, "index decreased at concentration {c}");
            last = idx;
        }
    }

    #[test]
    fn test_overall_index_takes_max() {
        assert_eq!(overall_index([40, 75]), Some(75));
        assert_eq!(overall_index([75]), Some(75));
    }

    #[test]
    fn test_overall_index_empty_is_undefined() {
        assert_eq!(overall_index([]), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(category(25), "Good");
        assert_eq!(category(75), "Moderate");
        assert_eq!(category(125), "Unhealthy for Sensitive Groups");
        assert_eq!(category(175), "Unhealthy");
        assert_eq!(category(250), "Very Unhealthy");
        assert_eq!(category(400), "Hazardous");
    }

    #[test]
    fn test_from_parameter() {
        assert_eq!(Pollutant::from_parameter("pm25"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_parameter("PM2.5"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_parameter("ozone"), Some(Pollutant::O3));
        assert_eq!(Pollutant::from_parameter("bc"), None);
    }
}
