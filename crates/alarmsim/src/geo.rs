//! Geographic primitives for placing simulated devices.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimal places kept on generated coordinates (~11 cm at the equator).
const COORDINATE_PRECISION: i32 = 6;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

/// A rectangular area in decimal degrees that devices are placed within.
///
/// Boxes crossing the antimeridian are not supported; `lon_min` must be
/// strictly less than `lon_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub lat_min: f64,
    /// Northern edge.
    pub lat_max: f64,
    /// Western edge.
    pub lon_min: f64,
    /// Eastern edge.
    pub lon_max: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        // Greater Seattle area.
        Self {
            lat_min: 47.50,
            lat_max: 47.75,
            lon_min: -122.45,
            lon_max: -122.20,
        }
    }
}

impl BoundingBox {
    /// Check that the box is well formed and lies on the globe.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any edge is not finite, out of range,
    /// or if a minimum is not strictly below its maximum.
    pub fn validate(&self) -> Result<()> {
        let edges = [self.lat_min, self.lat_max, self.lon_min, self.lon_max];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(Error::validation("bounding box edges must be finite numbers"));
        }

        for (name, value) in [("lat_min", self.lat_min), ("lat_max", self.lat_max)] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(Error::validation(format!(
                    "{name} ({value}) must be within [-90, 90]"
                )));
            }
        }

        for (name, value) in [("lon_min", self.lon_min), ("lon_max", self.lon_max)] {
            if !(-180.0..=180.0).contains(&value) {
                return Err(Error::validation(format!(
                    "{name} ({value}) must be within [-180, 180]"
                )));
            }
        }

        if self.lat_min >= self.lat_max {
            return Err(Error::validation(format!(
                "lat_min ({}) must be less than lat_max ({})",
                self.lat_min, self.lat_max
            )));
        }

        if self.lon_min >= self.lon_max {
            return Err(Error::validation(format!(
                "lon_min ({}) must be less than lon_max ({})",
                self.lon_min, self.lon_max
            )));
        }

        Ok(())
    }

    /// Draw a point uniformly inside the box.
    ///
    /// The result is rounded to six decimal places and clamped so it never
    /// falls outside the box, even when the edges carry more precision.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Coordinates {
        let latitude = rng.random_range(self.lat_min..=self.lat_max);
        let longitude = rng.random_range(self.lon_min..=self.lon_max);

        Coordinates {
            latitude: round_to_precision(latitude).clamp(self.lat_min, self.lat_max),
            longitude: round_to_precision(longitude).clamp(self.lon_min, self.lon_max),
        }
    }

    /// Check whether a point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, coords: Coordinates) -> bool {
        (self.lat_min..=self.lat_max).contains(&coords.latitude)
            && (self.lon_min..=self.lon_max).contains(&coords.longitude)
    }
}

fn round_to_precision(value: f64) -> f64 {
    let factor = 10_f64.powi(COORDINATE_PRECISION);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_box_is_valid() {
        assert!(BoundingBox::default().validate().is_ok());
    }

    #[test]
    fn test_sample_stays_inside_box() {
        let bbox = BoundingBox::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            let point = bbox.sample(&mut rng);
            assert!(bbox.contains(point), "{point:?} escaped {bbox:?}");
        }
    }

    #[test]
    fn test_sample_respects_high_precision_edges() {
        let bbox = BoundingBox {
            lat_min: 10.123_456_789,
            lat_max: 10.123_457_1,
            lon_min: 20.987_654_321,
            lon_max: 20.987_654_9,
        };
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            assert!(bbox.contains(bbox.sample(&mut rng)));
        }
    }

    #[test]
    fn test_sample_is_rounded() {
        let bbox = BoundingBox::default();
        let mut rng = StdRng::seed_from_u64(3);
        let point = bbox.sample(&mut rng);

        let scaled = point.latitude * 1e6;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn test_sample_is_deterministic_for_seed() {
        let bbox = BoundingBox::default();
        let a = bbox.sample(&mut StdRng::seed_from_u64(99));
        let b = bbox.sample(&mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_inverted_latitude() {
        let bbox = BoundingBox {
            lat_min: 48.0,
            lat_max: 47.0,
            ..BoundingBox::default()
        };
        let err = bbox.validate().unwrap_err().to_string();
        assert!(err.contains("lat_min"));
    }

    #[test]
    fn test_validate_degenerate_longitude() {
        let bbox = BoundingBox {
            lon_min: -122.0,
            lon_max: -122.0,
            ..BoundingBox::default()
        };
        let err = bbox.validate().unwrap_err().to_string();
        assert!(err.contains("lon_min"));
    }

    #[test]
    fn test_validate_out_of_range() {
        let bbox = BoundingBox {
            lat_max: 91.0,
            ..BoundingBox::default()
        };
        assert!(bbox.validate().unwrap_err().to_string().contains("lat_max"));

        let bbox = BoundingBox {
            lon_min: -181.0,
            ..BoundingBox::default()
        };
        assert!(bbox.validate().unwrap_err().to_string().contains("lon_min"));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let bbox = BoundingBox {
            lat_min: f64::NAN,
            ..BoundingBox::default()
        };
        assert!(bbox.validate().is_err());
    }

    #[test]
    fn test_contains_edges() {
        let bbox = BoundingBox::default();
        assert!(bbox.contains(Coordinates {
            latitude: bbox.lat_min,
            longitude: bbox.lon_max,
        }));
        assert!(!bbox.contains(Coordinates {
            latitude: bbox.lat_max + 0.1,
            longitude: bbox.lon_min,
        }));
    }
}
