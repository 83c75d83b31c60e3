//! Geographic primitives shared by the capture, location and submission modules.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lat: {:.4} | Lon: {:.4}",
            self.latitude, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rounds_to_four_decimals() {
        let coords = Coordinates::new(48.858_370_1, 2.294_481_3);
        assert_eq!(coords.to_string(), "Lat: 48.8584 | Lon: 2.2945");
    }

    #[test]
    fn display_keeps_sign_for_southern_and_western_hemispheres() {
        let coords = Coordinates::new(-33.8567844, -151.2152967);
        assert_eq!(coords.to_string(), "Lat: -33.8568 | Lon: -151.2153");
    }

    #[test]
    fn is_valid_rejects_out_of_range_and_non_finite_values() {
        assert!(Coordinates::new(0.0, 0.0).is_valid());
        assert!(Coordinates::new(90.0, -180.0).is_valid());
        assert!(!Coordinates::new(90.5, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 180.1).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
