//! Reference locations for known instruments.
//!
//! Consulted only when a stream header carries no altitude; see
//! [`crate::read`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use marlu::LatLngHeight;

lazy_static! {
    static ref KNOWN_TELESCOPES: HashMap<&'static str, LatLngHeight> = {
        let mut m = HashMap::new();
        m.insert(
            "MWA",
            LatLngHeight {
                longitude_rad: 116.67081524_f64.to_radians(),
                latitude_rad: -26.70331941_f64.to_radians(),
                height_metres: 377.827,
            },
        );
        m.insert(
            "HERA",
            LatLngHeight {
                longitude_rad: 21.42830583_f64.to_radians(),
                latitude_rad: -30.72152778_f64.to_radians(),
                height_metres: 1073.0,
            },
        );
        m.insert(
            "PAPER",
            LatLngHeight {
                longitude_rad: 21.42830583_f64.to_radians(),
                latitude_rad: -30.72152778_f64.to_radians(),
                height_metres: 1073.0,
            },
        );
        m
    };
}

/// The reference location of a known instrument, or `None` if the name isn't
/// recognised. Matching is case insensitive.
pub fn known_location(telescope_name: &str) -> Option<LatLngHeight> {
    KNOWN_TELESCOPES
        .get(telescope_name.to_uppercase().as_str())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mwa = known_location("mwa").unwrap();
        assert!(mwa.latitude_rad < 0.0);
        assert!((mwa.height_metres - 377.827).abs() < f64::EPSILON);
        assert!(known_location("MWA").is_some());
        assert!(known_location("Hera").is_some());
    }

    #[test]
    fn unknown_telescope() {
        assert!(known_location("not a telescope").is_none());
    }
}
