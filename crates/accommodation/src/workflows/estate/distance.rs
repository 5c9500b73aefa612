use super::domain::Coordinates;

pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Great-circle distance between two points in miles.
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LONDON: Coordinates = Coordinates {
        latitude: 51.5074,
        longitude: -0.1278,
    };
    const MANCHESTER: Coordinates = Coordinates {
        latitude: 53.4808,
        longitude: -2.2426,
    };

    #[test]
    fn london_to_manchester_is_about_163_miles() {
        let miles = haversine_miles(LONDON, MANCHESTER);
        assert!((miles - 163.0).abs() < 2.0, "got {miles}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_miles(LONDON, LONDON), 0.0);
    }

    proptest! {
        #[test]
        fn distance_is_symmetric_and_non_negative(
            lat1 in -80.0f64..80.0, lon1 in -180.0f64..180.0,
            lat2 in -80.0f64..80.0, lon2 in -180.0f64..180.0,
        ) {
            let a = Coordinates { latitude: lat1, longitude: lon1 };
            let b = Coordinates { latitude: lat2, longitude: lon2 };
            let there = haversine_miles(a, b);
            let back = haversine_miles(b, a);
            prop_assert!(there >= 0.0);
            prop_assert!((there - back).abs() < 1e-6);
        }
    }
}
