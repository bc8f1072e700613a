//! Beacon association

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::point::Point;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the known beacon nearest to an observed point.
///
/// Returns `None` if no beacon lies within `threshold_m` of the observation.
pub fn nearest_beacon<'a>(
    observed: &Point,
    beacons: &'a [Point],
    threshold_m: f64,
) -> Option<&'a Point> {
    beacons
        .iter()
        .map(|b| (b, b.distance_to(observed)))
        .filter(|(_, d)| *d <= threshold_m)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(b, _)| b)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nearest_beacon() {
        let beacons = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
        ];

        let found = nearest_beacon(&Point::new(1.9, 0.2), &beacons, 0.5);
        assert_eq!(found, Some(&beacons[1]));

        let found = nearest_beacon(&Point::new(1.9, 1.2), &beacons, 0.5);
        assert_eq!(found, None);

        assert_eq!(nearest_beacon(&Point::new(1.0, 1.0), &[], 10.0), None);
    }
}
