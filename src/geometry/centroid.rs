// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::LatLng;

/// A lone point does not define a shared area, so it gets no center.
pub const DEFAULT_CENTROID_MIN_POINTS: usize = 2;

/// Arithmetic mean of lat and lng, or `None` for fewer than two points.
pub fn centroid(points: &[LatLng]) -> Option<LatLng> {
    centroid_with_threshold(points, DEFAULT_CENTROID_MIN_POINTS)
}

pub fn centroid_with_threshold(points: &[LatLng], min_points: usize) -> Option<LatLng> {
    if points.is_empty() || points.len() < min_points {
        return None;
    }

    let (lat_sum, lng_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    let count = points.len() as f64;

    Some(LatLng::new(lat_sum / count, lng_sum / count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_center_below_two_points() {
        assert_eq!(centroid(&[]), None);
        assert_eq!(centroid(&[LatLng::new(12.0, -70.0)]), None);
    }

    #[test]
    fn mean_of_each_axis() {
        let points = [
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 10.0),
            LatLng::new(10.0, 0.0),
        ];
        let c = centroid(&points).unwrap();
        assert!((c.lat - 10.0 / 3.0).abs() < 1e-12);
        assert!((c.lng - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn order_does_not_matter() {
        let forward = [
            LatLng::new(34.05, -118.25),
            LatLng::new(37.77, -122.42),
            LatLng::new(32.72, -117.16),
            LatLng::new(36.17, -115.14),
        ];
        let mut reversed = forward;
        reversed.reverse();
        let mut rotated = forward;
        rotated.rotate_left(1);

        let a = centroid(&forward).unwrap();
        for other in [centroid(&reversed).unwrap(), centroid(&rotated).unwrap()] {
            assert!(a.approx_eq(&other, 1e-12));
        }
    }

    #[test]
    fn threshold_can_be_lowered() {
        let lone = [LatLng::new(1.5, 2.5)];
        assert_eq!(centroid_with_threshold(&lone, 1), Some(LatLng::new(1.5, 2.5)));
        assert_eq!(centroid_with_threshold(&[], 0), None);
    }
}
