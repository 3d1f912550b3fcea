// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::LatLng;
use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Share of each axis's range added to both ends of the view.
pub const DEFAULT_MARGIN_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingRegion {
    pub fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_range(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    pub fn contains(&self, p: &LatLng) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }

    fn expanded(self, margin_ratio: f64) -> Self {
        let lat_pad = margin_ratio * self.lat_range();
        let lng_pad = margin_ratio * self.lng_range();

        BoundingRegion {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lng: self.min_lng - lng_pad,
            max_lng: self.max_lng + lng_pad,
        }
    }
}

impl From<BoundingRegion> for Rect<f64> {
    fn from(value: BoundingRegion) -> Self {
        Rect::new(
            Coord {
                x: value.min_lng,
                y: value.min_lat,
            },
            Coord {
                x: value.max_lng,
                y: value.max_lat,
            },
        )
    }
}

/// How a view should frame the current points.
///
/// A single distinct coordinate cannot be fit to a viewport as a box, so it
/// comes back as `Pan` instead of a zero-area region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Framing {
    Region(BoundingRegion),
    Pan(LatLng),
}

impl Framing {
    pub fn region(&self) -> Option<&BoundingRegion> {
        match self {
            Framing::Region(r) => Some(r),
            Framing::Pan(_) => None,
        }
    }
}

/// Margin-padded bounds of `points`, `Pan` for one distinct coordinate,
/// `None` for no points.
pub fn framing(points: &[LatLng], margin_ratio: f64) -> Option<Framing> {
    let (first, rest) = points.split_first()?;

    // seeded from the first point, never from a sentinel
    let raw = rest.iter().fold(
        BoundingRegion {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        },
        |b, p| BoundingRegion {
            min_lat: b.min_lat.min(p.lat),
            max_lat: b.max_lat.max(p.lat),
            min_lng: b.min_lng.min(p.lng),
            max_lng: b.max_lng.max(p.lng),
        },
    );

    if raw.min_lat == raw.max_lat && raw.min_lng == raw.max_lng {
        return Some(Framing::Pan(LatLng::new(raw.min_lat, raw.min_lng)));
    }

    Some(Framing::Region(raw.expanded(margin_ratio)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(f: Option<Framing>) -> BoundingRegion {
        match f {
            Some(Framing::Region(r)) => r,
            other => panic!("expected a region, got {:?}", other),
        }
    }

    #[test]
    fn empty_has_no_framing() {
        assert_eq!(framing(&[], DEFAULT_MARGIN_RATIO), None);
    }

    #[test]
    fn single_coordinate_pans() {
        let p = LatLng::new(0.0, 0.0);
        assert_eq!(framing(&[p], 0.1), Some(Framing::Pan(p)));
        assert_eq!(framing(&[p, p, p], 0.1), Some(Framing::Pan(p)));
    }

    #[test]
    fn margin_expands_both_ends() {
        let points = [LatLng::new(10.0, -20.0), LatLng::new(30.0, 20.0)];
        for m in [0.0, 0.1, 0.25, 1.0] {
            let r = region(framing(&points, m));
            assert!((r.lat_range() - (1.0 + 2.0 * m) * 20.0).abs() < 1e-9);
            assert!((r.lng_range() - (1.0 + 2.0 * m) * 40.0).abs() < 1e-9);
            assert!((r.min_lat - (10.0 - m * 20.0)).abs() < 1e-9);
            assert!((r.max_lng - (20.0 + m * 40.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn flat_axis_gets_no_padding() {
        let r = region(framing(&[LatLng::new(0.0, 0.0), LatLng::new(0.0, 10.0)], 0.1));
        assert_eq!(r.min_lat, 0.0);
        assert_eq!(r.max_lat, 0.0);
        assert!((r.min_lng - -1.0).abs() < 1e-12);
        assert!((r.max_lng - 11.0).abs() < 1e-12);
    }

    #[test]
    fn first_point_seeds_bounds_at_any_latitude() {
        // bounds are seeded from the first point, whatever its value
        let points = [
            LatLng::new(100.0, 5.0),
            LatLng::new(120.0, 7.0),
            LatLng::new(-150.0, -3.0),
        ];
        let r = region(framing(&points, 0.0));
        assert_eq!(r.min_lat, -150.0);
        assert_eq!(r.max_lat, 120.0);
        assert_eq!(r.min_lng, -3.0);
        assert_eq!(r.max_lng, 7.0);
    }

    #[test]
    fn decreasing_then_increasing_input() {
        // a later point can lower one axis while raising the other
        let points = [
            LatLng::new(5.0, 5.0),
            LatLng::new(1.0, 9.0),
            LatLng::new(9.0, 1.0),
        ];
        let r = region(framing(&points, 0.0));
        assert_eq!((r.min_lat, r.max_lat), (1.0, 9.0));
        assert_eq!((r.min_lng, r.max_lng), (1.0, 9.0));
        for p in &points {
            assert!(r.contains(p));
        }
    }

    #[test]
    fn converts_to_rect() {
        let r = region(framing(&[LatLng::new(1.0, 2.0), LatLng::new(3.0, 6.0)], 0.0));
        let rect: Rect<f64> = r.into();
        assert_eq!(rect.min(), Coord { x: 2.0, y: 1.0 });
        assert_eq!(rect.max(), Coord { x: 6.0, y: 3.0 });
    }
}
