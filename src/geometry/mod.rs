// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Pure geometry over lat/lng coordinates.
//!
//! Nothing in here fails: empty or degenerate input produces the documented
//! `None` / empty results.

pub mod bounds;
pub mod centroid;
pub mod hull;

pub use bounds::{BoundingRegion, DEFAULT_MARGIN_RATIO, Framing, framing};
pub use centroid::{DEFAULT_CENTROID_MIN_POINTS, centroid, centroid_with_threshold};
pub use hull::{HULL_EPSILON, Hull, convex_hull};

use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

/// A WGS 84 coordinate. geo-types interop maps `x = lng`, `y = lat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both axes differ by at most `epsilon`.
    pub fn approx_eq(&self, other: &LatLng, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lng - other.lng).abs() <= epsilon
    }
}

impl From<LatLng> for Coord<f64> {
    fn from(value: LatLng) -> Self {
        Coord {
            x: value.lng,
            y: value.lat,
        }
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(value: Coord<f64>) -> Self {
        LatLng {
            lat: value.y,
            lng: value.x,
        }
    }
}

impl From<LatLng> for Point<f64> {
    fn from(value: LatLng) -> Self {
        Point::new(value.lng, value.lat)
    }
}

impl From<Point<f64>> for LatLng {
    fn from(value: Point<f64>) -> Self {
        LatLng {
            lat: value.y(),
            lng: value.x(),
        }
    }
}
