// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::LatLng;
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Points closer than this on both axes (degrees) are the same vertex.
pub const HULL_EPSILON: f64 = 1e-12;

// Relative tolerance on the cross product; turns flatter than this count as
// collinear and are dropped.
const ORIENTATION_TOLERANCE: f64 = 1e-12;

/// Convex hull vertices, starting at the lowest (lat, lng) point.
///
/// Counter-clockwise in the (lat, lng) plane, which is clockwise when drawn
/// with lng on the horizontal axis. Not closed: the first vertex is not
/// repeated at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hull(Vec<LatLng>);

impl Hull {
    pub fn vertices(&self) -> &[LatLng] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Two vertices: a segment with nothing to fill.
    pub fn is_segment(&self) -> bool {
        self.0.len() == 2
    }

    /// Closed polygon for hulls with an area, `None` for segments and empties.
    pub fn to_polygon(&self) -> Option<Polygon<f64>> {
        if self.0.len() < 3 {
            return None;
        }

        let mut ring: Vec<Coord<f64>> = self.0.iter().map(|p| Coord::from(*p)).collect();
        ring.push(ring[0]);

        Some(Polygon::new(LineString(ring), vec![]))
    }
}

// > 0 for a left turn o -> a -> b in the (lat, lng) plane
fn turn(o: &LatLng, a: &LatLng, b: &LatLng) -> f64 {
    let (ax, ay) = (a.lat - o.lat, a.lng - o.lng);
    let (bx, by) = (b.lat - o.lat, b.lng - o.lng);
    let cross = ax * by - ay * bx;
    let scale = (ax.abs() + ay.abs()) * (bx.abs() + by.abs());

    if cross.abs() <= ORIENTATION_TOLERANCE * scale {
        0.0
    } else {
        cross
    }
}

// Sorted by (lat, lng), so a near-duplicate of `p` can only sit among the
// trailing kept points whose lat is within epsilon, not just the last one.
fn dedup_sorted(sorted: Vec<LatLng>) -> Vec<LatLng> {
    let mut kept: Vec<LatLng> = Vec::with_capacity(sorted.len());
    for p in sorted {
        let duplicate = kept
            .iter()
            .rev()
            .take_while(|k| p.lat - k.lat <= HULL_EPSILON)
            .any(|k| k.approx_eq(&p, HULL_EPSILON));
        if !duplicate {
            kept.push(p);
        }
    }
    kept
}

fn push_chain(chain: &mut Vec<LatLng>, p: LatLng) {
    while chain.len() >= 2 && turn(&chain[chain.len() - 2], &chain[chain.len() - 1], &p) <= 0.0 {
        chain.pop();
    }
    chain.push(p);
}

/// Andrew's monotone chain.
///
/// * 0 or 1 distinct points: empty.
/// * 2 distinct points, or any collinear set: the two extremes.
/// * otherwise the convex polygon, collinear boundary points dropped.
pub fn convex_hull(points: &[LatLng]) -> Hull {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.lat.total_cmp(&b.lat).then_with(|| a.lng.total_cmp(&b.lng)));
    let sorted = dedup_sorted(sorted);

    match sorted.len() {
        0 | 1 => return Hull::default(),
        2 => return Hull(sorted),
        _ => {}
    }

    let mut lower: Vec<LatLng> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        push_chain(&mut lower, *p);
    }

    let mut upper: Vec<LatLng> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        push_chain(&mut upper, *p);
    }

    // each chain ends where the other begins
    lower.pop();
    upper.pop();
    lower.extend(upper);

    Hull(lower)
}
