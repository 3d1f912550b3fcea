// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Recomputes the consensus aggregates after every point-set mutation and
//! decides whether nearby places need refreshing.

use crate::config::EngineConfig;
use crate::geometry::{self, Framing, Hull, LatLng};
use crate::point_set::{PointEvent, PointId, PointSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Centroid, framing and hull of one point-set revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub revision: u64,
    /// Points that took part, malformed ones excluded.
    pub point_count: usize,
    pub excluded: Vec<PointId>,
    pub centroid: Option<LatLng>,
    pub framing: Option<Framing>,
    pub hull: Hull,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshDecision {
    /// Centroid appeared or moved; places should be fetched around it.
    Due(LatLng),
    /// Centroid went away; published places no longer describe anything.
    Clear,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Recomputing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recomputed {
    pub aggregates: Aggregates,
    pub refresh: RefreshDecision,
}

pub struct Coordinator {
    margin_ratio: f64,
    centroid_min_points: usize,
    centroid_epsilon: f64,
    state: CoordinatorState,
    revision: u64,
    // None until the first recomputation
    last_centroid: Option<Option<LatLng>>,
}

impl Coordinator {
    pub fn new(config: &EngineConfig) -> Self {
        Coordinator {
            margin_ratio: config.margin_ratio,
            centroid_min_points: config.centroid_min_points,
            centroid_epsilon: config.centroid_epsilon,
            state: CoordinatorState::Idle,
            revision: 0,
            last_centroid: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Entry point for mutation events. `points` is the set after `event`.
    pub fn apply(&mut self, points: &PointSet, event: &PointEvent) -> Recomputed {
        debug!(
            point_id = %event.point().id,
            kind = event.kind(),
            "recomputing aggregates"
        );
        self.recompute(points)
    }

    pub fn recompute(&mut self, points: &PointSet) -> Recomputed {
        self.state = CoordinatorState::Recomputing;

        let mut coords: Vec<LatLng> = Vec::with_capacity(points.len());
        let mut excluded: Vec<PointId> = Vec::new();

        for point in points.snapshot() {
            match point.coord() {
                Ok(c) => coords.push(c),
                Err(malformed) => {
                    warn!("excluding point from aggregates: {}", malformed);
                    excluded.push(malformed.id);
                }
            }
        }

        let centroid = geometry::centroid_with_threshold(&coords, self.centroid_min_points);
        let framing = geometry::framing(&coords, self.margin_ratio);
        let hull = geometry::convex_hull(&coords);

        let refresh = self.decide(centroid);
        self.last_centroid = Some(centroid);
        self.revision += 1;
        self.state = CoordinatorState::Idle;

        Recomputed {
            aggregates: Aggregates {
                revision: self.revision,
                point_count: coords.len(),
                excluded,
                centroid,
                framing,
                hull,
            },
            refresh,
        }
    }

    fn decide(&self, centroid: Option<LatLng>) -> RefreshDecision {
        match (self.last_centroid, centroid) {
            (None, Some(c)) | (Some(None), Some(c)) => RefreshDecision::Due(c),
            (Some(Some(prev)), Some(c)) if !prev.approx_eq(&c, self.centroid_epsilon) => {
                RefreshDecision::Due(c)
            }
            (Some(Some(_)), None) => RefreshDecision::Clear,
            _ => RefreshDecision::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_set::Point;

    fn coordinator() -> Coordinator {
        Coordinator::new(&EngineConfig::default())
    }

    fn hull_set(hull: &Hull) -> Vec<(f64, f64)> {
        let mut v: Vec<(f64, f64)> = hull.vertices().iter().map(|p| (p.lat, p.lng)).collect();
        v.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
        v
    }

    #[test]
    fn three_point_walkthrough() {
        let mut set = PointSet::new();
        let mut coord = coordinator();

        let ev = set.upsert("a", 0.0, 0.0);
        let r = coord.apply(&set, &ev);
        assert_eq!(r.aggregates.centroid, None);
        assert_eq!(r.aggregates.framing, Some(Framing::Pan(LatLng::new(0.0, 0.0))));
        assert!(r.aggregates.hull.is_empty());
        assert_eq!(r.refresh, RefreshDecision::Unchanged);

        let ev = set.upsert("b", 0.0, 10.0);
        let r = coord.apply(&set, &ev);
        assert_eq!(r.aggregates.centroid, Some(LatLng::new(0.0, 5.0)));
        let region = *r.aggregates.framing.unwrap().region().unwrap();
        assert_eq!((region.min_lat, region.max_lat), (0.0, 0.0));
        assert!((region.min_lng - -1.0).abs() < 1e-12);
        assert!((region.max_lng - 11.0).abs() < 1e-12);
        assert_eq!(hull_set(&r.aggregates.hull), vec![(0.0, 0.0), (0.0, 10.0)]);
        assert_eq!(r.refresh, RefreshDecision::Due(LatLng::new(0.0, 5.0)));

        let ev = set.upsert("c", 10.0, 0.0);
        let r = coord.apply(&set, &ev);
        let c = r.aggregates.centroid.unwrap();
        assert!((c.lat - 3.33).abs() < 0.01);
        assert!((c.lng - 3.33).abs() < 0.01);
        assert_eq!(
            hull_set(&r.aggregates.hull),
            vec![(0.0, 0.0), (0.0, 10.0), (10.0, 0.0)]
        );
        assert!(r.aggregates.hull.to_polygon().is_some());
        assert!(matches!(r.refresh, RefreshDecision::Due(_)));
        assert_eq!(r.aggregates.revision, 3);
        assert_eq!(coord.state(), CoordinatorState::Idle);
    }

    #[test]
    fn malformed_point_is_excluded() {
        let mut set = PointSet::new();
        set.upsert("a", 0.0, 0.0);
        set.upsert("b", 0.0, 10.0);
        let ev = set.upsert_point(Point {
            id: "broken".into(),
            lat: Some(50.0),
            lng: None,
            label: None,
        });

        let r = coordinator().apply(&set, &ev);
        assert_eq!(r.aggregates.point_count, 2);
        assert_eq!(r.aggregates.excluded, vec![PointId::from("broken")]);
        assert_eq!(r.aggregates.centroid, Some(LatLng::new(0.0, 5.0)));
        assert_eq!(r.aggregates.hull.len(), 2);
    }

    #[test]
    fn remove_and_re_add_round_trips() {
        let mut set = PointSet::new();
        let mut coord = coordinator();
        set.upsert("a", 1.0, 1.0);
        set.upsert("b", 4.0, 2.0);
        let ev = set.upsert("c", 2.0, 7.0);
        let before = coord.apply(&set, &ev).aggregates;

        let ev = set.remove(&"b".into()).unwrap();
        coord.apply(&set, &ev);
        let ev = set.upsert("b", 4.0, 2.0);
        let after = coord.apply(&set, &ev).aggregates;

        assert_eq!(after.centroid, before.centroid);
        assert_eq!(after.framing, before.framing);
        assert_eq!(after.hull, before.hull);
        assert_eq!(after.revision, before.revision + 2);
    }

    #[test]
    fn tiny_moves_do_not_refresh() {
        let mut set = PointSet::new();
        let mut coord = coordinator();
        set.upsert("a", 0.0, 0.0);
        let ev = set.upsert("b", 2.0, 2.0);
        assert!(matches!(coord.apply(&set, &ev).refresh, RefreshDecision::Due(_)));

        let ev = set.upsert("b", 2.0 + 1e-13, 2.0);
        assert_eq!(coord.apply(&set, &ev).refresh, RefreshDecision::Unchanged);

        let ev = set.upsert("b", 2.5, 2.0);
        assert_eq!(
            coord.apply(&set, &ev).refresh,
            RefreshDecision::Due(LatLng::new(1.25, 1.0))
        );
    }

    #[test]
    fn losing_the_centroid_clears() {
        let mut set = PointSet::new();
        let mut coord = coordinator();
        set.upsert("a", 0.0, 0.0);
        let ev = set.upsert("b", 2.0, 2.0);
        coord.apply(&set, &ev);

        let ev = set.remove(&"b".into()).unwrap();
        assert_eq!(coord.apply(&set, &ev).refresh, RefreshDecision::Clear);

        let ev = set.remove(&"a".into()).unwrap();
        let r = coord.apply(&set, &ev);
        assert_eq!(r.refresh, RefreshDecision::Unchanged);
        assert_eq!(r.aggregates.framing, None);
    }

    #[test]
    fn threshold_of_one_refreshes_on_first_point() {
        let config = EngineConfig {
            centroid_min_points: 1,
            ..EngineConfig::default()
        };
        let mut coord = Coordinator::new(&config);
        let mut set = PointSet::new();
        let ev = set.upsert("a", 3.0, 4.0);
        assert_eq!(
            coord.apply(&set, &ev).refresh,
            RefreshDecision::Due(LatLng::new(3.0, 4.0))
        );
    }
}
