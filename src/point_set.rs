// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! The live set of participant points for one session.

use crate::error::{MalformedPoint, MissingCoordinate};
use crate::geometry::LatLng;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        PointId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(value: &str) -> Self {
        PointId(value.to_string())
    }
}

impl From<String> for PointId {
    fn from(value: String) -> Self {
        PointId(value)
    }
}

/// A participant location. Coordinates are optional because upstream data
/// can arrive incomplete; see [`Point::coord`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Address text the point was geocoded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Point {
    pub fn new(id: impl Into<PointId>, lat: f64, lng: f64) -> Self {
        Point {
            id: id.into(),
            lat: Some(lat),
            lng: Some(lng),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Usable coordinate, or why there is none. NaN and infinities count as
    /// missing.
    pub fn coord(&self) -> Result<LatLng, MalformedPoint> {
        let lat = self.lat.filter(|v| v.is_finite());
        let lng = self.lng.filter(|v| v.is_finite());

        match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(LatLng::new(lat, lng)),
            (None, Some(_)) => Err(self.malformed(MissingCoordinate::Lat)),
            (Some(_), None) => Err(self.malformed(MissingCoordinate::Lng)),
            (None, None) => Err(self.malformed(MissingCoordinate::Both)),
        }
    }

    fn malformed(&self, missing: MissingCoordinate) -> MalformedPoint {
        MalformedPoint {
            id: self.id.clone(),
            missing,
        }
    }
}

/// What happened to the point set. Carries the point as it is after the
/// mutation (or as it was, for `Removed`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "point", rename_all = "snake_case")]
pub enum PointEvent {
    Added(Point),
    Changed(Point),
    Removed(Point),
}

impl PointEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PointEvent::Added(_) => "added",
            PointEvent::Changed(_) => "changed",
            PointEvent::Removed(_) => "removed",
        }
    }

    pub fn point(&self) -> &Point {
        match self {
            PointEvent::Added(p) | PointEvent::Changed(p) | PointEvent::Removed(p) => p,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PointSet {
    points: AHashMap<PointId, Point>,
}

impl PointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, id: impl Into<PointId>, lat: f64, lng: f64) -> PointEvent {
        let id = id.into();
        // coordinates move, the label stays
        let label = self.points.get(&id).and_then(|p| p.label.clone());

        self.upsert_point(Point {
            id,
            lat: Some(lat),
            lng: Some(lng),
            label,
        })
    }

    /// Insert or overwrite a whole point, including a possibly malformed one.
    pub fn upsert_point(&mut self, point: Point) -> PointEvent {
        match self.points.get_mut(&point.id) {
            Some(existing) => {
                existing.lat = point.lat;
                existing.lng = point.lng;
                existing.label = point.label;
                PointEvent::Changed(existing.clone())
            }
            None => {
                self.points.insert(point.id.clone(), point.clone());
                PointEvent::Added(point)
            }
        }
    }

    /// Absent ids are a no-op and produce no event.
    pub fn remove(&mut self, id: &PointId) -> Option<PointEvent> {
        self.points.remove(id).map(PointEvent::Removed)
    }

    pub fn get(&self, id: &PointId) -> Option<&Point> {
        self.points.get(id)
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.points.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of every point, ordered by id.
    pub fn snapshot(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.points.values().cloned().collect();
        points.sort_by(|a, b| a.id.cmp(&b.id));
        points
    }
}
