// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use crate::collaborators::SearchStatus;
use crate::point_set::PointId;
use thiserror::Error;

/// Which coordinate a malformed point is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCoordinate {
    Lat,
    Lng,
    Both,
}

impl std::fmt::Display for MissingCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingCoordinate::Lat => write!(f, "lat"),
            MissingCoordinate::Lng => write!(f, "lng"),
            MissingCoordinate::Both => write!(f, "lat and lng"),
        }
    }
}

/// A point that cannot take part in aggregate computation. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("point '{id}' has no usable {missing}")]
pub struct MalformedPoint {
    pub id: PointId,
    pub missing: MissingCoordinate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not place address '{address}': {status}")]
pub struct GeocodeError {
    pub address: String,
    pub status: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("places service failed: {0}")]
    Status(SearchStatus),
    #[error("places transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error("session '{0}' is closed")]
    SessionClosed(String),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}
