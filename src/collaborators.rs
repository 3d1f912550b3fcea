// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Seams to the geocoding and place-search services.
//!
//! Requests carry all of their context (session, point, sequence number) so a
//! completion can be matched without anything captured in a closure.

use crate::error::{GeocodeError, SearchError};
use crate::geometry::LatLng;
use crate::point_set::PointId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub session_id: String,
    pub point_id: PointId,
    pub address: String,
    pub seq: u64,
}

pub trait Geocoder: Send + Sync + 'static {
    fn geocode(
        &self,
        request: &GeocodeRequest,
    ) -> impl Future<Output = Result<LatLng, GeocodeError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceQuery {
    pub session_id: String,
    /// Refresh sequence number; every page of one refresh shares it.
    pub seq: u64,
    /// 1-based page within the refresh.
    pub page: u32,
    pub centroid: LatLng,
    pub radius_m: u32,
    pub category: String,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
}

impl SearchStatus {
    /// Statuses whose page, possibly empty, is a valid answer.
    pub fn is_success(&self) -> bool {
        matches!(self, SearchStatus::Ok | SearchStatus::ZeroResults)
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchStatus::Ok => "OK",
            SearchStatus::ZeroResults => "ZERO_RESULTS",
            SearchStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            SearchStatus::RequestDenied => "REQUEST_DENIED",
            SearchStatus::InvalidRequest => "INVALID_REQUEST",
            SearchStatus::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedPlace {
    pub external_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePage {
    pub status: SearchStatus,
    #[serde(default)]
    pub results: Vec<DerivedPlace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

pub trait PlaceSearch: Send + Sync + 'static {
    fn search(
        &self,
        query: &PlaceQuery,
    ) -> impl Future<Output = Result<PlacePage, SearchError>> + Send;
}
