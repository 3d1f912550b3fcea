// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! In-memory collaborators for tests and the replay tool.

use crate::collaborators::{
    GeocodeRequest, Geocoder, PlacePage, PlaceQuery, PlaceSearch, SearchStatus,
};
use crate::error::{GeocodeError, SearchError};
use crate::geometry::LatLng;
use ahash::AHashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Resolves addresses from a fixed table. Unknown addresses fail with
/// `ZERO_RESULTS`.
#[derive(Debug, Default)]
pub struct FixtureGeocoder {
    table: AHashMap<String, LatLng>,
    latency: Duration,
}

impl FixtureGeocoder {
    pub fn new(table: impl IntoIterator<Item = (String, LatLng)>) -> Self {
        FixtureGeocoder {
            table: table.into_iter().collect(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Geocoder for FixtureGeocoder {
    async fn geocode(&self, request: &GeocodeRequest) -> Result<LatLng, GeocodeError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.table
            .get(&request.address)
            .copied()
            .ok_or_else(|| GeocodeError {
                address: request.address.clone(),
                status: "ZERO_RESULTS".to_string(),
            })
    }
}

/// Serves the same page sequence for every refresh: page N of any refresh
/// is `pages[N - 1]`. Records every query it sees.
#[derive(Debug, Default)]
pub struct FixturePlaceSearch {
    pages: Vec<PlacePage>,
    latency: Duration,
    queries: Mutex<Vec<PlaceQuery>>,
}

impl FixturePlaceSearch {
    pub fn new(pages: Vec<PlacePage>) -> Self {
        FixturePlaceSearch {
            pages,
            latency: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn record(&self, query: &PlaceQuery) {
        match self.queries.lock() {
            Ok(mut q) => q.push(query.clone()),
            Err(poisoned) => poisoned.into_inner().push(query.clone()),
        }
    }

    pub fn queries(&self) -> Vec<PlaceQuery> {
        match self.queries.lock() {
            Ok(q) => q.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PlaceSearch for FixturePlaceSearch {
    async fn search(&self, query: &PlaceQuery) -> Result<PlacePage, SearchError> {
        self.record(query);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let index = query.page.saturating_sub(1) as usize;
        Ok(self.pages.get(index).cloned().unwrap_or(PlacePage {
            status: SearchStatus::ZeroResults,
            results: Vec::new(),
            next_page_token: None,
        }))
    }
}
