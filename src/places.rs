// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Keeps the published nearby-place set in step with the current centroid.
//!
//! Every refresh gets a sequence number. Only responses for the newest
//! refresh are applied; anything older is dropped as stale. The first page of
//! a refresh replaces the published set wholesale and later pages of the same
//! refresh extend it, so early pages show up without waiting for the rest.

use crate::collaborators::{DerivedPlace, PlacePage, PlaceQuery};
use crate::config::EngineConfig;
use crate::error::SearchError;
use crate::geometry::LatLng;
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSet {
    /// Refresh that produced these places, 0 before the first one.
    pub refresh_seq: u64,
    pub pages: u32,
    pub places: Vec<DerivedPlace>,
    pub updated_at: DateTime<Utc>,
}

impl PlaceSet {
    pub fn empty(refresh_seq: u64) -> Self {
        PlaceSet {
            refresh_seq,
            pages: 0,
            places: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, external_id: &str) -> Option<&DerivedPlace> {
        self.places.iter().find(|p| p.external_id == external_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The published set changed. `continuation` is the next page to fetch,
    /// after the configured delay.
    Published {
        places: PlaceSet,
        continuation: Option<PlaceQuery>,
    },
    /// Superseded by a newer refresh; nothing changed.
    Stale { seq: u64, current: u64 },
    /// The service failed; the last good set stays published.
    Failed(SearchError),
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    expected_page: u32,
}

pub struct PlaceSynchronizer {
    session_id: String,
    radius_m: u32,
    category: String,
    max_pages: u32,
    seq: u64,
    in_flight: Option<InFlight>,
    published: PlaceSet,
    seen: AHashSet<String>,
}

impl PlaceSynchronizer {
    pub fn new(session_id: impl Into<String>, config: &EngineConfig) -> Self {
        PlaceSynchronizer {
            session_id: session_id.into(),
            radius_m: config.search_radius_m,
            category: config.search_category.clone(),
            max_pages: config.max_pages,
            seq: 0,
            in_flight: None,
            published: PlaceSet::empty(0),
            seen: AHashSet::new(),
        }
    }

    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn published(&self) -> &PlaceSet {
        &self.published
    }

    /// Start a refresh around `centroid`. Any refresh still in flight is
    /// superseded.
    pub fn request_refresh(&mut self, centroid: LatLng) -> PlaceQuery {
        self.seq += 1;

        if let Some(previous) = self.in_flight.replace(InFlight {
            seq: self.seq,
            expected_page: 1,
        }) {
            debug!(superseded = previous.seq, seq = self.seq, "superseding place refresh");
        }

        PlaceQuery {
            session_id: self.session_id.clone(),
            seq: self.seq,
            page: 1,
            centroid,
            radius_m: self.radius_m,
            category: self.category.clone(),
            page_token: None,
        }
    }

    /// Drop everything: no centroid, so no places. In-flight refreshes become
    /// stale.
    pub fn clear(&mut self) -> PlaceSet {
        self.seq += 1;
        self.in_flight = None;
        self.seen.clear();
        self.published = PlaceSet::empty(self.seq);
        self.published.clone()
    }

    #[tracing::instrument(name = "accept_places", skip(self, query, result), fields(session = %self.session_id, seq = query.seq, page = query.page))]
    pub fn accept(
        &mut self,
        query: &PlaceQuery,
        result: Result<PlacePage, SearchError>,
    ) -> SyncOutcome {
        let current = match self.in_flight {
            Some(f) if f.seq == query.seq && f.expected_page == query.page => f,
            _ => {
                debug!(current = self.seq, "discarding stale place response");
                return SyncOutcome::Stale {
                    seq: query.seq,
                    current: self.seq,
                };
            }
        };

        let page = match result {
            Ok(page) if page.status.is_success() => page,
            Ok(page) => {
                self.in_flight = None;
                warn!("Places service failed: {}", page.status);
                return SyncOutcome::Failed(SearchError::Status(page.status));
            }
            Err(e) => {
                self.in_flight = None;
                warn!("Places service failed: {}", e);
                return SyncOutcome::Failed(e);
            }
        };

        if query.page == 1 {
            self.seen.clear();
            self.published = PlaceSet::empty(query.seq);
        }

        let before = self.published.places.len();
        for place in page.results {
            if self.seen.insert(place.external_id.clone()) {
                self.published.places.push(place);
            }
        }
        self.published.pages = query.page;
        self.published.updated_at = Utc::now();

        info!(
            added = self.published.places.len() - before,
            total = self.published.places.len(),
            "published places"
        );

        let continuation = match page.next_page_token {
            Some(token) if query.page < self.max_pages => {
                self.in_flight = Some(InFlight {
                    seq: current.seq,
                    expected_page: query.page + 1,
                });
                Some(PlaceQuery {
                    page: query.page + 1,
                    page_token: Some(token),
                    ..query.clone()
                })
            }
            _ => {
                self.in_flight = None;
                None
            }
        };

        SyncOutcome::Published {
            places: self.published.clone(),
            continuation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SearchStatus;

    fn place(id: &str) -> DerivedPlace {
        DerivedPlace {
            external_id: id.to_string(),
            name: format!("Place {}", id),
            vicinity: None,
            categories: vec!["food".to_string()],
            lat: 0.0,
            lng: 0.0,
        }
    }

    fn ok(ids: &[&str], next: Option<&str>) -> Result<PlacePage, SearchError> {
        Ok(PlacePage {
            status: SearchStatus::Ok,
            results: ids.iter().map(|id| place(id)).collect(),
            next_page_token: next.map(str::to_string),
        })
    }

    fn ids(set: &PlaceSet) -> Vec<&str> {
        set.places.iter().map(|p| p.external_id.as_str()).collect()
    }

    fn published(outcome: SyncOutcome) -> (PlaceSet, Option<PlaceQuery>) {
        match outcome {
            SyncOutcome::Published {
                places,
                continuation,
            } => (places, continuation),
            other => panic!("expected Published, got {:?}", other),
        }
    }

    fn sync() -> PlaceSynchronizer {
        PlaceSynchronizer::new("session-1", &EngineConfig::default())
    }

    #[test]
    fn query_carries_context() {
        let mut s = sync();
        let q = s.request_refresh(LatLng::new(1.0, 2.0));
        assert_eq!(q.session_id, "session-1");
        assert_eq!(q.seq, 1);
        assert_eq!(q.page, 1);
        assert_eq!(q.radius_m, 2000);
        assert_eq!(q.category, "food");
        assert_eq!(q.page_token, None);
        assert!(s.is_in_flight());
    }

    #[test]
    fn refresh_replaces_wholesale_and_dedups() {
        let mut s = sync();
        let q = s.request_refresh(LatLng::new(0.0, 0.0));
        let (set, next) = published(s.accept(&q, ok(&["a", "b", "a"], None)));
        assert_eq!(ids(&set), vec!["a", "b"]);
        assert!(next.is_none());
        assert!(!s.is_in_flight());

        let q = s.request_refresh(LatLng::new(1.0, 1.0));
        let (set, _) = published(s.accept(&q, ok(&["c"], None)));
        assert_eq!(ids(&set), vec!["c"]);
        assert_eq!(set.refresh_seq, 2);
    }

    #[test]
    fn superseded_refresh_never_lands() {
        let mut s = sync();
        let a = s.request_refresh(LatLng::new(0.0, 0.0));
        let b = s.request_refresh(LatLng::new(5.0, 5.0));

        let (set, _) = published(s.accept(&b, ok(&["from-b"], None)));
        assert_eq!(ids(&set), vec!["from-b"]);

        assert_eq!(
            s.accept(&a, ok(&["from-a"], None)),
            SyncOutcome::Stale { seq: 1, current: 2 }
        );
        assert_eq!(ids(s.published()), vec!["from-b"]);
    }

    #[test]
    fn stale_even_when_the_newer_one_is_still_pending() {
        let mut s = sync();
        let a = s.request_refresh(LatLng::new(0.0, 0.0));
        let _b = s.request_refresh(LatLng::new(5.0, 5.0));

        assert!(matches!(s.accept(&a, ok(&["from-a"], None)), SyncOutcome::Stale { .. }));
        assert!(s.published().is_empty());
        assert!(s.is_in_flight());
    }

    #[test]
    fn failure_keeps_last_good_set() {
        let mut s = sync();
        let q = s.request_refresh(LatLng::new(0.0, 0.0));
        published(s.accept(&q, ok(&["a"], None)));

        let q = s.request_refresh(LatLng::new(1.0, 0.0));
        let outcome = s.accept(
            &q,
            Ok(PlacePage {
                status: SearchStatus::OverQueryLimit,
                results: vec![place("ignored")],
                next_page_token: None,
            }),
        );
        assert_eq!(
            outcome,
            SyncOutcome::Failed(SearchError::Status(SearchStatus::OverQueryLimit))
        );
        assert_eq!(ids(s.published()), vec!["a"]);

        let q = s.request_refresh(LatLng::new(2.0, 0.0));
        let outcome = s.accept(&q, Err(SearchError::Transport("reset".to_string())));
        assert!(matches!(outcome, SyncOutcome::Failed(SearchError::Transport(_))));
        assert_eq!(ids(s.published()), vec!["a"]);
        assert!(!s.is_in_flight());
    }

    #[test]
    fn zero_results_is_an_empty_answer() {
        let mut s = sync();
        let q = s.request_refresh(LatLng::new(0.0, 0.0));
        published(s.accept(&q, ok(&["a"], None)));

        let q = s.request_refresh(LatLng::new(70.0, 0.0));
        let (set, _) = published(s.accept(
            &q,
            Ok(PlacePage {
                status: SearchStatus::ZeroResults,
                results: vec![],
                next_page_token: None,
            }),
        ));
        assert!(set.is_empty());
        assert_eq!(set.refresh_seq, 2);
    }

    #[test]
    fn pages_extend_the_same_refresh() {
        let mut s = sync();
        let q1 = s.request_refresh(LatLng::new(0.0, 0.0));
        let (set, next) = published(s.accept(&q1, ok(&["a", "b"], Some("t2"))));
        assert_eq!(ids(&set), vec!["a", "b"]);
        assert_eq!(set.pages, 1);

        let q2 = next.unwrap();
        assert_eq!(q2.seq, q1.seq);
        assert_eq!(q2.page, 2);
        assert_eq!(q2.page_token.as_deref(), Some("t2"));
        assert_eq!(q2.centroid, q1.centroid);

        let (set, next) = published(s.accept(&q2, ok(&["b", "c"], Some("t3"))));
        assert_eq!(ids(&set), vec!["a", "b", "c"]);
        assert_eq!(set.pages, 2);

        let q3 = next.unwrap();
        let (set, next) = published(s.accept(&q3, ok(&["d"], Some("t4"))));
        assert_eq!(ids(&set), vec!["a", "b", "c", "d"]);
        // max_pages defaults to 3
        assert!(next.is_none());
        assert!(!s.is_in_flight());
    }

    #[test]
    fn continuation_of_superseded_refresh_is_stale() {
        let mut s = sync();
        let q1 = s.request_refresh(LatLng::new(0.0, 0.0));
        let (_, next) = published(s.accept(&q1, ok(&["a"], Some("t2"))));

        let fresh = s.request_refresh(LatLng::new(3.0, 3.0));
        assert!(matches!(s.accept(&next.unwrap(), ok(&["late"], None)), SyncOutcome::Stale { .. }));

        let (set, _) = published(s.accept(&fresh, ok(&["x"], None)));
        assert_eq!(ids(&set), vec!["x"]);
    }

    #[test]
    fn duplicate_page_delivery_is_stale() {
        let mut s = sync();
        let q1 = s.request_refresh(LatLng::new(0.0, 0.0));
        published(s.accept(&q1, ok(&["a"], Some("t2"))));
        assert!(matches!(s.accept(&q1, ok(&["again"], None)), SyncOutcome::Stale { .. }));
        assert_eq!(ids(s.published()), vec!["a"]);
    }

    #[test]
    fn clear_empties_and_invalidates() {
        let mut s = sync();
        let q = s.request_refresh(LatLng::new(0.0, 0.0));
        published(s.accept(&q, ok(&["a"], None)));

        let pending = s.request_refresh(LatLng::new(1.0, 1.0));
        let cleared = s.clear();
        assert!(cleared.is_empty());
        assert_eq!(cleared.refresh_seq, 3);
        assert!(matches!(s.accept(&pending, ok(&["b"], None)), SyncOutcome::Stale { .. }));
        assert!(s.published().is_empty());
    }
}
