// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! One meeting session: a task that owns the point set and everything
//! derived from it.
//!
//! Mutations, geocode completions and place responses all arrive on one
//! channel and are handled one at a time, so the aggregates for mutation N
//! are published before mutation N+1 is looked at. Results are published
//! through watch channels; the session task is the only writer.

use crate::collaborators::{GeocodeRequest, Geocoder, PlacePage, PlaceQuery, PlaceSearch};
use crate::config::EngineConfig;
use crate::coordinator::{Aggregates, Coordinator, RefreshDecision};
use crate::error::{EngineError, GeocodeError, SearchError};
use crate::places::{PlaceSet, PlaceSynchronizer, SyncOutcome};
use crate::point_set::{Point, PointEvent, PointId, PointSet};
use ahash::AHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};


pub type AggregatesReply = oneshot::Sender<Result<Arc<Aggregates>, EngineError>>;

pub enum SessionCommand {
    Upsert {
        id: PointId,
        lat: f64,
        lng: f64,
        reply: AggregatesReply,
    },
    Put {
        point: Point,
        reply: AggregatesReply,
    },
    Remove {
        id: PointId,
        reply: AggregatesReply,
    },
    Locate {
        id: PointId,
        address: String,
        reply: AggregatesReply,
    },
    Geocoded {
        request: GeocodeRequest,
        result: Result<crate::geometry::LatLng, GeocodeError>,
        reply: AggregatesReply,
    },
    PlacesArrived {
        query: PlaceQuery,
        result: Result<PlacePage, SearchError>,
    },
    Shutdown,
}

/// Things observers may want to know that do not change published state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    SearchFailed { seq: u64, error: SearchError },
    RefreshDiscarded { seq: u64, current: u64 },
    GeocodeFailed(GeocodeError),
}

struct SessionActor<G, S> {
    session_id: String,
    page_delay: Duration,
    points: PointSet,
    coordinator: Coordinator,
    places: PlaceSynchronizer,
    geocode_seq: u64,
    /// Newest geocode sequence number submitted per point.
    latest_geocode: AHashMap<PointId, u64>,
    geocoder: Arc<G>,
    search: Arc<S>,
    rx: mpsc::Receiver<SessionCommand>,
    weak_tx: mpsc::WeakSender<SessionCommand>,
    aggregates_tx: watch::Sender<Arc<Aggregates>>,
    places_tx: watch::Sender<Arc<PlaceSet>>,
    notices_tx: broadcast::Sender<SessionNotice>,
}

impl<G: Geocoder, S: PlaceSearch> SessionActor<G, S> {
    async fn run(mut self) {
        info!(session = %self.session_id, "session started");

        while let Some(command) = self.rx.recv().await {
            match command {
                SessionCommand::Upsert { id, lat, lng, reply } => {
                    let event = self.points.upsert(id, lat, lng);
                    let _ = reply.send(Ok(self.mutated(event)));
                }
                SessionCommand::Put { point, reply } => {
                    let event = self.points.upsert_point(point);
                    let _ = reply.send(Ok(self.mutated(event)));
                }
                SessionCommand::Remove { id, reply } => {
                    let aggregates = match self.points.remove(&id) {
                        Some(event) => self.mutated(event),
                        None => {
                            debug!(point_id = %id, "remove of unknown point ignored");
                            self.aggregates_tx.borrow().clone()
                        }
                    };
                    let _ = reply.send(Ok(aggregates));
                }
                SessionCommand::Locate { id, address, reply } => {
                    self.geocode_seq += 1;
                    self.latest_geocode.insert(id.clone(), self.geocode_seq);
                    let request = GeocodeRequest {
                        session_id: self.session_id.clone(),
                        point_id: id,
                        address,
                        seq: self.geocode_seq,
                    };
                    self.spawn_geocode(request, reply);
                }
                SessionCommand::Geocoded {
                    request,
                    result,
                    reply,
                } => {
                    let _ = reply.send(self.geocoded(request, result));
                }
                SessionCommand::PlacesArrived { query, result } => {
                    self.places_arrived(query, result);
                }
                SessionCommand::Shutdown => break,
            }
        }

        info!(session = %self.session_id, "session ended");
    }

    fn mutated(&mut self, event: PointEvent) -> Arc<Aggregates> {
        let recomputed = self.coordinator.apply(&self.points, &event);
        let aggregates = Arc::new(recomputed.aggregates);
        self.aggregates_tx.send_replace(aggregates.clone());

        match recomputed.refresh {
            RefreshDecision::Due(centroid) => {
                let query = self.places.request_refresh(centroid);
                self.spawn_search(query, Duration::ZERO);
            }
            RefreshDecision::Clear => {
                let cleared = self.places.clear();
                self.places_tx.send_replace(Arc::new(cleared));
            }
            RefreshDecision::Unchanged => {}
        }

        aggregates
    }

    #[tracing::instrument(skip(self, request, result), fields(session = %self.session_id, point_id = %request.point_id, seq = request.seq))]
    fn geocoded(
        &mut self,
        request: GeocodeRequest,
        result: Result<crate::geometry::LatLng, GeocodeError>,
    ) -> Result<Arc<Aggregates>, EngineError> {
        let latest = self.latest_geocode.get(&request.point_id).copied().unwrap_or(0);
        if latest > request.seq {
            debug!(latest, "superseded geocode ignored");
            return Ok(self.aggregates_tx.borrow().clone());
        }

        match result {
            Ok(coord) => {
                let point = Point::new(request.point_id, coord.lat, coord.lng).with_label(request.address);
                let event = self.points.upsert_point(point);
                Ok(self.mutated(event))
            }
            Err(e) => {
                warn!("{}", e);
                let _ = self.notices_tx.send(SessionNotice::GeocodeFailed(e.clone()));
                Err(EngineError::Geocode(e))
            }
        }
    }

    fn places_arrived(&mut self, query: PlaceQuery, result: Result<PlacePage, SearchError>) {
        match self.places.accept(&query, result) {
            SyncOutcome::Published {
                places,
                continuation,
            } => {
                self.places_tx.send_replace(Arc::new(places));
                if let Some(next) = continuation {
                    self.spawn_search(next, self.page_delay);
                }
            }
            SyncOutcome::Stale { seq, current } => {
                let _ = self
                    .notices_tx
                    .send(SessionNotice::RefreshDiscarded { seq, current });
            }
            SyncOutcome::Failed(error) => {
                let _ = self.notices_tx.send(SessionNotice::SearchFailed {
                    seq: query.seq,
                    error,
                });
            }
        }
    }

    fn spawn_geocode(&self, request: GeocodeRequest, reply: AggregatesReply) {
        let geocoder = self.geocoder.clone();
        let tx = self.weak_tx.clone();

        tokio::spawn(async move {
            let result = geocoder.geocode(&request).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx
                    .send(SessionCommand::Geocoded {
                        request,
                        result,
                        reply,
                    })
                    .await;
            }
        });
    }

    fn spawn_search(&self, query: PlaceQuery, delay: Duration) {
        let search = self.search.clone();
        let tx = self.weak_tx.clone();

        debug!(seq = query.seq, page = query.page, ?delay, "scheduling place search");

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = search.search(&query).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SessionCommand::PlacesArrived { query, result }).await;
            }
        });
    }
}

/// Cheap to clone; the session ends when every handle is dropped or
/// [`SessionHandle::shutdown`] is called.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    tx: mpsc::Sender<SessionCommand>,
    aggregates: watch::Receiver<Arc<Aggregates>>,
    places: watch::Receiver<Arc<PlaceSet>>,
    notices: broadcast::Sender<SessionNotice>,
}

/// Start a session task on the current tokio runtime.
pub fn spawn_session<G: Geocoder, S: PlaceSearch>(
    session_id: impl Into<String>,
    config: &EngineConfig,
    geocoder: Arc<G>,
    search: Arc<S>,
) -> Result<(SessionHandle, JoinHandle<()>), EngineError> {
    config.validate()?;

    let session_id = session_id.into();
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (aggregates_tx, aggregates) = watch::channel(Arc::new(Aggregates::default()));
    let (places_tx, places) = watch::channel(Arc::new(PlaceSet::empty(0)));
    let (notices_tx, _) = broadcast::channel(32);

    let actor = SessionActor {
        session_id: session_id.clone(),
        page_delay: config.page_delay(),
        points: PointSet::new(),
        coordinator: Coordinator::new(config),
        places: PlaceSynchronizer::new(session_id.clone(), config),
        geocode_seq: 0,
        latest_geocode: AHashMap::new(),
        geocoder,
        search,
        rx,
        weak_tx: tx.downgrade(),
        aggregates_tx,
        places_tx,
        notices_tx: notices_tx.clone(),
    };

    let join = tokio::spawn(actor.run());

    Ok((
        SessionHandle {
            session_id,
            tx,
            aggregates,
            places,
            notices: notices_tx,
        },
        join,
    ))
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn request(
        &self,
        make: impl FnOnce(AggregatesReply) -> SessionCommand,
    ) -> Result<Arc<Aggregates>, EngineError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::SessionClosed(self.session_id.clone()))?;
        response
            .await
            .map_err(|_| EngineError::SessionClosed(self.session_id.clone()))?
    }

    pub async fn add_point(
        &self,
        id: impl Into<PointId>,
        lat: f64,
        lng: f64,
    ) -> Result<Arc<Aggregates>, EngineError> {
        let id = id.into();
        self.request(|reply| SessionCommand::Upsert { id, lat, lng, reply })
            .await
    }

    /// Same as [`SessionHandle::add_point`]: an unknown id is inserted.
    pub async fn update_point(
        &self,
        id: impl Into<PointId>,
        lat: f64,
        lng: f64,
    ) -> Result<Arc<Aggregates>, EngineError> {
        self.add_point(id, lat, lng).await
    }

    /// Insert or overwrite a point as given, malformed or not.
    pub async fn put_point(&self, point: Point) -> Result<Arc<Aggregates>, EngineError> {
        self.request(|reply| SessionCommand::Put { point, reply }).await
    }

    pub async fn remove_point(&self, id: impl Into<PointId>) -> Result<Arc<Aggregates>, EngineError> {
        let id = id.into();
        self.request(|reply| SessionCommand::Remove { id, reply }).await
    }

    /// Geocode `address` and place point `id` there. On a geocode failure the
    /// point set is left as it was and the failure is returned.
    pub async fn add_address(
        &self,
        id: impl Into<PointId>,
        address: impl Into<String>,
    ) -> Result<Arc<Aggregates>, EngineError> {
        let id = id.into();
        let address = address.into();
        self.request(|reply| SessionCommand::Locate { id, address, reply })
            .await
    }

    pub async fn update_address(
        &self,
        id: impl Into<PointId>,
        address: impl Into<String>,
    ) -> Result<Arc<Aggregates>, EngineError> {
        self.add_address(id, address).await
    }

    pub fn aggregates(&self) -> Arc<Aggregates> {
        self.aggregates.borrow().clone()
    }

    pub fn places(&self) -> Arc<PlaceSet> {
        self.places.borrow().clone()
    }

    pub fn subscribe_aggregates(&self) -> watch::Receiver<Arc<Aggregates>> {
        self.aggregates.clone()
    }

    pub fn subscribe_places(&self) -> watch::Receiver<Arc<PlaceSet>> {
        self.places.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}
