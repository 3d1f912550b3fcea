// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Incremental consensus-area engine for group meeting points.
//!
//! Participants' points go into a per-session [`point_set::PointSet`]. Every
//! mutation recomputes the centroid, framing and convex hull
//! ([`coordinator`]) and, when the centroid moves, refreshes the nearby places
//! around it ([`places`]). [`session`] runs all of that as one task per
//! session behind a cloneable handle.

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fixtures;
pub mod geometry;
pub mod places;
pub mod point_set;
pub mod session;

pub use collaborators::{DerivedPlace, Geocoder, PlacePage, PlaceQuery, PlaceSearch, SearchStatus};
pub use config::EngineConfig;
pub use coordinator::{Aggregates, Coordinator, RefreshDecision};
pub use error::{EngineError, GeocodeError, MalformedPoint, SearchError};
pub use geometry::{BoundingRegion, Framing, Hull, LatLng};
pub use places::{PlaceSet, PlaceSynchronizer, SyncOutcome};
pub use point_set::{Point, PointEvent, PointId, PointSet};
pub use session::{SessionHandle, SessionNotice, spawn_session};
