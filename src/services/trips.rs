//! In-memory trip collection for a single session.
//!
//! The store is the only owner of its trips. Callers get copies or shared
//! borrows for display, and every mutation goes through `save_trip`,
//! `update_trip` or `delete_trip`. Insertion order is the iteration order.
//!
//! Aggregates are recomputed from the collection on every call.

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    models::trip::{NewTrip, Trip, TripPatch},
    services::{gateway::RemoteGateway, sample::sample_trips},
};

/// Shared handle to a session's store.
pub type TripHandle = Arc<RwLock<TripStore>>;

#[derive(Debug, Clone, Default)]
pub struct TripStore {
    trips: Vec<Trip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStats {
    pub trips: usize,
    pub activities: usize,
    pub travel_days: i64,
    pub countries: usize,
}

impl TripStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from already-materialised trips, keeping their ids.
    pub fn with_trips(trips: Vec<Trip>) -> Self {
        Self { trips }
    }

    pub fn seeded() -> Self {
        Self::with_trips(sample_trips())
    }

    pub fn into_handle(self) -> TripHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter()
    }

    pub fn save_trip(&mut self, input: NewTrip) -> Trip {
        let trip = Trip::from_new(input);
        debug!(trip_id = %trip.id, name = %trip.name, "trip saved");
        self.trips.push(trip.clone());
        trip
    }

    /// Shallow-merges `patch` into the trip with `id`.
    ///
    /// A missing id leaves the collection untouched and returns `None`; it is
    /// up to the caller whether that counts as an error.
    pub fn update_trip(&mut self, id: &str, patch: TripPatch) -> Option<Trip> {
        let trip = self.trips.iter_mut().find(|trip| trip.id == id)?;
        trip.apply(patch);
        debug!(trip_id = %id, "trip updated");
        Some(trip.clone())
    }

    /// Removes the trip with `id`, returning it. Missing ids are a no-op.
    pub fn delete_trip(&mut self, id: &str) -> Option<Trip> {
        let pos = self.trips.iter().position(|trip| trip.id == id)?;
        debug!(trip_id = %id, "trip deleted");
        Some(self.trips.remove(pos))
    }

    pub fn get_trip_by_id(&self, id: &str) -> Option<&Trip> {
        self.trips.iter().find(|trip| trip.id == id)
    }

    /// First `limit` trips in insertion order.
    pub fn upcoming(&self, limit: usize) -> &[Trip] {
        &self.trips[..limit.min(self.trips.len())]
    }

    pub fn count(&self) -> usize {
        self.trips.len()
    }

    pub fn total_activities(&self) -> usize {
        self.trips.iter().map(|trip| trip.activities.len()).sum()
    }

    /// Sum of per-trip day spans. Malformed ranges contribute negative values.
    pub fn total_travel_days(&self) -> i64 {
        self.trips.iter().map(Trip::travel_days).sum()
    }

    /// Distinct destination countries, compared case-sensitively.
    pub fn distinct_countries(&self) -> usize {
        self.trips
            .iter()
            .map(|trip| trip.destination.country.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn stats(&self) -> TripStats {
        TripStats {
            trips: self.count(),
            activities: self.total_activities(),
            travel_days: self.total_travel_days(),
            countries: self.distinct_countries(),
        }
    }
}

/// Copies `user_id`'s remote trips into `store` and returns the saved copies.
///
/// Each copy gets a fresh store id. Remote trips without a destination cannot
/// be represented in the store and are skipped.
pub async fn import_remote(
    gateway: &RemoteGateway,
    store: &mut TripStore,
    user_id: &str,
) -> Result<Vec<Trip>, AppError> {
    let remote = gateway.trips().list_for_user(user_id).await?;
    let mut imported = Vec::with_capacity(remote.len());
    for trip in remote {
        let remote_id = trip.trip.id.clone();
        match trip.into_new_trip() {
            Some(input) => imported.push(store.save_trip(input)),
            None => warn!(trip_id = %remote_id, "skipping remote trip without destination"),
        }
    }
    info!(user_id = %user_id, count = imported.len(), "imported remote trips");
    Ok(imported)
}
