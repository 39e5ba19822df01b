//! Vessel State Store
//!
//! One mutable record of last-known values per vessel. Records are created up
//! front for every configured vessel and lazily (idempotently) for anything
//! else that is looked up. Each record sits behind its own mutex, so updates to
//! one vessel are serialized while different vessels never contend.

use crate::fields::{FieldKey, FieldUpdate, ManeuverIndicator, NavigationStatus};
use crate::types::{Mmsi, Timestamp};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Last-known, normalized state of a single vessel
///
/// Every field is either `None` or a normalized value; raw sentinels and raw
/// scales never reach this struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VesselState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Course over ground, degrees
    pub course: Option<f64>,
    /// True heading, degrees
    pub heading: Option<u16>,
    /// Speed over ground, knots
    pub speed: Option<f64>,
    pub status: Option<NavigationStatus>,
    /// Rate of turn, degrees per minute (unsigned, see `fields::normalize_turn`)
    pub turn: Option<f64>,
    pub maneuver: Option<ManeuverIndicator>,
    pub shipname: Option<String>,
    pub callsign: Option<String>,
    pub last_seen: Option<Timestamp>,
}

impl VesselState {
    /// Apply one normalized update (field-wise overwrite)
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Latitude(v) => self.latitude = Some(v),
            FieldUpdate::Longitude(v) => self.longitude = Some(v),
            FieldUpdate::Course(v) => self.course = Some(v),
            FieldUpdate::Heading(v) => self.heading = Some(v),
            FieldUpdate::Speed(v) => self.speed = Some(v),
            FieldUpdate::Status(v) => self.status = Some(v),
            FieldUpdate::Turn(v) => self.turn = Some(v),
            FieldUpdate::Maneuver(v) => self.maneuver = Some(v),
            FieldUpdate::ShipName(v) => self.shipname = Some(v),
            FieldUpdate::CallSign(v) => self.callsign = Some(v),
            FieldUpdate::LastSeen(ts) => self.last_seen = Some(ts),
            FieldUpdate::Cleared(key) => self.clear(key),
        }
    }

    fn clear(&mut self, key: FieldKey) {
        match key {
            FieldKey::Course => self.course = None,
            FieldKey::Heading => self.heading = None,
            FieldKey::Speed => self.speed = None,
            FieldKey::Status => self.status = None,
            FieldKey::Turn => self.turn = None,
            FieldKey::Maneuver => self.maneuver = None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Full snapshot as published to subscribers
    pub fn snapshot(&self, mmsi: &Mmsi) -> VesselSnapshot {
        VesselSnapshot {
            mmsi: mmsi.clone(),
            state: self.clone(),
        }
    }
}

/// Published view of a vessel: its key plus the complete state (not a diff)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselSnapshot {
    pub mmsi: Mmsi,
    #[serde(flatten)]
    pub state: VesselState,
}

type Record = Arc<Mutex<VesselState>>;

/// Concurrent map of per-vessel records
#[derive(Debug, Default)]
pub struct VesselStore {
    records: DashMap<Mmsi, Record>,
}

impl VesselStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a zero-initialized record for each vessel
    pub fn with_vessels<I>(vessels: I) -> Self
    where
        I: IntoIterator<Item = Mmsi>,
    {
        let store = Self::new();
        for mmsi in vessels {
            store.records.entry(mmsi).or_default();
        }
        store
    }

    /// Fetch (or create) the record; the map shard is released before the record is locked
    fn record(&self, mmsi: &Mmsi) -> Record {
        if let Some(record) = self.records.get(mmsi) {
            return Arc::clone(record.value());
        }
        Arc::clone(self.records.entry(mmsi.clone()).or_default().value())
    }

    fn lock(record: &Record) -> MutexGuard<'_, VesselState> {
        // State is plain data; a panicking writer cannot leave it half-typed
        record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of a vessel, creating an empty record on first reference
    pub fn get(&self, mmsi: &Mmsi) -> VesselState {
        let record = self.record(mmsi);
        let state = Self::lock(&record);
        state.clone()
    }

    /// Current state of a vessel without creating a record
    pub fn peek(&self, mmsi: &Mmsi) -> Option<VesselState> {
        let record = self.records.get(mmsi).map(|r| Arc::clone(r.value()))?;
        let state = Self::lock(&record);
        Some(state.clone())
    }

    /// Apply a batch of updates atomically and return the merged state
    pub fn merge(&self, mmsi: &Mmsi, updates: Vec<FieldUpdate>) -> VesselState {
        self.merge_and_then(mmsi, updates, VesselState::clone)
    }

    /// Apply a batch of updates and run `f` on the merged state before the
    /// vessel's lock is released
    pub fn merge_and_then<F, R>(&self, mmsi: &Mmsi, updates: Vec<FieldUpdate>, f: F) -> R
    where
        F: FnOnce(&VesselState) -> R,
    {
        let record = self.record(mmsi);
        let mut state = Self::lock(&record);
        for update in updates {
            state.apply(update);
        }
        f(&state)
    }

    pub fn contains(&self, mmsi: &Mmsi) -> bool {
        self.records.contains_key(mmsi)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifiers of all records, sorted
    pub fn vessels(&self) -> Vec<Mmsi> {
        let mut vessels: Vec<Mmsi> = self.records.iter().map(|r| r.key().clone()).collect();
        vessels.sort();
        vessels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_precreates_records() {
        let store = VesselStore::with_vessels(vec![Mmsi::from("1"), Mmsi::from("2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.peek(&Mmsi::from("1")), Some(VesselState::default()));
        assert_eq!(store.peek(&Mmsi::from("3")), None);
    }

    #[test]
    fn test_get_creates_lazily_and_idempotently() {
        let store = VesselStore::new();
        let mmsi = Mmsi::from("244123456");
        assert_eq!(store.get(&mmsi), VesselState::default());
        assert_eq!(store.get(&mmsi), VesselState::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let store = VesselStore::new();
        let mmsi = Mmsi::from("1");
        store.merge(&mmsi, vec![FieldUpdate::Speed(12.5), FieldUpdate::Heading(90)]);
        let state = store.merge(&mmsi, vec![FieldUpdate::ShipName("ALBATROS".to_string())]);

        assert_eq!(state.speed, Some(12.5));
        assert_eq!(state.heading, Some(90));
        assert_eq!(state.shipname.as_deref(), Some("ALBATROS"));
        assert_eq!(state.latitude, None);
    }

    #[test]
    fn test_cleared_field() {
        let mut state = VesselState::default();
        state.apply(FieldUpdate::Status(NavigationStatus::Moored));
        state.apply(FieldUpdate::Cleared(FieldKey::Status));
        assert_eq!(state.status, None);
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut state = VesselState::default();
        state.apply(FieldUpdate::Latitude(51.0));
        state.apply(FieldUpdate::Status(NavigationStatus::UnderWayUsingEngine));
        let json = serde_json::to_value(state.snapshot(&Mmsi::from(123456789u32))).unwrap();

        assert_eq!(json["mmsi"], "123456789");
        assert_eq!(json["latitude"], 51.0);
        assert_eq!(json["status"], "UNDER_WAY_USING_ENGINE");
        assert!(json["callsign"].is_null());
    }
}
