//! AIS Vessel State Library
//!
//! Projects a stream of already-decoded AIS messages onto live, per-vessel state
//! and publishes a full snapshot to each vessel's subscribers after every update.
//!
//! # Architecture
//!
//! - [`fields`] - pure field normalization (sentinels, scaling, enum tables)
//! - [`store`] - per-vessel records, one lock per vessel
//! - [`router`] - message classification, merge, publication
//! - [`channel`] - one notification channel per tracked vessel
//!
//! The library does NOT:
//! - Parse NMEA sentences or AIS bit fields
//! - Listen on sockets or read files
//! - Persist history or render anything
//!
//! Those belong to the host application (see `ais-state-cli`).
//!
//! # Example Usage
//!
//! ```
//! use ais_state::{DecodedMessage, MessageRouter, Mmsi, TrackerConfig};
//!
//! let config = TrackerConfig::new().add_vessel("123456789");
//! let router = MessageRouter::new(&config);
//! let updates = router.subscribe(&Mmsi::from("123456789")).unwrap();
//!
//! let message = DecodedMessage::new(1, "123456789")
//!     .with_field("lat", 51.0)
//!     .with_field("lon", 4.0)
//!     .with_field("speed", 125)
//!     .with_field("status", 0);
//! router.process(&message);
//!
//! let snapshot = updates.try_recv().unwrap();
//! assert_eq!(snapshot.state.speed, Some(12.5));
//! ```

// Public modules
pub mod channel;
pub mod config;
pub mod fields;
pub mod router;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use channel::{ChannelRegistry, SnapshotReceiver, SnapshotSender, VesselChannel};
pub use config::TrackerConfig;
pub use fields::{
    FieldDescriptor, FieldKey, FieldUpdate, ManeuverIndicator, NavigationStatus, NormalizeError,
    KINEMATIC_FIELDS, TABLE_REVISION,
};
pub use router::{MessageRouter, RouteOutcome, RouterStats};
pub use store::{VesselSnapshot, VesselState, VesselStore};
pub use types::{DecodedMessage, MessageClass, Mmsi, RawValue, Result, StateError, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty configuration tracks nothing
        let router = MessageRouter::new(&TrackerConfig::new());
        assert!(router.channels().is_empty());
        assert_eq!(router.process(&DecodedMessage::new(1, "1")), RouteOutcome::Untracked);
    }
}
