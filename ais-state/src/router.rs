//! Message Router
//!
//! Turns decoded messages into per-vessel state updates and publications:
//! 1. Resolve the vessel - untracked vessels are dropped with a debug log
//! 2. Classify by `msg_type` and normalize the fields that class carries
//! 3. Merge the batch into the vessel's record
//! 4. Publish the full snapshot while the vessel's lock is still held, so
//!    subscribers see batches in processing order and never half-applied

use crate::channel::{ChannelRegistry, SnapshotReceiver, SnapshotSender};
use crate::config::TrackerConfig;
use crate::fields::{self, FieldUpdate, NormalizeError, Normalized, KINEMATIC_FIELDS};
use crate::store::{VesselState, VesselStore};
use crate::types::{DecodedMessage, MessageClass, Mmsi, RawValue, Result};

/// Static/voyage fields, keyed by decoder field name
const STATIC_FIELDS: [(&str, fn(&RawValue) -> Normalized); 2] = [
    ("shipname", fields::normalize_shipname),
    ("callsign", fields::normalize_callsign),
];

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Vessel not tracked; nothing stored, nothing published
    Untracked,
    /// Message processed for a tracked vessel
    Applied {
        class: MessageClass,
        /// Number of fields written (including cleared ones)
        fields_updated: usize,
        /// Number of fields rejected by the normalizer
        field_errors: usize,
        /// Subscribers that received the snapshot, `None` if nothing was published
        published: Option<usize>,
    },
}

/// Counters over a stream of messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub processed: usize,
    pub untracked: usize,
    pub applied: usize,
    pub published: usize,
    pub field_errors: usize,
}

impl RouterStats {
    pub fn record(&mut self, outcome: &RouteOutcome) {
        self.processed += 1;
        match outcome {
            RouteOutcome::Untracked => self.untracked += 1,
            RouteOutcome::Applied {
                field_errors,
                published,
                ..
            } => {
                self.applied += 1;
                self.field_errors += field_errors;
                if published.is_some() {
                    self.published += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: &RouterStats) {
        self.processed += other.processed;
        self.untracked += other.untracked;
        self.applied += other.applied;
        self.published += other.published;
        self.field_errors += other.field_errors;
    }
}

/// Normalized field batch of one message
#[derive(Debug, Default)]
struct Batch {
    updates: Vec<FieldUpdate>,
    errors: usize,
}

impl Batch {
    fn push(&mut self, mmsi: &Mmsi, key: &'static str, result: Normalized) {
        match result {
            Ok(Some(update)) => self.updates.push(update),
            Ok(None) => log::trace!("{}: '{}' not available", mmsi, key),
            Err(NormalizeError::UnknownCode { field, code }) => {
                log::warn!("{}: unrecognized {} code {}, publishing as unknown", mmsi, field, code);
                if let Some(descriptor) = KINEMATIC_FIELDS.iter().find(|d| d.name == field) {
                    self.updates.push(FieldUpdate::Cleared(descriptor.key));
                }
            }
            Err(e) => {
                log::warn!("{}: {}", mmsi, e);
                self.errors += 1;
            }
        }
    }
}

/// The projection engine: tracked vessels, their state and their channels
#[derive(Debug)]
pub struct MessageRouter {
    store: VesselStore,
    channels: ChannelRegistry,
    publish_empty_updates: bool,
}

impl MessageRouter {
    /// Build the store and channel mapping for the configured vessels
    pub fn new(config: &TrackerConfig) -> Self {
        log::info!("Tracking {} vessel(s)", config.vessels.len());
        Self {
            store: VesselStore::with_vessels(config.vessels.iter().cloned()),
            channels: ChannelRegistry::new(config.vessels.iter().cloned()),
            publish_empty_updates: config.publish_empty_updates,
        }
    }

    pub fn store(&self) -> &VesselStore {
        &self.store
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn is_tracked(&self, mmsi: &Mmsi) -> bool {
        self.channels.is_tracked(mmsi)
    }

    /// Current state of a tracked vessel
    pub fn state(&self, mmsi: &Mmsi) -> Option<VesselState> {
        if !self.is_tracked(mmsi) {
            return None;
        }
        self.store.peek(mmsi)
    }

    pub fn subscribe(&self, mmsi: &Mmsi) -> Result<SnapshotReceiver> {
        self.channels.subscribe(mmsi)
    }

    pub fn attach(&self, mmsi: &Mmsi, tx: SnapshotSender) -> Result<()> {
        self.channels.attach(mmsi, tx)
    }

    /// Process one decoded message
    pub fn process(&self, message: &DecodedMessage) -> RouteOutcome {
        let mmsi = &message.mmsi;
        let Some(channel) = self.channels.get(mmsi) else {
            log::debug!("Dropping message type {} for untracked vessel {}", message.msg_type, mmsi);
            return RouteOutcome::Untracked;
        };

        let class = message.class();
        log::debug!("{}: message type {} ({})", mmsi, message.msg_type, class);

        let mut batch = Self::collect_updates(message, class);
        let fields_updated = batch.updates.len();
        let should_publish = fields_updated > 0 || self.publish_empty_updates;

        // A gated batch stays unmerged so stored state never runs ahead of the last snapshot
        if let (true, Some(received_at)) = (should_publish, message.received_at) {
            batch.updates.push(FieldUpdate::LastSeen(received_at));
        }

        let published = self.store.merge_and_then(mmsi, batch.updates, |state| {
            should_publish.then(|| channel.publish(&state.snapshot(mmsi)))
        });

        RouteOutcome::Applied {
            class,
            fields_updated,
            field_errors: batch.errors,
            published,
        }
    }

    /// Process a sequence of messages in order
    pub fn process_all<I>(&self, messages: I) -> RouterStats
    where
        I: IntoIterator<Item = DecodedMessage>,
    {
        let mut stats = RouterStats::default();
        for message in messages {
            stats.record(&self.process(&message));
        }
        stats
    }

    /// Select and normalize the fields relevant to the message class
    fn collect_updates(message: &DecodedMessage, class: MessageClass) -> Batch {
        let mut batch = Batch::default();
        let mmsi = &message.mmsi;

        match class {
            MessageClass::PositionReport => {
                if let Some(lat) = message.field("lat") {
                    batch.push(mmsi, "lat", fields::normalize_latitude(lat));
                }
                if let Some(lon) = message.field("lon") {
                    batch.push(mmsi, "lon", fields::normalize_longitude(lon));
                }
                for descriptor in &KINEMATIC_FIELDS {
                    if let Some(raw) = message.field(descriptor.name) {
                        batch.push(mmsi, descriptor.name, descriptor.normalize(raw));
                    }
                }
            }
            MessageClass::StaticVoyage => {
                for (key, normalize) in STATIC_FIELDS {
                    if let Some(raw) = message.field(key) {
                        batch.push(mmsi, key, normalize(raw));
                    }
                }
            }
            MessageClass::Other => {}
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::NavigationStatus;

    fn router(vessels: &[&str]) -> MessageRouter {
        MessageRouter::new(&TrackerConfig::new().with_vessels(vessels.iter().copied()))
    }

    #[test]
    fn test_untracked_vessel_is_dropped() {
        let router = router(&["1"]);
        let message = DecodedMessage::new(1, "2").with_field("speed", 100);

        assert_eq!(router.process(&message), RouteOutcome::Untracked);
        assert!(router.state(&Mmsi::from("2")).is_none());
        assert!(!router.store().contains(&Mmsi::from("2")));
    }

    #[test]
    fn test_heartbeat_publication() {
        let router = router(&["1"]);
        let rx = router.subscribe(&Mmsi::from("1")).unwrap();

        let outcome = router.process(&DecodedMessage::new(18, "1").with_field("speed", 100));
        assert_eq!(
            outcome,
            RouteOutcome::Applied {
                class: MessageClass::Other,
                fields_updated: 0,
                field_errors: 0,
                published: Some(1),
            }
        );
        assert_eq!(rx.try_recv().unwrap().state, VesselState::default());
    }

    #[test]
    fn test_publication_gated_on_empty_batch() {
        let config = TrackerConfig::new().add_vessel("1").with_empty_publication(false);
        let router = MessageRouter::new(&config);
        let rx = router.subscribe(&Mmsi::from("1")).unwrap();

        router.process(&DecodedMessage::new(1, "1").with_field("heading", 511));
        assert!(rx.try_recv().is_err());

        router.process(&DecodedMessage::new(1, "1").with_field("heading", 270));
        assert_eq!(rx.try_recv().unwrap().state.heading, Some(270));
    }

    #[test]
    fn test_gated_batch_does_not_touch_last_seen() {
        let config = TrackerConfig::new().add_vessel("1").with_empty_publication(false);
        let router = MessageRouter::new(&config);
        let rx = router.subscribe(&Mmsi::from("1")).unwrap();
        let received_at = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        let outcome = router.process(&DecodedMessage::new(18, "1").with_received_at(received_at));
        assert!(matches!(outcome, RouteOutcome::Applied { published: None, .. }));
        assert!(rx.try_recv().is_err());
        assert_eq!(router.state(&Mmsi::from("1")).unwrap(), VesselState::default());

        router.process(
            &DecodedMessage::new(1, "1")
                .with_field("speed", 50)
                .with_received_at(received_at),
        );
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.state.last_seen, Some(received_at));
        assert_eq!(router.state(&Mmsi::from("1")).unwrap(), snapshot.state);
    }

    #[test]
    fn test_malformed_field_does_not_abort_batch() {
        let router = router(&["1"]);
        let message = DecodedMessage::new(1, "1")
            .with_field("speed", "fast")
            .with_field("course", 123.4);

        let outcome = router.process(&message);
        assert!(matches!(
            outcome,
            RouteOutcome::Applied { fields_updated: 1, field_errors: 1, .. }
        ));
        let state = router.state(&Mmsi::from("1")).unwrap();
        assert_eq!(state.course, Some(123.4));
        assert_eq!(state.speed, None);
    }

    #[test]
    fn test_unknown_status_is_published_as_null() {
        let router = router(&["1"]);
        router.process(&DecodedMessage::new(1, "1").with_field("status", 5));
        assert_eq!(router.state(&Mmsi::from("1")).unwrap().status, Some(NavigationStatus::Moored));

        router.process(&DecodedMessage::new(1, "1").with_field("status", 42));
        assert_eq!(router.state(&Mmsi::from("1")).unwrap().status, None);
    }

    #[test]
    fn test_unknown_maneuver_is_published_as_null() {
        let router = router(&["1"]);
        let rx = router.subscribe(&Mmsi::from("1")).unwrap();
        router.process(&DecodedMessage::new(1, "1").with_field("maneuver", 2));
        assert_eq!(
            rx.try_recv().unwrap().state.maneuver,
            Some(crate::fields::ManeuverIndicator::SpecialManeuver)
        );

        router.process(&DecodedMessage::new(1, "1").with_field("maneuver", 9));
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.state.maneuver, None);
        assert!(serde_json::to_value(&snapshot).unwrap()["maneuver"].is_null());
    }

    #[test]
    fn test_process_all_stats() {
        let router = router(&["1"]);
        let stats = router.process_all(vec![
            DecodedMessage::new(1, "1").with_field("lat", 51.0),
            DecodedMessage::new(1, "2").with_field("lat", 52.0),
            DecodedMessage::new(5, "1").with_field("shipname", 3),
        ]);

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.untracked, 1);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.field_errors, 1);
    }
}
