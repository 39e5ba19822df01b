//! Subscription/Publish interface
//!
//! Each tracked vessel owns exactly one [`VesselChannel`]. The mapping from
//! identifier to channel is built once from the configured vessel list and never
//! changes afterwards, so publishing is a plain map lookup.
//!
//! Subscriber queues are unbounded: a slow subscriber delays nothing and misses
//! nothing. Snapshots for one vessel arrive in the order the router produced them.

use crate::store::VesselSnapshot;
use crate::types::{Mmsi, Result, StateError};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub type SnapshotSender = flume::Sender<VesselSnapshot>;
pub type SnapshotReceiver = flume::Receiver<VesselSnapshot>;

/// Notification channel of a single vessel
#[derive(Debug)]
pub struct VesselChannel {
    mmsi: Mmsi,
    subscribers: Mutex<Vec<SnapshotSender>>,
}

impl VesselChannel {
    pub fn new(mmsi: Mmsi) -> Self {
        Self {
            mmsi,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn mmsi(&self) -> &Mmsi {
        &self.mmsi
    }

    /// Open a new subscription
    pub fn subscribe(&self) -> SnapshotReceiver {
        let (tx, rx) = flume::unbounded();
        self.attach(tx);
        rx
    }

    /// Attach an existing sender, e.g. to fan several vessels into one sink
    pub fn attach(&self, tx: SnapshotSender) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
    }

    /// Deliver a snapshot to every live subscriber and return how many received it
    ///
    /// Subscribers whose receiving side has been dropped are pruned.
    pub fn publish(&self, snapshot: &VesselSnapshot) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        log::trace!("Published {} to {} subscriber(s)", self.mmsi, subscribers.len());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Static vessel → channel mapping
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<Mmsi, VesselChannel>,
}

impl ChannelRegistry {
    pub fn new<I>(vessels: I) -> Self
    where
        I: IntoIterator<Item = Mmsi>,
    {
        let channels = vessels
            .into_iter()
            .map(|mmsi| (mmsi.clone(), VesselChannel::new(mmsi)))
            .collect();
        Self { channels }
    }

    pub fn get(&self, mmsi: &Mmsi) -> Option<&VesselChannel> {
        self.channels.get(mmsi)
    }

    pub fn is_tracked(&self, mmsi: &Mmsi) -> bool {
        self.channels.contains_key(mmsi)
    }

    pub fn subscribe(&self, mmsi: &Mmsi) -> Result<SnapshotReceiver> {
        self.get(mmsi)
            .map(VesselChannel::subscribe)
            .ok_or_else(|| StateError::UntrackedVessel(mmsi.clone()))
    }

    pub fn attach(&self, mmsi: &Mmsi, tx: SnapshotSender) -> Result<()> {
        let channel = self
            .get(mmsi)
            .ok_or_else(|| StateError::UntrackedVessel(mmsi.clone()))?;
        channel.attach(tx);
        Ok(())
    }

    /// Tracked identifiers, sorted
    pub fn vessels(&self) -> Vec<Mmsi> {
        let mut vessels: Vec<Mmsi> = self.channels.keys().cloned().collect();
        vessels.sort();
        vessels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
