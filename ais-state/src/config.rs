//! Tracker configuration types
//!
//! The set of tracked vessels is fixed here, once, at startup. Loading it from
//! a file is the host application's business.

use crate::types::Mmsi;
use serde::{Deserialize, Serialize};

/// Configuration for the message router
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Vessels to track; messages for anything else are dropped
    #[serde(default)]
    pub vessels: Vec<Mmsi>,

    /// Publish a snapshot even when a message changed no field (heartbeat)
    #[serde(default = "default_true")]
    pub publish_empty_updates: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vessels: Vec::new(),
            publish_empty_updates: true,
        }
    }
}

impl TrackerConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace the tracked vessel list
    pub fn with_vessels<I, M>(mut self, vessels: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Mmsi>,
    {
        self.vessels = vessels.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: track one more vessel
    pub fn add_vessel(mut self, mmsi: impl Into<Mmsi>) -> Self {
        self.vessels.push(mmsi.into());
        self
    }

    /// Builder method: enable or disable heartbeat publication
    pub fn with_empty_publication(mut self, enabled: bool) -> Self {
        self.publish_empty_updates = enabled;
        self
    }

    /// Check if a vessel is in the configured list
    pub fn is_tracked(&self, mmsi: &Mmsi) -> bool {
        self.vessels.contains(mmsi)
    }
}
