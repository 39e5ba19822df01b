//! Replay of newline-delimited JSON decoded messages

use ais_state::{DecodedMessage, MessageRouter, RouterStats};
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Counters for one or more replayed streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    pub malformed: usize,
    pub router: RouterStats,
}

impl ReplayStats {
    pub fn merge(mut self, other: ReplayStats) -> Self {
        self.lines += other.lines;
        self.malformed += other.malformed;
        self.router.merge(&other.router);
        self
    }
}

/// Feed every message of a stream through the router, in order
///
/// Blank lines are skipped; lines that are not valid decoded messages are
/// logged and counted.
pub fn replay<R: BufRead>(
    reader: R,
    source: &str,
    router: &MessageRouter,
    stamp_received: bool,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", source))?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let mut message = match DecodedMessage::from_json(&line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("{}:{}: {}", source, index + 1, e);
                stats.malformed += 1;
                continue;
            }
        };
        if stamp_received && message.received_at.is_none() {
            message.received_at = Some(Utc::now());
        }

        stats.router.record(&router.process(&message));
    }

    log::debug!("{}: {} line(s), {} malformed", source, stats.lines, stats.malformed);
    Ok(stats)
}

/// Replay one file
pub fn replay_file(path: &Path, router: &MessageRouter, stamp_received: bool) -> Result<ReplayStats> {
    log::info!("Replaying {:?}", path);
    let file = File::open(path).with_context(|| format!("Failed to open input file: {:?}", path))?;
    replay(BufReader::new(file), &path.display().to_string(), router, stamp_received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_state::{Mmsi, TrackerConfig};
    use std::io::Cursor;

    #[test]
    fn test_replay_counts_lines() {
        let router = MessageRouter::new(&TrackerConfig::new().add_vessel("123456789"));
        let input = concat!(
            r#"{"msg_type": 1, "mmsi": 123456789, "lat": 51.0, "lon": 4.0}"#,
            "\n\n",
            "garbage\n",
            r#"{"msg_type": 5, "mmsi": 123456789, "shipname": "ALBATROS"}"#,
            "\n",
            r#"{"msg_type": 1, "mmsi": 555, "lat": 1.0}"#,
            "\n",
        );

        let stats = replay(Cursor::new(input), "test", &router, false).unwrap();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.router.applied, 2);
        assert_eq!(stats.router.untracked, 1);

        let state = router.state(&Mmsi::from("123456789")).unwrap();
        assert_eq!(state.latitude, Some(51.0));
        assert_eq!(state.shipname.as_deref(), Some("ALBATROS"));
        assert!(state.last_seen.is_none());
    }

    #[test]
    fn test_replay_stamps_messages() {
        let router = MessageRouter::new(&TrackerConfig::new().add_vessel("1"));
        let input = r#"{"msg_type": 1, "mmsi": "1", "speed": 10}"#;

        replay(Cursor::new(input), "test", &router, true).unwrap();
        assert!(router.state(&Mmsi::from("1")).unwrap().last_seen.is_some());
    }
}
