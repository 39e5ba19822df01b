//! Snapshot output
//!
//! Formats published snapshots as JSON lines or fixed-width text rows.

use crate::config::OutputFormat;
use crate::input::ReplayStats;
use ais_state::VesselSnapshot;
use anyhow::Result;
use std::fmt::Display;
use std::io::Write;
use std::thread::JoinHandle;

fn column<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render one snapshot in the requested format (no trailing newline)
pub fn format_snapshot(snapshot: &VesselSnapshot, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(snapshot)?),
        OutputFormat::Txt => {
            let s = &snapshot.state;
            Ok(format!(
                "{:<10} {:>10} {:>11} {:>6} {:>4} {:>5} {:>7} {:<28} {:<20} {:<20} {}",
                snapshot.mmsi,
                column(s.latitude.map(|v| format!("{:.5}", v))),
                column(s.longitude.map(|v| format!("{:.5}", v))),
                column(s.course),
                column(s.heading),
                column(s.speed),
                column(s.turn.map(|v| format!("{:.2}", v))),
                column(s.status),
                column(s.maneuver),
                column(s.shipname.as_deref()),
                column(s.callsign.as_deref()),
            ))
        }
    }
}

/// Consume snapshots until every sender is gone; returns how many were written
pub fn spawn_printer<W>(
    rx: flume::Receiver<VesselSnapshot>,
    format: OutputFormat,
    mut out: W,
) -> JoinHandle<Result<usize>>
where
    W: Write + Send + 'static,
{
    std::thread::spawn(move || -> Result<usize> {
        let mut written = 0;
        for snapshot in rx.iter() {
            writeln!(out, "{}", format_snapshot(&snapshot, format)?)?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    })
}

/// One-line replay summary
pub fn summary(stats: &ReplayStats) -> String {
    format!(
        "{} message(s) read: {} applied, {} untracked, {} malformed, {} published, {} field error(s)",
        stats.lines,
        stats.router.applied,
        stats.router.untracked,
        stats.malformed,
        stats.router.published,
        stats.router.field_errors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_state::{FieldUpdate, Mmsi, NavigationStatus, VesselState};

    fn snapshot() -> VesselSnapshot {
        let mut state = VesselState::default();
        state.apply(FieldUpdate::Latitude(51.0));
        state.apply(FieldUpdate::Speed(12.5));
        state.apply(FieldUpdate::Status(NavigationStatus::Moored));
        state.snapshot(&Mmsi::from("123456789"))
    }

    #[test]
    fn test_json_format() {
        let line = format_snapshot(&snapshot(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["mmsi"], "123456789");
        assert_eq!(value["speed"], 12.5);
        assert_eq!(value["status"], "MOORED");
    }

    #[test]
    fn test_txt_format() {
        let line = format_snapshot(&snapshot(), OutputFormat::Txt).unwrap();
        assert!(line.starts_with("123456789"));
        assert!(line.contains("51.00000"));
        assert!(line.contains("MOORED"));
    }

    #[test]
    fn test_printer_stops_when_senders_drop() {
        let (tx, rx) = flume::unbounded();
        let printer = spawn_printer(rx, OutputFormat::Json, std::io::sink());
        tx.send(snapshot()).unwrap();
        tx.send(snapshot()).unwrap();
        drop(tx);
        assert_eq!(printer.join().unwrap().unwrap(), 2);
    }
}
