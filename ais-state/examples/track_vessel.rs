//! Track a single vessel and print every snapshot it publishes
//!
//! Usage: cargo run --example track_vessel -- <messages.jsonl> <mmsi>

use ais_state::{DecodedMessage, MessageRouter, Mmsi, TrackerConfig};
use std::env;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <messages.jsonl> <mmsi>", args[0]);
        std::process::exit(1);
    }

    let mmsi = Mmsi::new(&args[2]);
    let router = MessageRouter::new(&TrackerConfig::new().add_vessel(mmsi.clone()));
    let updates = router.subscribe(&mmsi)?;

    let content = fs::read_to_string(&args[1])?;
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match DecodedMessage::from_json(line) {
            Ok(message) => {
                router.process(&message);
            }
            Err(e) => eprintln!("Skipping line: {}", e),
        }

        for snapshot in updates.try_iter() {
            println!("{}", serde_json::to_string(&snapshot)?);
        }
    }

    match router.state(&mmsi) {
        Some(state) if state.has_position() => println!(
            "\nLast position of {}: {:.5}, {:.5}",
            mmsi,
            state.latitude.unwrap_or_default(),
            state.longitude.unwrap_or_default()
        ),
        _ => println!("\nNo position received for {}", mmsi),
    }

    Ok(())
}
