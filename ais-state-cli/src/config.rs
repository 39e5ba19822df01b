//! Configuration loading and parsing

use ais_state::{Mmsi, TrackerConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Vessels to track, as numbers or strings
    #[serde(default)]
    pub mmsis: Vec<Mmsi>,
    #[serde(default = "default_true")]
    pub publish_empty_updates: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            mmsis: Vec::new(),
            publish_empty_updates: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Newline-delimited JSON files of decoded messages (stdin when empty)
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Stamp messages that carry no `received_at` with the time they were read
    #[serde(default = "default_true")]
    pub stamp_received: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            stamp_received: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Txt,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Library configuration for the message router
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::new()
            .with_vessels(self.tracking.mmsis.iter().cloned())
            .with_empty_publication(self.tracking.publish_empty_updates)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [tracking]
            mmsis = [244123456, "211000001"]
            publish_empty_updates = false

            [input]
            files = ["harbour.jsonl"]

            [output]
            format = "txt"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.tracking.mmsis, vec![Mmsi::from("244123456"), Mmsi::from("211000001")]);
        assert!(!config.tracking.publish_empty_updates);
        assert_eq!(config.input.files.len(), 1);
        assert!(config.input.stamp_received);
        assert_eq!(config.output.format, OutputFormat::Txt);

        let tracker = config.tracker_config();
        assert_eq!(tracker.vessels.len(), 2);
        assert!(!tracker.publish_empty_updates);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.tracking.mmsis.is_empty());
        assert!(config.tracking.publish_empty_updates);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tracking]\nmmsis = [\"123456789\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.tracking.mmsis, vec![Mmsi::from(123456789u32)]);
        assert!(load_config(Path::new("does-not-exist.toml")).is_err());
    }
}
