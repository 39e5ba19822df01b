//! Core types for the AIS state library
//!
//! This module defines the inbound message model handed over by an external AIS
//! decoder, the vessel identifier used as the key everywhere, and the crate-wide
//! error type. Decoded messages are sparse: a field that is not present means
//! "no update", never "reset".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur outside of single-field normalization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Vessel {0} is not tracked")]
    UntrackedVessel(Mmsi),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Maritime Mobile Service Identity - the vessel key
///
/// Kept as an opaque string so `123456789` and `"123456789"` resolve to the
/// same vessel regardless of how the decoder or the configuration typed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Mmsi(String);

impl Mmsi {
    /// Create an identifier, trimming surrounding whitespace
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an identifier from a JSON number or string
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(Self::from),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self::new(s)),
            _ => None,
        }
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mmsi {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Mmsi {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<u32> for Mmsi {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for Mmsi {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for Mmsi {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Mmsi::from(n),
            Repr::Text(s) => Mmsi::new(s),
        })
    }
}

/// Raw field value as typed by the external decoder
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Signed integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Text value (ship name, call sign, ...)
    Text(String),
    /// Boolean flag
    Boolean(bool),
    /// Field present but explicitly empty
    Null,
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(v) => write!(f, "{}", v),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Text(v) => write!(f, "{:?}", v),
            RawValue::Boolean(v) => write!(f, "{}", v),
            RawValue::Null => write!(f, "null"),
        }
    }
}

impl RawValue {
    /// Numeric view of the value (integers widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integral view of the value
    ///
    /// Floats are accepted only when they carry no fractional part, so a
    /// decoder emitting `5.0` for a code still resolves to code 5.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(v) => Some(*v),
            RawValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short description of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "text",
            RawValue::Boolean(_) => "boolean",
            RawValue::Null => "null",
        }
    }

    /// Convert a scalar JSON value; arrays and objects have no raw representation
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(RawValue::Null),
            serde_json::Value::Bool(b) => Some(RawValue::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RawValue::Integer(i)),
                None => n.as_f64().map(RawValue::Float),
            },
            serde_json::Value::String(s) => Some(RawValue::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Integer(v as i64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Boolean(v)
    }
}

/// Message classes relevant to the projection, keyed by `msg_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    /// Types 1, 2, 3 - position, kinematics, navigation status
    PositionReport,
    /// Type 5 - ship name and call sign
    StaticVoyage,
    /// Every other type - nothing in it is projected
    Other,
}

impl MessageClass {
    pub fn from_msg_type(msg_type: u8) -> Self {
        match msg_type {
            1..=3 => MessageClass::PositionReport,
            5 => MessageClass::StaticVoyage,
            _ => MessageClass::Other,
        }
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageClass::PositionReport => write!(f, "position report"),
            MessageClass::StaticVoyage => write!(f, "static/voyage data"),
            MessageClass::Other => write!(f, "other"),
        }
    }
}

/// An already-decoded AIS message
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// AIS message type discriminator
    pub msg_type: u8,
    /// Vessel the message reports on
    pub mmsi: Mmsi,
    /// Sparse field map, keyed by decoder field name (`lat`, `speed`, ...)
    pub fields: BTreeMap<String, RawValue>,
    /// Receive time stamped by the host, if any
    pub received_at: Option<Timestamp>,
}

impl DecodedMessage {
    /// Create a message without any fields
    pub fn new(msg_type: u8, mmsi: impl Into<Mmsi>) -> Self {
        Self {
            msg_type,
            mmsi: mmsi.into(),
            fields: BTreeMap::new(),
            received_at: None,
        }
    }

    /// Builder method: add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder method: set the receive timestamp
    pub fn with_received_at(mut self, received_at: Timestamp) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn class(&self) -> MessageClass {
        MessageClass::from_msg_type(self.msg_type)
    }

    /// Look up a field; explicit JSON `null`s count as missing
    pub fn field(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key).filter(|v| **v != RawValue::Null)
    }

    /// Parse a flat JSON object such as `{"msg_type": 1, "mmsi": 244123456, "lat": 51.0}`
    ///
    /// `msg_type` and `mmsi` are required. An optional `received_at` holds an
    /// RFC 3339 timestamp. Every other scalar key becomes a field; nested arrays
    /// and objects are skipped.
    pub fn from_json(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let object = value
            .as_object()
            .ok_or_else(|| StateError::InvalidMessage("expected a JSON object".to_string()))?;

        let msg_type = object
            .get("msg_type")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| StateError::InvalidMessage("missing or invalid msg_type".to_string()))?;
        let msg_type = u8::try_from(msg_type)
            .map_err(|_| StateError::InvalidMessage(format!("msg_type {} out of range", msg_type)))?;

        let mmsi = object
            .get("mmsi")
            .and_then(Mmsi::from_json)
            .ok_or_else(|| StateError::InvalidMessage("missing or invalid mmsi".to_string()))?;

        let received_at = match object.get("received_at").and_then(|v| v.as_str()) {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(ts)
                    .map_err(|e| StateError::InvalidMessage(format!("received_at: {}", e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let mut message = DecodedMessage::new(msg_type, mmsi);
        message.received_at = received_at;

        for (key, value) in object {
            if matches!(key.as_str(), "msg_type" | "mmsi" | "received_at") {
                continue;
            }
            match RawValue::from_json(value) {
                Some(raw) => {
                    message.fields.insert(key.clone(), raw);
                }
                None => log::trace!("Skipping non-scalar field '{}'", key),
            }
        }

        Ok(message)
    }
}
