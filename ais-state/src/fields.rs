//! Field Normalizer
//!
//! Pure, stateless mapping from a raw decoder value to the value that is stored
//! and published. Each function returns:
//! - `Ok(Some(update))` - store the normalized value
//! - `Ok(None)` - absent (sentinel or empty), leave the stored value untouched
//! - `Err(NormalizeError)` - the single field is rejected, the rest of the batch proceeds
//!
//! The navigation status and maneuver indicator tables are owned here rather
//! than borrowed from a decoder library, so a decoder upgrade cannot silently
//! change the published labels.

use crate::types::{RawValue, Timestamp};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

/// Revision of the enum lookup tables below. Bump when a label or code changes.
pub const TABLE_REVISION: u32 = 1;

/// Raw course value meaning "not available"
pub const COURSE_NOT_AVAILABLE: f64 = 360.0;

/// Raw heading value meaning "not available"
pub const HEADING_NOT_AVAILABLE: i64 = 511;

/// Raw rate-of-turn value meaning "no turn information"
pub const TURN_NOT_AVAILABLE: f64 = -128.0;

/// Rate-of-turn sensor scale
pub const TURN_SCALE: f64 = 4.733;

/// Result of normalizing one raw field
pub type Normalized = std::result::Result<Option<FieldUpdate>, NormalizeError>;

/// Field-local normalization failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Field '{field}' expected {expected}, got {found}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Field '{field}' has unrecognized code {code}")]
    UnknownCode { field: &'static str, code: i64 },

    #[error("Field '{field}' value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

/// AIS navigation status (4-bit code)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationStatus {
    UnderWayUsingEngine = 0,
    AtAnchor = 1,
    NotUnderCommand = 2,
    RestrictedManoeuverability = 3,
    ConstrainedByHerDraught = 4,
    Moored = 5,
    Aground = 6,
    EngagedInFishing = 7,
    UnderWaySailing = 8,
    ReservedForHsc = 9,
    ReservedForWig = 10,
    PowerDrivenTowingAstern = 11,
    PowerDrivenPushingAhead = 12,
    Reserved = 13,
    AisSartActive = 14,
    Undefined = 15,
}

impl NavigationStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        use NavigationStatus::*;
        Some(match code {
            0 => UnderWayUsingEngine,
            1 => AtAnchor,
            2 => NotUnderCommand,
            3 => RestrictedManoeuverability,
            4 => ConstrainedByHerDraught,
            5 => Moored,
            6 => Aground,
            7 => EngagedInFishing,
            8 => UnderWaySailing,
            9 => ReservedForHsc,
            10 => ReservedForWig,
            11 => PowerDrivenTowingAstern,
            12 => PowerDrivenPushingAhead,
            13 => Reserved,
            14 => AisSartActive,
            15 => Undefined,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        self.into()
    }
}

/// AIS special maneuver indicator (2-bit code)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManeuverIndicator {
    NotAvailable = 0,
    NoSpecialManeuver = 1,
    SpecialManeuver = 2,
    Undefined = 3,
}

impl ManeuverIndicator {
    pub fn from_code(code: i64) -> Option<Self> {
        use ManeuverIndicator::*;
        Some(match code {
            0 => NotAvailable,
            1 => NoSpecialManeuver,
            2 => SpecialManeuver,
            3 => Undefined,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        self.into()
    }
}

/// Keys of the kinematic readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKey {
    Course,
    Heading,
    Speed,
    Status,
    Turn,
    Maneuver,
}

impl FieldKey {
    /// Field name as used by the decoder and in snapshots
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A single normalized update to a vessel's state
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Latitude(f64),
    Longitude(f64),
    Course(f64),
    Heading(u16),
    Speed(f64),
    Status(NavigationStatus),
    Turn(f64),
    Maneuver(ManeuverIndicator),
    ShipName(String),
    CallSign(String),
    /// Reading present but undecodable; published as null
    Cleared(FieldKey),
    /// Receive time of the message carrying the batch
    LastSeen(Timestamp),
}

/// Display metadata class of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Speed,
    Enum,
}

/// Static description of one kinematic field
pub struct FieldDescriptor {
    pub key: FieldKey,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    /// Labels the field may take, for enum readings
    pub options: Option<fn() -> Vec<&'static str>>,
    pub normalize: fn(&RawValue) -> Normalized,
}

impl FieldDescriptor {
    pub fn normalize(&self, raw: &RawValue) -> Normalized {
        (self.normalize)(raw)
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("unit", &self.unit)
            .field("icon", &self.icon)
            .field("device_class", &self.device_class)
            .finish()
    }
}

/// The authoritative kinematic field table, in publication order
pub static KINEMATIC_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor {
        key: FieldKey::Course,
        name: "course",
        unit: Some("°"),
        icon: Some("mdi:compass"),
        device_class: None,
        options: None,
        normalize: normalize_course,
    },
    FieldDescriptor {
        key: FieldKey::Heading,
        name: "heading",
        unit: Some("°"),
        icon: Some("mdi:angle-acute"),
        device_class: None,
        options: None,
        normalize: normalize_heading,
    },
    FieldDescriptor {
        key: FieldKey::Maneuver,
        name: "maneuver",
        unit: None,
        icon: None,
        device_class: Some(DeviceClass::Enum),
        options: Some(maneuver_options),
        normalize: normalize_maneuver,
    },
    FieldDescriptor {
        key: FieldKey::Speed,
        name: "speed",
        unit: Some("kn"),
        icon: None,
        device_class: Some(DeviceClass::Speed),
        options: None,
        normalize: normalize_speed,
    },
    FieldDescriptor {
        key: FieldKey::Status,
        name: "status",
        unit: None,
        icon: Some("mdi:check-decagram"),
        device_class: Some(DeviceClass::Enum),
        options: Some(navigation_status_options),
        normalize: normalize_status,
    },
    FieldDescriptor {
        key: FieldKey::Turn,
        name: "turn",
        unit: Some("°/min"),
        icon: None,
        device_class: None,
        options: None,
        normalize: normalize_turn,
    },
];

/// Look up the descriptor of a kinematic field
pub fn descriptor(key: FieldKey) -> &'static FieldDescriptor {
    let [course, heading, maneuver, speed, status, turn] = &KINEMATIC_FIELDS;
    match key {
        FieldKey::Course => course,
        FieldKey::Heading => heading,
        FieldKey::Maneuver => maneuver,
        FieldKey::Speed => speed,
        FieldKey::Status => status,
        FieldKey::Turn => turn,
    }
}

fn navigation_status_options() -> Vec<&'static str> {
    NavigationStatus::iter().map(NavigationStatus::label).collect()
}

fn maneuver_options() -> Vec<&'static str> {
    ManeuverIndicator::iter().map(ManeuverIndicator::label).collect()
}

fn number(field: &'static str, raw: &RawValue) -> Result<f64, NormalizeError> {
    raw.as_f64().ok_or_else(|| NormalizeError::InvalidType {
        field,
        expected: "number",
        found: raw.kind().to_string(),
    })
}

fn integer(field: &'static str, raw: &RawValue) -> Result<i64, NormalizeError> {
    raw.as_i64().ok_or_else(|| NormalizeError::InvalidType {
        field,
        expected: "integer",
        found: raw.kind().to_string(),
    })
}

/// Strip the six-bit `@` padding and surrounding whitespace
fn text(field: &'static str, raw: &RawValue) -> Result<Option<String>, NormalizeError> {
    let value = raw.as_str().ok_or_else(|| NormalizeError::InvalidType {
        field,
        expected: "text",
        found: raw.kind().to_string(),
    })?;
    let cleaned = value.trim_end_matches(|c: char| c == '@' || c.is_whitespace()).trim();
    Ok((!cleaned.is_empty()).then(|| cleaned.to_string()))
}

pub fn normalize_latitude(raw: &RawValue) -> Normalized {
    Ok(Some(FieldUpdate::Latitude(number("lat", raw)?)))
}

pub fn normalize_longitude(raw: &RawValue) -> Normalized {
    Ok(Some(FieldUpdate::Longitude(number("lon", raw)?)))
}

pub fn normalize_course(raw: &RawValue) -> Normalized {
    let course = number("course", raw)?;
    if course == COURSE_NOT_AVAILABLE {
        return Ok(None);
    }
    Ok(Some(FieldUpdate::Course(course)))
}

pub fn normalize_heading(raw: &RawValue) -> Normalized {
    let heading = integer("heading", raw)?;
    if heading == HEADING_NOT_AVAILABLE {
        return Ok(None);
    }
    let heading = u16::try_from(heading).map_err(|_| NormalizeError::OutOfRange {
        field: "heading",
        value: heading,
    })?;
    Ok(Some(FieldUpdate::Heading(heading)))
}

/// Tenths of a knot to knots
pub fn normalize_speed(raw: &RawValue) -> Normalized {
    Ok(Some(FieldUpdate::Speed(number("speed", raw)? / 10.0)))
}

pub fn normalize_status(raw: &RawValue) -> Normalized {
    let code = integer("status", raw)?;
    NavigationStatus::from_code(code)
        .map(|status| Some(FieldUpdate::Status(status)))
        .ok_or(NormalizeError::UnknownCode { field: "status", code })
}

/// `(raw / 4.733)^2`
///
/// Squaring drops the sign of the raw rate of turn, so port and starboard
/// turns publish the same value. Reproduced as deployed; see DESIGN.md.
pub fn normalize_turn(raw: &RawValue) -> Normalized {
    let turn = number("turn", raw)?;
    if turn == TURN_NOT_AVAILABLE {
        return Ok(None);
    }
    Ok(Some(FieldUpdate::Turn((turn / TURN_SCALE).powi(2))))
}

pub fn normalize_maneuver(raw: &RawValue) -> Normalized {
    let code = integer("maneuver", raw)?;
    ManeuverIndicator::from_code(code)
        .map(|maneuver| Some(FieldUpdate::Maneuver(maneuver)))
        .ok_or(NormalizeError::UnknownCode { field: "maneuver", code })
}

pub fn normalize_shipname(raw: &RawValue) -> Normalized {
    Ok(text("shipname", raw)?.map(FieldUpdate::ShipName))
}

pub fn normalize_callsign(raw: &RawValue) -> Normalized {
    Ok(text("callsign", raw)?.map(FieldUpdate::CallSign))
}
