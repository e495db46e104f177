//! Tracker message model.
//!
//! A [`TrackerMessage`] is the decoded form of one binary SBD message sent by
//! (mobile originated) or to (mobile terminated) the tracker. The wire format
//! lives in [`codec`], the field catalogue in [`fields`].

pub mod checksum;
pub mod codec;
pub mod fields;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Result;

pub use checksum::checksum;
pub use codec::{decode, encode, GATEWAY_HEADER_LEN};
pub use fields::{FieldLayout, ScalarType, TrackerField};

/// Value of a single message field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A field without payload (user function triggers).
    Present,
    /// An unscaled unsigned integer.
    Unsigned(u64),
    /// An unscaled signed integer.
    Signed(i64),
    /// A scaled fixed-point value or a float field.
    Float(f64),
    /// Fixed-length array of values.
    Array(Vec<FieldValue>),
    /// Opaque bytes.
    Bytes(#[serde(serialize_with = "hex::serde::serialize")] Vec<u8>),
    /// A calendar date and time (UTC).
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Numeric view of the value, if it is a number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(v) => Some(*v as f64),
            Self::Signed(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Date/time view of the value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("set"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Bytes(bytes) => f.write_str(&to_hex(bytes)),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// A decoded tracker message: field values keyed by field, in ID order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerMessage {
    fields: BTreeMap<TrackerField, FieldValue>,
}

impl TrackerMessage {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: TrackerField, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field, returning the previous value if there was one.
    pub fn insert(&mut self, field: TrackerField, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(field, value.into())
    }

    /// Get the value of a field.
    #[must_use]
    pub fn get(&self, field: TrackerField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Remove a field from the message.
    pub fn remove(&mut self, field: TrackerField) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    /// Whether the message carries the given field.
    #[must_use]
    pub fn contains(&self, field: TrackerField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Number of fields in the message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the message has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the fields in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackerField, &FieldValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    fn number(&self, field: TrackerField) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    /// Latitude and longitude in degrees, if both are present.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.number(TrackerField::Lat)?, self.number(TrackerField::Lon)?))
    }

    /// Altitude in metres.
    #[must_use]
    pub fn altitude(&self) -> Option<f64> {
        self.number(TrackerField::Alt)
    }

    /// Atmospheric pressure in mbar.
    #[must_use]
    pub fn pressure(&self) -> Option<f64> {
        self.number(TrackerField::Press)
    }

    /// GNSS timestamp (UTC).
    #[must_use]
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.get(TrackerField::DateTime)
            .and_then(FieldValue::as_datetime)
    }
}

impl FromIterator<(TrackerField, FieldValue)> for TrackerMessage {
    fn from_iter<I: IntoIterator<Item = (TrackerField, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for TrackerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}

impl fmt::Display for TrackerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, value) in self.iter() {
            writeln!(f, "  {:<10} {value}", field.name())?;
        }
        Ok(())
    }
}

/// ASCII (hex) representation of a binary message, as used by the
/// `RockBLOCK` portal and web API.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse the ASCII (hex) representation of a binary message.
///
/// Whitespace between digits is ignored.
///
/// # Errors
///
/// Returns an error if the text is not an even number of hex digits.
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, 7)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut msg = TrackerMessage::new();
        assert!(msg.is_empty());
        assert!(msg.insert(TrackerField::Sats, 9u64).is_none());
        assert_eq!(msg.get(TrackerField::Sats), Some(&FieldValue::Unsigned(9)));
        assert_eq!(msg.len(), 1);

        let previous = msg.insert(TrackerField::Sats, 10u64);
        assert_eq!(previous, Some(FieldValue::Unsigned(9)));
    }

    #[test]
    fn test_iter_in_id_order() {
        let msg = TrackerMessage::new()
            .with(TrackerField::Alt, 1.0)
            .with(TrackerField::BattV, 5.0)
            .with(TrackerField::Lat, 2.0);
        let order: Vec<_> = msg.iter().map(|(field, _)| field).collect();
        assert_eq!(
            order,
            vec![TrackerField::BattV, TrackerField::Lat, TrackerField::Alt]
        );
    }

    #[test]
    fn test_position_requires_lat_and_lon() {
        let msg = TrackerMessage::new().with(TrackerField::Lat, 47.5);
        assert!(msg.position().is_none());

        let msg = msg.with(TrackerField::Lon, -8.25);
        assert_eq!(msg.position(), Some((47.5, -8.25)));
    }

    #[test]
    fn test_pressure_from_unsigned() {
        let msg = TrackerMessage::new().with(TrackerField::Press, 1013u64);
        assert_eq!(msg.pressure(), Some(1013.0));
    }

    #[test]
    fn test_timestamp() {
        let msg = TrackerMessage::new().with(TrackerField::DateTime, sample_time());
        assert_eq!(msg.timestamp(), Some(sample_time()));
    }

    #[test]
    fn test_remove_and_contains() {
        let mut msg = TrackerMessage::new().with(TrackerField::Fix, 3u64);
        assert!(msg.contains(TrackerField::Fix));
        assert_eq!(msg.remove(TrackerField::Fix), Some(FieldValue::Unsigned(3)));
        assert!(!msg.contains(TrackerField::Fix));
    }

    #[test]
    fn test_serialize_json() {
        let mut msg = TrackerMessage::new()
            .with(TrackerField::Lat, 47.1234567)
            .with(TrackerField::DateTime, sample_time());
        msg.insert(TrackerField::UserFunc1, FieldValue::Present);
        msg.insert(TrackerField::RbHead, FieldValue::Bytes(vec![0x52, 0x42, 0x00, 0x01]));
        msg.insert(
            TrackerField::GeofStat,
            FieldValue::Array(vec![
                FieldValue::Unsigned(0),
                FieldValue::Unsigned(1),
                FieldValue::Unsigned(2),
            ]),
        );

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["LAT"], serde_json::json!(47.1234567));
        assert_eq!(json["DATETIME"], serde_json::json!("2021-05-07T12:30:45"));
        assert!(json["USERFUNC1"].is_null());
        assert_eq!(json["RBHEAD"], serde_json::json!("52420001"));
        assert_eq!(json["GEOFSTAT"], serde_json::json!([0, 1, 2]));
    }

    #[test]
    fn test_display_lists_fields() {
        let msg = TrackerMessage::new()
            .with(TrackerField::Sats, 9u64)
            .with(TrackerField::DateTime, sample_time());
        let text = msg.to_string();
        assert!(text.contains("DATETIME   2021-05-07 12:30:45"));
        assert!(text.contains("SATS       9"));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Present.to_string(), "set");
        assert_eq!(FieldValue::Signed(-3).to_string(), "-3");
        assert_eq!(FieldValue::Bytes(vec![0xab, 0x01]).to_string(), "ab01");
        assert_eq!(
            FieldValue::Array(vec![FieldValue::Unsigned(1), FieldValue::Unsigned(2)]).to_string(),
            "[1, 2]"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x02, 0x03, 0x05, 0x07];
        assert_eq!(to_hex(&bytes), "02030507");
        assert_eq!(from_hex("02030507").unwrap(), bytes);
    }

    #[test]
    fn test_from_hex_ignores_whitespace_and_case() {
        assert_eq!(from_hex("02 03\n0A 0b").unwrap(), vec![0x02, 0x03, 0x0a, 0x0b]);
    }

    #[test]
    fn test_from_hex_rejects_odd_length() {
        assert!(from_hex("020").is_err());
        assert!(from_hex("xy").is_err());
    }
}
