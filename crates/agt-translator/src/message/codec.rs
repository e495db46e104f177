//! Binary wire format of tracker messages.
//!
//! A message is framed as
//!
//! ```text
//! [gateway header (5 bytes, optional)] STX { ID payload }* ETX CS_A CS_B
//! ```
//!
//! The gateway header is prepended by `RockBLOCK` when a message is relayed
//! from one device to another. The Fletcher checksum covers every byte from
//! the start of the buffer up to and including ETX.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use tracing::trace;

use super::checksum::checksum;
use super::fields::{FieldLayout, ScalarType, TrackerField};
use super::{FieldValue, TrackerMessage};
use crate::error::{Error, Result};

/// Length of the `RockBLOCK` gateway header that may precede STX.
pub const GATEWAY_HEADER_LEN: usize = 5;

const STX: u8 = TrackerField::Stx as u8;
const ETX: u8 = TrackerField::Etx as u8;

/// Decode a binary message.
///
/// # Errors
///
/// Returns an error if STX cannot be found, a field ID is unknown, the
/// buffer ends early, a date is impossible or the checksum does not match.
pub fn decode(message: &[u8]) -> Result<TrackerMessage> {
    let mut pos = if message.first() == Some(&STX) {
        0
    } else {
        GATEWAY_HEADER_LEN
    };
    if message.get(pos) != Some(&STX) {
        return Err(Error::MissingStx);
    }
    pos += 1;

    let mut decoded = TrackerMessage::new();
    loop {
        let id = *message
            .get(pos)
            .ok_or_else(|| Error::truncated("field ID", pos))?;
        if id == ETX {
            break;
        }
        let field = TrackerField::from_id(id).ok_or(Error::UnknownField { id, offset: pos })?;
        pos += 1;

        let len = field.layout().encoded_len();
        let payload = message
            .get(pos..pos + len)
            .ok_or_else(|| Error::truncated(field.name(), pos))?;
        let value = decode_value(field, payload)?;
        trace!(field = field.name(), %value, "decoded field");
        decoded.insert(field, value);
        pos += len;
    }
    pos += 1;

    let expected = checksum(&message[..pos]);
    let found = match message.get(pos..pos + 2) {
        Some(&[a, b]) => (a, b),
        _ => return Err(Error::truncated("checksum", pos)),
    };
    if expected != found {
        return Err(Error::ChecksumMismatch { expected, found });
    }
    Ok(decoded)
}

/// Encode a message into its binary wire form.
///
/// Fields are written in ascending ID order. STX/ETX entries in the message
/// are ignored since the framing is always added.
///
/// # Errors
///
/// Returns an error if a value does not fit the wire type of its field.
pub fn encode(message: &TrackerMessage) -> Result<Vec<u8>> {
    let mut out = vec![STX];
    for (field, value) in message.iter() {
        if field.is_marker() {
            continue;
        }
        out.push(field.id());
        encode_value(field, value, &mut out)?;
    }
    out.push(ETX);
    let (a, b) = checksum(&out);
    out.extend([a, b]);
    Ok(out)
}

fn decode_value(field: TrackerField, payload: &[u8]) -> Result<FieldValue> {
    let value = match field.layout() {
        FieldLayout::Empty => FieldValue::Present,
        FieldLayout::Scalar(ty) => apply_scale(read_scalar(ty, payload), field.scale()),
        FieldLayout::Array(ty, _) => FieldValue::Array(
            payload
                .chunks_exact(ty.size())
                .map(|chunk| apply_scale(read_scalar(ty, chunk), field.scale()))
                .collect(),
        ),
        FieldLayout::Bytes(_) => FieldValue::Bytes(payload.to_vec()),
        FieldLayout::DateTime => FieldValue::DateTime(read_datetime(payload)?),
    };
    Ok(value)
}

fn le_bytes<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

fn read_scalar(ty: ScalarType, bytes: &[u8]) -> FieldValue {
    match ty {
        ScalarType::U8 => FieldValue::Unsigned(u64::from(bytes[0])),
        ScalarType::I16 => FieldValue::Signed(i64::from(i16::from_le_bytes(le_bytes(bytes)))),
        ScalarType::U16 => FieldValue::Unsigned(u64::from(u16::from_le_bytes(le_bytes(bytes)))),
        ScalarType::I32 => FieldValue::Signed(i64::from(i32::from_le_bytes(le_bytes(bytes)))),
        ScalarType::U32 => FieldValue::Unsigned(u64::from(u32::from_le_bytes(le_bytes(bytes)))),
        ScalarType::F32 => FieldValue::Float(f64::from(f32::from_le_bytes(le_bytes(bytes)))),
    }
}

fn apply_scale(raw: FieldValue, scale: Option<f64>) -> FieldValue {
    match (scale, raw.as_f64()) {
        (Some(scale), Some(number)) => FieldValue::Float(number / scale),
        _ => raw,
    }
}

fn read_datetime(bytes: &[u8]) -> Result<NaiveDateTime> {
    let year = u16::from_le_bytes(le_bytes(bytes));
    let [month, day, hour, minute, second] = le_bytes::<5>(&bytes[2..]);
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|date| date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .ok_or_else(|| {
            Error::InvalidDateTime(format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        })
}

fn encode_value(field: TrackerField, value: &FieldValue, out: &mut Vec<u8>) -> Result<()> {
    match field.layout() {
        FieldLayout::Empty => {}
        FieldLayout::Scalar(ty) => write_scalar(field, ty, value, out)?,
        FieldLayout::Array(ty, count) => {
            let FieldValue::Array(values) = value else {
                return Err(Error::field_value(field, "expected an array"));
            };
            if values.len() != count {
                return Err(Error::field_value(
                    field,
                    format!("expected {count} values, got {}", values.len()),
                ));
            }
            for element in values {
                write_scalar(field, ty, element, out)?;
            }
        }
        FieldLayout::Bytes(len) => match value {
            FieldValue::Bytes(bytes) if bytes.len() == len => out.extend_from_slice(bytes),
            FieldValue::Present => out.extend(std::iter::repeat(0u8).take(len)),
            _ => return Err(Error::field_value(field, format!("expected {len} bytes"))),
        },
        FieldLayout::DateTime => {
            let dt = value
                .as_datetime()
                .ok_or_else(|| Error::field_value(field, "expected a date and time"))?;
            let year = u16::try_from(dt.year())
                .map_err(|_| Error::field_value(field, format!("year {} out of range", dt.year())))?;
            out.extend(year.to_le_bytes());
            // Calendar components are always below 256.
            for part in [dt.month(), dt.day(), dt.hour(), dt.minute(), dt.second()] {
                out.push(u8::try_from(part).map_err(|_| Error::internal("calendar component overflow"))?);
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn write_scalar(field: TrackerField, ty: ScalarType, value: &FieldValue, out: &mut Vec<u8>) -> Result<()> {
    let number = match value {
        // A valued user function given as a bare flag is triggered with 1.
        FieldValue::Present if field.is_valued_user_function() => 1.0,
        other => other
            .as_f64()
            .ok_or_else(|| Error::field_value(field, format!("expected a number, got {other}")))?,
    };
    let raw = field.scale().map_or(number, |scale| number * scale);
    if !raw.is_finite() {
        return Err(Error::field_value(field, "value is not finite"));
    }
    let rounded = raw.round() as i64;
    let out_of_range = || Error::field_value(field, format!("{number} does not fit {ty:?}"));
    match ty {
        ScalarType::F32 => out.extend((raw as f32).to_le_bytes()),
        ScalarType::U8 => out.push(u8::try_from(rounded).map_err(|_| out_of_range())?),
        ScalarType::I16 => out.extend(i16::try_from(rounded).map_err(|_| out_of_range())?.to_le_bytes()),
        ScalarType::U16 => out.extend(u16::try_from(rounded).map_err(|_| out_of_range())?.to_le_bytes()),
        ScalarType::I32 => out.extend(i32::try_from(rounded).map_err(|_| out_of_range())?.to_le_bytes()),
        ScalarType::U32 => out.extend(u32::try_from(rounded).map_err(|_| out_of_range())?.to_le_bytes()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::from_hex;

    /// BATTV, PRESS, TEMP, DATETIME, LAT, LON, ALT and SATS as sent by a tracker.
    const MO_MESSAGE: &str =
        "020900020af5030b06ff14e50705070c1e2d150778161c16c000effa1740e201001a09036748";

    /// The same message relayed with a `RockBLOCK` gateway header.
    const RELAYED_MESSAGE: &str =
        "5242000102020900020af5030b06ff14e50705070c1e2d150778161c16c000effa1740e201001a0903fe2a";

    /// DATETIME, LAT, LON, ALT, USERFUNC1 and USERFUNC5=300.
    const MT_MESSAGE: &str = "0214e60708140a000015a05dc21c16c0c2da061734f10700585c2c0103b8e2";

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![STX];
        bytes.extend_from_slice(body);
        bytes.push(ETX);
        let (a, b) = checksum(&bytes);
        bytes.extend([a, b]);
        bytes
    }

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_decode_mo_message() {
        let msg = decode(&from_hex(MO_MESSAGE).unwrap()).unwrap();

        assert_eq!(msg.len(), 8);
        assert_eq!(msg.get(TrackerField::BattV), Some(&FieldValue::Float(5.12)));
        assert_eq!(msg.get(TrackerField::Press), Some(&FieldValue::Unsigned(1013)));
        assert_eq!(msg.get(TrackerField::Temp), Some(&FieldValue::Float(-2.5)));
        assert_eq!(msg.timestamp(), Some(datetime(2021, 5, 7, 12, 30, 45)));
        assert_eq!(msg.position(), Some((47.123_456_7, -8.5)));
        assert_eq!(msg.altitude(), Some(123.456));
        assert_eq!(msg.get(TrackerField::Sats), Some(&FieldValue::Unsigned(9)));
    }

    #[test]
    fn test_decode_with_gateway_header() {
        let direct = decode(&from_hex(MO_MESSAGE).unwrap()).unwrap();
        let relayed = decode(&from_hex(RELAYED_MESSAGE).unwrap()).unwrap();
        assert_eq!(direct, relayed);
    }

    #[test]
    fn test_gateway_header_is_part_of_checksum() {
        let mut bytes = from_hex(RELAYED_MESSAGE).unwrap();
        bytes[1] ^= 0xff;
        assert!(matches!(
            decode(&bytes),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut bytes = from_hex(MO_MESSAGE).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::ChecksumMismatch {
                expected: (0x67, 0x48),
                found: (0x67, 0x49)
            }
        ));
    }

    #[test]
    fn test_decode_missing_stx() {
        assert!(matches!(decode(&[]), Err(Error::MissingStx)));
        assert!(matches!(decode(&[0x00; 8]), Err(Error::MissingStx)));
    }

    #[test]
    fn test_decode_unknown_field() {
        let bytes = frame(&[0x07, 0x01]);
        assert!(matches!(
            decode(&bytes),
            Err(Error::UnknownField { id: 0x07, offset: 1 })
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let bytes = [STX, TrackerField::Lat.id(), 0x01, 0x02];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 2, .. }));
        assert!(err.to_string().contains("LAT"));
    }

    #[test]
    fn test_decode_missing_checksum() {
        let bytes = [STX, ETX, 0x05];
        assert!(matches!(decode(&bytes), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_decode_missing_etx() {
        let bytes = [STX, TrackerField::Sats.id(), 4];
        assert!(matches!(decode(&bytes), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_decode_empty_message() {
        let msg = decode(&[STX, ETX, 5, 7]).unwrap();
        assert!(msg.is_empty());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = from_hex(MO_MESSAGE).unwrap();
        bytes.extend([0xde, 0xad]);
        assert!(decode(&bytes).is_ok());
    }

    #[test]
    fn test_decode_invalid_datetime() {
        let bytes = frame(&[TrackerField::DateTime.id(), 0xe5, 0x07, 13, 1, 0, 0, 0]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidDateTime(_)));
        assert!(err.to_string().contains("2021-13-01"));
    }

    #[test]
    fn test_decode_arrays_and_bytes() {
        let mut body = vec![TrackerField::GeofStat.id(), 1, 2, 3];
        body.push(TrackerField::MoFields.id());
        body.extend(1u32.to_le_bytes());
        body.extend(0x8000_0000u32.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.extend([TrackerField::RbHead.id(), 0x52, 0x42, 0x12, 0x34]);
        body.push(TrackerField::UserFunc2.id());

        let msg = decode(&frame(&body)).unwrap();
        assert_eq!(
            msg.get(TrackerField::GeofStat),
            Some(&FieldValue::Array(vec![
                FieldValue::Unsigned(1),
                FieldValue::Unsigned(2),
                FieldValue::Unsigned(3)
            ]))
        );
        assert_eq!(
            msg.get(TrackerField::MoFields),
            Some(&FieldValue::Array(vec![
                FieldValue::Unsigned(1),
                FieldValue::Unsigned(0x8000_0000),
                FieldValue::Unsigned(0)
            ]))
        );
        assert_eq!(
            msg.get(TrackerField::RbHead),
            Some(&FieldValue::Bytes(vec![0x52, 0x42, 0x12, 0x34]))
        );
        assert_eq!(msg.get(TrackerField::UserFunc2), Some(&FieldValue::Present));
    }

    #[test]
    fn test_decode_float_user_value() {
        let mut body = vec![TrackerField::UserVal7.id()];
        body.extend(1.5f32.to_le_bytes());
        let msg = decode(&frame(&body)).unwrap();
        assert_eq!(msg.get(TrackerField::UserVal7), Some(&FieldValue::Float(1.5)));
    }

    #[test]
    fn test_decode_repeated_field_keeps_last() {
        let body = [TrackerField::Sats.id(), 4, TrackerField::Sats.id(), 7];
        let msg = decode(&frame(&body)).unwrap();
        assert_eq!(msg.get(TrackerField::Sats), Some(&FieldValue::Unsigned(7)));
    }

    #[test]
    fn test_encode_mt_message() {
        let msg = TrackerMessage::new()
            .with(TrackerField::Lon, 11.5)
            .with(TrackerField::Lat, 48.25)
            .with(TrackerField::Alt, 520.5)
            .with(TrackerField::DateTime, datetime(2022, 8, 20, 10, 0, 0))
            .with(TrackerField::UserFunc1, FieldValue::Present)
            .with(TrackerField::UserFunc5, 300u64);

        let bytes = encode(&msg).unwrap();
        assert_eq!(crate::message::to_hex(&bytes), MT_MESSAGE);
    }

    #[test]
    fn test_encode_then_decode_preserves_message() {
        let original = decode(&from_hex(MO_MESSAGE).unwrap()).unwrap();
        let bytes = encode(&original).unwrap();
        assert_eq!(crate::message::to_hex(&bytes), MO_MESSAGE);
    }

    #[test]
    fn test_encode_empty_message() {
        assert_eq!(encode(&TrackerMessage::new()).unwrap(), vec![STX, ETX, 5, 7]);
    }

    #[test]
    fn test_encode_skips_markers() {
        let msg = TrackerMessage::new().with(TrackerField::Stx, FieldValue::Present);
        assert_eq!(encode(&msg).unwrap(), vec![STX, ETX, 5, 7]);
    }

    #[test]
    fn test_encode_rounds_scaled_values() {
        let msg = TrackerMessage::new().with(TrackerField::Lat, 47.1);
        let bytes = encode(&msg).unwrap();
        assert_eq!(&bytes[2..6], &471_000_000i32.to_le_bytes());
    }

    #[test]
    fn test_encode_bare_user_function_sends_one() {
        let msg = TrackerMessage::new().with(TrackerField::UserFunc7, FieldValue::Present);
        let bytes = encode(&msg).unwrap();
        assert_eq!(&bytes[1..6], &[TrackerField::UserFunc7.id(), 1, 0, 0, 0]);
    }

    #[test]
    fn test_encode_bare_flag_only_for_user_functions() {
        let msg = TrackerMessage::new().with(TrackerField::Lat, FieldValue::Present);
        let err = encode(&msg).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldValue {
                field: TrackerField::Lat,
                ..
            }
        ));

        let msg = TrackerMessage::new().with(TrackerField::TxInt, FieldValue::Present);
        assert!(encode(&msg).is_err());

        let msg = TrackerMessage::new().with(TrackerField::UserFunc5, FieldValue::Present);
        let bytes = encode(&msg).unwrap();
        assert_eq!(&bytes[1..4], &[TrackerField::UserFunc5.id(), 1, 0]);
    }

    #[test]
    fn test_encode_out_of_range() {
        let msg = TrackerMessage::new().with(TrackerField::Lat, 300.0);
        let err = encode(&msg).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldValue {
                field: TrackerField::Lat,
                ..
            }
        ));

        let msg = TrackerMessage::new().with(TrackerField::Sats, FieldValue::Signed(-1));
        assert!(encode(&msg).is_err());
    }

    #[test]
    fn test_encode_array_length_mismatch() {
        let msg = TrackerMessage::new().with(
            TrackerField::GeofStat,
            FieldValue::Array(vec![FieldValue::Unsigned(1)]),
        );
        let err = encode(&msg).unwrap_err();
        assert!(err.to_string().contains("expected 3 values"));
    }

    #[test]
    fn test_encode_gateway_bytes() {
        let msg = TrackerMessage::new().with(TrackerField::RbHead, FieldValue::Present);
        let bytes = encode(&msg).unwrap();
        assert_eq!(&bytes[1..6], &[TrackerField::RbHead.id(), 0, 0, 0, 0]);

        let msg = TrackerMessage::new().with(TrackerField::RbHead, FieldValue::Bytes(vec![1, 2]));
        assert!(encode(&msg).is_err());
    }

    #[test]
    fn test_encode_datetime_requires_datetime() {
        let msg = TrackerMessage::new().with(TrackerField::DateTime, 5.0);
        assert!(encode(&msg).is_err());
    }

    #[test]
    fn test_encode_rejects_non_numeric_scalar() {
        let msg = TrackerMessage::new().with(TrackerField::Press, FieldValue::Bytes(vec![1]));
        assert!(encode(&msg).is_err());
    }
}
