//! Field catalogue of the tracker's binary message format.
//!
//! Every field is introduced on the wire by a one-byte ID followed by a
//! fixed-size little-endian payload. Some fields carry a fixed-point value
//! that has to be divided by a scale factor to obtain physical units.

use std::fmt;
use std::str::FromStr;

/// Primitive wire type of a scalar field or array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// IEEE 754 single precision float.
    F32,
}

impl ScalarType {
    /// Size of the type on the wire in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
        }
    }
}

/// Payload layout of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLayout {
    /// No payload; the field ID alone carries the meaning.
    Empty,
    /// A single scalar value.
    Scalar(ScalarType),
    /// A fixed number of scalar values.
    Array(ScalarType, usize),
    /// Opaque bytes of fixed length.
    Bytes(usize),
    /// Year (u16), month, day, hour, minute and second (u8 each).
    DateTime,
}

impl FieldLayout {
    /// Number of payload bytes that follow the field ID.
    #[must_use]
    pub fn encoded_len(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Scalar(ty) => ty.size(),
            Self::Array(ty, count) => ty.size() * count,
            Self::Bytes(len) => len,
            Self::DateTime => 7,
        }
    }
}

macro_rules! tracker_fields {
    ($($variant:ident = $id:literal, $name:literal, $layout:expr, $scale:expr, $doc:literal;)+) => {
        /// A field of the tracker message format, identified by its wire ID.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum TrackerField {
            $(
                #[doc = $doc]
                $variant = $id,
            )+
        }

        impl TrackerField {
            /// Every field, in ascending ID order.
            pub const ALL: &'static [TrackerField] = &[$(TrackerField::$variant),+];

            /// Look up a field by its wire ID.
            #[must_use]
            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Upper-case field name as used in the tracker documentation.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Payload layout of this field.
            #[must_use]
            pub fn layout(self) -> FieldLayout {
                use FieldLayout::{Array, Bytes, DateTime, Empty, Scalar};
                use ScalarType::{F32, I16, I32, U16, U32, U8};
                match self {
                    $(Self::$variant => $layout,)+
                }
            }

            /// Divisor that turns the raw wire value into physical units.
            #[must_use]
            pub fn scale(self) -> Option<f64> {
                match self {
                    $(Self::$variant => $scale,)+
                }
            }
        }
    };
}

tracker_fields! {
    Stx = 0x02, "STX", Empty, None, "Start of message marker.";
    Etx = 0x03, "ETX", Empty, None, "End of message marker.";
    SwVer = 0x04, "SWVER", Scalar(U8), None, "Firmware version (major in the high nibble).";
    Source = 0x08, "SOURCE", Scalar(U32), None, "Serial number of the sending `RockBLOCK`.";
    BattV = 0x09, "BATTV", Scalar(U16), Some(1e2), "Battery voltage in V.";
    Press = 0x0a, "PRESS", Scalar(U16), None, "Atmospheric pressure in mbar.";
    Temp = 0x0b, "TEMP", Scalar(I16), Some(1e2), "Temperature in degrees C.";
    Humid = 0x0c, "HUMID", Scalar(U16), Some(1e2), "Relative humidity in percent.";
    Year = 0x0d, "YEAR", Scalar(U16), None, "GNSS year.";
    Month = 0x0e, "MONTH", Scalar(U8), None, "GNSS month.";
    Day = 0x0f, "DAY", Scalar(U8), None, "GNSS day.";
    Hour = 0x10, "HOUR", Scalar(U8), None, "GNSS hour.";
    Min = 0x11, "MIN", Scalar(U8), None, "GNSS minute.";
    Sec = 0x12, "SEC", Scalar(U8), None, "GNSS second.";
    Millis = 0x13, "MILLIS", Scalar(U16), None, "GNSS milliseconds.";
    DateTime = 0x14, "DATETIME", DateTime, None, "GNSS date and time (UTC).";
    Lat = 0x15, "LAT", Scalar(I32), Some(1e7), "Latitude in degrees.";
    Lon = 0x16, "LON", Scalar(I32), Some(1e7), "Longitude in degrees.";
    Alt = 0x17, "ALT", Scalar(I32), Some(1e3), "Altitude above mean sea level in m.";
    Speed = 0x18, "SPEED", Scalar(I32), None, "Ground speed in mm/s.";
    Head = 0x19, "HEAD", Scalar(I32), Some(1e7), "Heading of motion in degrees.";
    Sats = 0x1a, "SATS", Scalar(U8), None, "Number of satellites in the fix.";
    Pdop = 0x1b, "PDOP", Scalar(U16), Some(1e2), "Position dilution of precision.";
    Fix = 0x1c, "FIX", Scalar(U8), None, "GNSS fix type.";
    GeofStat = 0x1d, "GEOFSTAT", Array(U8, 3), None, "Geofence status bytes.";
    UserVal1 = 0x20, "USERVAL1", Scalar(U8), None, "User value 1.";
    UserVal2 = 0x21, "USERVAL2", Scalar(U8), None, "User value 2.";
    UserVal3 = 0x22, "USERVAL3", Scalar(U16), None, "User value 3.";
    UserVal4 = 0x23, "USERVAL4", Scalar(U16), None, "User value 4.";
    UserVal5 = 0x24, "USERVAL5", Scalar(U32), None, "User value 5.";
    UserVal6 = 0x25, "USERVAL6", Scalar(U32), None, "User value 6.";
    UserVal7 = 0x26, "USERVAL7", Scalar(F32), None, "User value 7.";
    UserVal8 = 0x27, "USERVAL8", Scalar(F32), None, "User value 8.";
    MoFields = 0x30, "MOFIELDS", Array(U32, 3), None, "Bit mask of fields included in MO messages.";
    Flags1 = 0x31, "FLAGS1", Scalar(U8), None, "Configuration flags 1.";
    Flags2 = 0x32, "FLAGS2", Scalar(U8), None, "Configuration flags 2.";
    Dest = 0x33, "DEST", Scalar(U32), None, "Serial number of the destination `RockBLOCK`.";
    HiPress = 0x34, "HIPRESS", Scalar(U16), None, "High pressure alarm limit in mbar.";
    LoPress = 0x35, "LOPRESS", Scalar(U16), None, "Low pressure alarm limit in mbar.";
    HiTemp = 0x36, "HITEMP", Scalar(I16), Some(1e2), "High temperature alarm limit in degrees C.";
    LoTemp = 0x37, "LOTEMP", Scalar(I16), Some(1e2), "Low temperature alarm limit in degrees C.";
    HiHumid = 0x38, "HIHUMID", Scalar(U16), Some(1e2), "High humidity alarm limit in percent.";
    LoHumid = 0x39, "LOHUMID", Scalar(U16), Some(1e2), "Low humidity alarm limit in percent.";
    GeofNum = 0x3a, "GEOFNUM", Scalar(U8), None, "Number of geofences and confidence level.";
    Geof1Lat = 0x3b, "GEOF1LAT", Scalar(I32), Some(1e7), "Geofence 1 latitude in degrees.";
    Geof1Lon = 0x3c, "GEOF1LON", Scalar(I32), Some(1e7), "Geofence 1 longitude in degrees.";
    Geof1Rad = 0x3d, "GEOF1RAD", Scalar(U32), Some(1e2), "Geofence 1 radius in m.";
    Geof2Lat = 0x3e, "GEOF2LAT", Scalar(I32), Some(1e7), "Geofence 2 latitude in degrees.";
    Geof2Lon = 0x3f, "GEOF2LON", Scalar(I32), Some(1e7), "Geofence 2 longitude in degrees.";
    Geof2Rad = 0x40, "GEOF2RAD", Scalar(U32), Some(1e2), "Geofence 2 radius in m.";
    Geof3Lat = 0x41, "GEOF3LAT", Scalar(I32), Some(1e7), "Geofence 3 latitude in degrees.";
    Geof3Lon = 0x42, "GEOF3LON", Scalar(I32), Some(1e7), "Geofence 3 longitude in degrees.";
    Geof3Rad = 0x43, "GEOF3RAD", Scalar(U32), Some(1e2), "Geofence 3 radius in m.";
    Geof4Lat = 0x44, "GEOF4LAT", Scalar(I32), Some(1e7), "Geofence 4 latitude in degrees.";
    Geof4Lon = 0x45, "GEOF4LON", Scalar(I32), Some(1e7), "Geofence 4 longitude in degrees.";
    Geof4Rad = 0x46, "GEOF4RAD", Scalar(U32), Some(1e2), "Geofence 4 radius in m.";
    WakeInt = 0x47, "WAKEINT", Scalar(U32), None, "Wake-up interval in seconds.";
    AlarmInt = 0x48, "ALARMINT", Scalar(U16), None, "Alarm transmit interval in minutes.";
    TxInt = 0x49, "TXINT", Scalar(U16), None, "Message transmit interval in minutes.";
    LowBatt = 0x4a, "LOWBATT", Scalar(U16), Some(1e2), "Low battery threshold in V.";
    DynModel = 0x4b, "DYNMODEL", Scalar(U8), None, "GNSS dynamic platform model.";
    RbHead = 0x52, "RBHEAD", Bytes(4), None, "`RockBLOCK` gateway header.";
    UserFunc1 = 0x58, "USERFUNC1", Empty, None, "Trigger user function 1.";
    UserFunc2 = 0x59, "USERFUNC2", Empty, None, "Trigger user function 2.";
    UserFunc3 = 0x5a, "USERFUNC3", Empty, None, "Trigger user function 3.";
    UserFunc4 = 0x5b, "USERFUNC4", Empty, None, "Trigger user function 4.";
    UserFunc5 = 0x5c, "USERFUNC5", Scalar(U16), None, "Trigger user function 5 with a u16 argument.";
    UserFunc6 = 0x5d, "USERFUNC6", Scalar(U16), None, "Trigger user function 6 with a u16 argument.";
    UserFunc7 = 0x5e, "USERFUNC7", Scalar(U32), None, "Trigger user function 7 with a u32 argument.";
    UserFunc8 = 0x5f, "USERFUNC8", Scalar(U32), None, "Trigger user function 8 with a u32 argument.";
}

impl TrackerField {
    /// The wire ID of this field.
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Whether this is one of the STX/ETX framing markers.
    #[must_use]
    pub fn is_marker(self) -> bool {
        matches!(self, Self::Stx | Self::Etx)
    }

    /// Whether this is one of USERFUNC5 to USERFUNC8, which carry an argument.
    #[must_use]
    pub fn is_valued_user_function(self) -> bool {
        matches!(
            self,
            Self::UserFunc5 | Self::UserFunc6 | Self::UserFunc7 | Self::UserFunc8
        )
    }

    /// The `USERFUNC<n>` field for `n` in `1..=8`.
    #[must_use]
    pub fn user_function(n: u8) -> Option<Self> {
        match n {
            1..=8 => Self::from_id(Self::UserFunc1.id() + n - 1),
            _ => None,
        }
    }
}

impl fmt::Display for TrackerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackerField {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::error::Error::invalid_argument(format!("unknown field name: {s}")))
    }
}
