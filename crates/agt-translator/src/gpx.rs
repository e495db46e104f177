//! GPX track export.
//!
//! Positioned tracker messages are turned into track points of a single
//! track segment and written as GPX 1.1.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::{debug, warn};

use crate::config::GpxConfig;
use crate::error::{Error, Result};
use crate::message::{TrackerField, TrackerMessage};
use crate::source::DecodedMessage;

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// One point of the track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in metres.
    pub elevation: Option<f64>,
    /// GNSS time (UTC).
    pub time: Option<NaiveDateTime>,
    /// Free-text comment; carries the pressure reading.
    pub comment: Option<String>,
}

impl TrackPoint {
    /// Build a track point from a decoded message.
    ///
    /// Returns `None` if the message has no LAT/LON.
    #[must_use]
    pub fn from_message(message: &TrackerMessage) -> Option<Self> {
        let (latitude, longitude) = message.position()?;
        Some(Self {
            latitude,
            longitude,
            elevation: message.altitude(),
            time: message.timestamp(),
            comment: message
                .get(TrackerField::Press)
                .map(|pressure| format!("{pressure} hPa")),
        })
    }
}

/// A GPX document with one track made of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxTrack {
    creator: String,
    name: String,
    points: Vec<TrackPoint>,
}

impl GpxTrack {
    /// Create an empty track.
    #[must_use]
    pub fn new(creator: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Create an empty track using the configured creator and name.
    #[must_use]
    pub fn from_config(config: &GpxConfig) -> Self {
        Self::new(config.creator.clone(), config.name.clone())
    }

    /// Append a point.
    pub fn push(&mut self, point: TrackPoint) {
        self.points.push(point);
    }

    /// Append the position of a message.
    ///
    /// Returns `false` if the message carries no position.
    pub fn push_message(&mut self, message: &TrackerMessage) -> bool {
        match TrackPoint::from_message(message) {
            Some(point) => {
                self.push(point);
                true
            }
            None => false,
        }
    }

    /// Build a track from decoded messages in order.
    ///
    /// Messages without a position are left out with a warning.
    #[must_use]
    pub fn from_decoded(config: &GpxConfig, decoded: &[DecodedMessage]) -> Self {
        let mut track = Self::from_config(config);
        for item in decoded {
            if !track.push_message(&item.message) {
                warn!("Message {} has no position, not added to track", item.origin);
            }
        }
        track
    }

    /// The points collected so far.
    #[must_use]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the track has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Write the GPX document.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        let gpx = BytesStart::new("gpx").with_attributes([
            ("xmlns", GPX_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
            ("version", "1.1"),
            ("creator", self.creator.as_str()),
        ]);
        emit(&mut writer, Event::Start(gpx))?;

        emit(&mut writer, Event::Start(BytesStart::new("metadata")))?;
        text_element(&mut writer, "name", &self.name)?;
        emit(&mut writer, Event::End(BytesEnd::new("metadata")))?;

        emit(&mut writer, Event::Start(BytesStart::new("trk")))?;
        emit(&mut writer, Event::Start(BytesStart::new("trkseg")))?;
        for point in &self.points {
            write_point(&mut writer, point)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("trkseg")))?;
        emit(&mut writer, Event::End(BytesEnd::new("trk")))?;

        emit(&mut writer, Event::End(BytesEnd::new("gpx")))?;
        writer.into_inner().flush()?;
        Ok(())
    }

    /// Render the GPX document as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if XML generation fails.
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::gpx(e.to_string()))
    }

    /// Write the GPX document to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("Writing {} track points to {}", self.len(), path.display());
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::gpx(e.to_string()))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_point<W: Write>(writer: &mut Writer<W>, point: &TrackPoint) -> Result<()> {
    let lat = point.latitude.to_string();
    let lon = point.longitude.to_string();
    let trkpt = BytesStart::new("trkpt").with_attributes([("lat", lat.as_str()), ("lon", lon.as_str())]);
    emit(writer, Event::Start(trkpt))?;

    if let Some(elevation) = point.elevation {
        text_element(writer, "ele", &elevation.to_string())?;
    }
    if let Some(time) = point.time {
        text_element(writer, "time", &time.format("%Y-%m-%dT%H:%M:%SZ").to_string())?;
    }
    if let Some(comment) = &point.comment {
        text_element(writer, "cmt", comment)?;
    }

    emit(writer, Event::End(BytesEnd::new("trkpt")))
}
