//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and the value
//! parsers for their arguments.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::message::{FieldLayout, FieldValue, TrackerField, TrackerMessage};

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Message files, or a single message as hex
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Fetch messages from the configured IMAP mailbox
    #[arg(long, conflicts_with = "inputs")]
    pub imap: bool,

    /// Include mails already marked as read (with --imap)
    #[arg(short, long, requires = "imap")]
    pub all: bool,

    /// Write positioned messages to a GPX file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for decoded messages
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Encode command arguments.
#[derive(Debug, Args)]
pub struct EncodeCommand {
    /// Target position as "lon,lat,alt" (degrees, degrees, metres)
    #[arg(short, long, value_parser = parse_position, allow_hyphen_values = true)]
    pub position: Option<Position>,

    /// Date and time (UTC) to include; without a value the current time
    #[arg(
        short,
        long,
        value_name = "TIME",
        num_args = 0..=1,
        default_missing_value = "now",
        value_parser = parse_time
    )]
    pub time: Option<NaiveDateTime>,

    /// User functions to trigger, e.g. "1,3,5:300"
    #[arg(short, long, value_name = "LIST", value_parser = parse_user_functions)]
    pub userfunc: Option<UserFunctions>,

    /// Write the binary message to a file instead of printing hex
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Send the message to the configured device through RockBLOCK
    #[arg(short, long)]
    pub send: bool,
}

impl EncodeCommand {
    /// Assemble the message described by the arguments.
    #[must_use]
    pub fn to_message(&self) -> TrackerMessage {
        let mut message = TrackerMessage::new();
        if let Some(position) = self.position {
            message.insert(TrackerField::Lon, position.longitude);
            message.insert(TrackerField::Lat, position.latitude);
            message.insert(TrackerField::Alt, position.altitude);
        }
        if let Some(time) = self.time {
            message.insert(TrackerField::DateTime, time);
        }
        if let Some(functions) = &self.userfunc {
            for (field, value) in &functions.0 {
                message.insert(*field, value.clone());
            }
        }
        message
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for decoded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One field per line
    #[default]
    Plain,
    /// JSON array of messages
    Json,
}

/// A target position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Altitude in metres.
    pub altitude: f64,
}

/// User functions to trigger, with their optional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunctions(pub Vec<(TrackerField, FieldValue)>);

/// Parse "lon,lat,alt".
///
/// # Errors
///
/// Returns a message if there are not exactly three numbers.
pub fn parse_position(s: &str) -> Result<Position, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [longitude, latitude, altitude] => Ok(Position {
            longitude: *longitude,
            latitude: *latitude,
            altitude: *altitude,
        }),
        _ => Err(format!(
            "expected lon,lat,alt but got {} values",
            values.len()
        )),
    }
}

/// Parse a UTC time: "now", "YYYY-mm-dd HH:MM:SS", "YYYY-mm-ddTHH:MM:SS"
/// or "YYYY-mm-dd" (midnight).
///
/// # Errors
///
/// Returns a message if the text matches none of the formats.
pub fn parse_time(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now().naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(time);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("'{s}' is not a valid ISO date/time"))
}

/// Parse a user function list such as "1,3,5:300".
///
/// Functions 1 to 4 take no value. Functions 5 to 8 take an optional
/// value; without one they are sent as 1.
///
/// # Errors
///
/// Returns a message for unknown function numbers, values on functions
/// that take none, or values that are not unsigned integers.
pub fn parse_user_functions(s: &str) -> Result<UserFunctions, String> {
    let mut functions = Vec::new();
    for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (number, value) = match item.split_once(':') {
            Some((number, value)) => (number.trim(), Some(value.trim())),
            None => (item, None),
        };
        let field = number
            .parse::<u8>()
            .ok()
            .and_then(TrackerField::user_function)
            .ok_or_else(|| format!("'{number}' is not a user function (1-8)"))?;

        let value = match (field.layout(), value) {
            (_, None) => FieldValue::Present,
            (FieldLayout::Empty, Some(_)) => {
                return Err(format!("{field} does not take a value"));
            }
            (_, Some(value)) => value
                .parse::<u64>()
                .map(FieldValue::Unsigned)
                .map_err(|_| format!("'{value}' is not a valid value for {field}"))?,
        };
        functions.push((field, value));
    }

    if functions.is_empty() {
        return Err("no user functions given".to_string());
    }
    Ok(UserFunctions(functions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_parse_position() {
        let position = parse_position("-8.5, 47.25, 1200").unwrap();
        assert_eq!(position.longitude, -8.5);
        assert_eq!(position.latitude, 47.25);
        assert_eq!(position.altitude, 1200.0);
    }

    #[test]
    fn test_parse_position_wrong_count() {
        assert!(parse_position("1,2").is_err());
        assert!(parse_position("1,2,3,4").is_err());
        assert!(parse_position("a,2,3").is_err());
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 5, 7)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap();
        assert_eq!(parse_time("2021-05-07 12:30:45").unwrap(), expected);
        assert_eq!(parse_time("2021-05-07T12:30:45").unwrap(), expected);

        let midnight = parse_time("2021-05-07").unwrap();
        assert_eq!(midnight.hour(), 0);
        assert_eq!(midnight.date(), expected.date());
    }

    #[test]
    fn test_parse_time_now() {
        let before = Utc::now().naive_utc();
        let now = parse_time("now").unwrap();
        assert!(now >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert!(parse_time("yesterday").is_err());
        assert!(parse_time("2021-13-01").is_err());
    }

    #[test]
    fn test_parse_user_functions() {
        let functions = parse_user_functions("1,3,5:300").unwrap();
        assert_eq!(
            functions.0,
            vec![
                (TrackerField::UserFunc1, FieldValue::Present),
                (TrackerField::UserFunc3, FieldValue::Present),
                (TrackerField::UserFunc5, FieldValue::Unsigned(300)),
            ]
        );
    }

    #[test]
    fn test_parse_user_functions_value_defaults_to_present() {
        let functions = parse_user_functions("7").unwrap();
        assert_eq!(
            functions.0,
            vec![(TrackerField::UserFunc7, FieldValue::Present)]
        );
    }

    #[test]
    fn test_parse_user_functions_errors() {
        assert!(parse_user_functions("9").is_err());
        assert!(parse_user_functions("0").is_err());
        assert!(parse_user_functions("2:5").is_err());
        assert!(parse_user_functions("6:-1").is_err());
        assert!(parse_user_functions("").is_err());
    }

    #[test]
    fn test_encode_command_to_message() {
        let cmd = EncodeCommand {
            position: Some(parse_position("-8.5,47.25,1200").unwrap()),
            time: Some(parse_time("2021-05-07 12:30:45").unwrap()),
            userfunc: Some(parse_user_functions("2").unwrap()),
            output: None,
            send: false,
        };
        let message = cmd.to_message();
        assert_eq!(message.len(), 5);
        assert_eq!(message.position(), Some((47.25, -8.5)));
        assert_eq!(message.altitude(), Some(1200.0));
        assert!(message.timestamp().is_some());
        assert!(message.contains(TrackerField::UserFunc2));
    }

    #[test]
    fn test_empty_encode_command() {
        let cmd = EncodeCommand {
            position: None,
            time: None,
            userfunc: None,
            output: None,
            send: false,
        };
        assert!(cmd.to_message().is_empty());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
