//! Error types for agt-translator.
//!
//! This module defines all error types used throughout the crate, covering
//! the binary message codec, message sources, the `RockBLOCK` web API and
//! configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::message::TrackerField;

/// The main error type for agt-translator operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Codec Errors ===
    /// The start-of-text marker was not found at offset 0 or after a gateway header.
    #[error("STX marker not found")]
    MissingStx,

    /// The message contains a field ID that is not part of the format.
    #[error("unknown field ID 0x{id:02x} at offset {offset}")]
    UnknownField {
        /// The unrecognised field ID.
        id: u8,
        /// Byte offset of the ID within the message.
        offset: usize,
    },

    /// The message ended before a field or the trailer was complete.
    #[error("message truncated while reading {what} at offset {offset}")]
    Truncated {
        /// What was being read when the data ran out.
        what: String,
        /// Byte offset where the read started.
        offset: usize,
    },

    /// The trailing Fletcher checksum does not match the message contents.
    #[error("checksum mismatch: expected {expected:02x?}, found {found:02x?}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: (u8, u8),
        /// Checksum carried by the message.
        found: (u8, u8),
    },

    /// A DATETIME field holds an impossible calendar value.
    #[error("invalid date/time in message: {0}")]
    InvalidDateTime(String),

    /// A value cannot be encoded into the wire type of its field.
    #[error("invalid value for {field}: {message}")]
    FieldValue {
        /// The field being encoded.
        field: TrackerField,
        /// Description of the problem.
        message: String,
    },

    /// ASCII hex representation of a message could not be parsed.
    #[error("invalid hex message: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A command-line value could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A setting needed by the requested operation is not configured.
    #[error("missing setting '{key}' in section [{section}]")]
    MissingSetting {
        /// Configuration section name.
        section: &'static str,
        /// Key within the section.
        key: &'static str,
    },

    // === Source Errors ===
    /// Talking to the IMAP server failed.
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// A fetched e-mail could not be parsed.
    #[error("failed to parse e-mail: {0}")]
    MailParse(#[from] mailparse::MailParseError),

    /// Failed to read a message file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === RockBLOCK Errors ===
    /// The HTTP request to the `RockBLOCK` API failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The `RockBLOCK` API rejected the message.
    #[error("sending failed with error code {code}: {message}")]
    SendFailed {
        /// Numeric error code reported by the API.
        code: String,
        /// Error text reported by the API.
        message: String,
    },

    /// The `RockBLOCK` API answered with something unrecognised.
    #[error("unexpected server response: {0}")]
    UnexpectedResponse(String),

    // === Output Errors ===
    /// Writing GPX output failed.
    #[error("GPX output error: {0}")]
    Gpx(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for agt-translator operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new truncation error.
    #[must_use]
    pub fn truncated(what: impl Into<String>, offset: usize) -> Self {
        Self::Truncated {
            what: what.into(),
            offset,
        }
    }

    /// Create a new field value error.
    #[must_use]
    pub fn field_value(field: TrackerField, message: impl Into<String>) -> Self {
        Self::FieldValue {
            field,
            message: message.into(),
        }
    }

    /// Create a new mailbox error.
    #[must_use]
    pub fn mailbox(message: impl Into<String>) -> Self {
        Self::Mailbox(message.into())
    }

    /// Create a new GPX output error.
    #[must_use]
    pub fn gpx(message: impl Into<String>) -> Self {
        Self::Gpx(message.into())
    }

    /// Create a new invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from decoding or encoding a message.
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStx
                | Self::UnknownField { .. }
                | Self::Truncated { .. }
                | Self::ChecksumMismatch { .. }
                | Self::InvalidDateTime(_)
                | Self::FieldValue { .. }
                | Self::InvalidHex(_)
        )
    }

    /// Check if this error was reported by the `RockBLOCK` API.
    #[must_use]
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Self::SendFailed { .. } | Self::UnexpectedResponse(_))
    }
}
