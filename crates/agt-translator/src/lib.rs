//! `agt-translator` - Translator for Artemis Global Tracker messages
//!
//! This library decodes the binary SBD messages sent by the tracker over
//! Iridium, encodes messages to be sent to it, retrieves messages from files
//! or an IMAP mailbox, exports tracks as GPX and queues messages with the
//! `RockBLOCK` web API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gpx;
pub mod logging;
pub mod message;
pub mod rockblock;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use gpx::{GpxTrack, TrackPoint};
pub use logging::init_logging;
pub use message::{decode, encode, FieldValue, TrackerField, TrackerMessage};
pub use rockblock::{RockBlockClient, SendReceipt};
pub use source::{
    DecodeInput, DecodedMessage, FileSource, MailboxSource, MessageSource, RawMessage,
};
