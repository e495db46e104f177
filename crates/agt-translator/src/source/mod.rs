//! Sources of binary tracker messages.
//!
//! Messages reach the ground either as files (downloaded from the
//! `RockBLOCK` portal) or as e-mail attachments forwarded by the gateway.
//! Each origin implements [`MessageSource`].

pub mod mailbox;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::message::{decode, from_hex, TrackerMessage};

pub use mailbox::{extract_attachments, MailboxSource};

/// A binary message together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Human-readable origin (file name or mail attachment).
    pub origin: String,
    /// The raw message bytes.
    pub bytes: Vec<u8>,
}

/// A successfully decoded message together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// Human-readable origin (file name or mail attachment).
    pub origin: String,
    /// The decoded fields.
    pub message: TrackerMessage,
}

/// Something that yields binary tracker messages.
#[async_trait]
pub trait MessageSource: Send {
    /// The name of this source (for logging).
    fn name(&self) -> &'static str;

    /// Retrieve all available messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read at all. Individual
    /// messages are not decoded here.
    async fn fetch(&mut self) -> Result<Vec<RawMessage>>;
}

/// Messages stored as individual files.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    /// Create a source reading the given files in order.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl MessageSource for FileSource {
    fn name(&self) -> &'static str {
        "files"
    }

    async fn fetch(&mut self) -> Result<Vec<RawMessage>> {
        let mut messages = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| Error::FileRead {
                    path: path.clone(),
                    source,
                })?;
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            messages.push(RawMessage {
                origin: path.display().to_string(),
                bytes,
            });
        }
        Ok(messages)
    }
}

/// Inputs of the `decode` command other than the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeInput {
    /// A single message given as ASCII hex.
    Hex(String),
    /// Message files, decoded in order.
    Files(Vec<PathBuf>),
}

impl DecodeInput {
    /// Interpret command-line inputs.
    ///
    /// A single argument that is not an existing file is taken as hex;
    /// otherwise every argument is a file.
    ///
    /// # Errors
    ///
    /// Returns an error if no input is given.
    pub fn from_args(inputs: &[String]) -> Result<Self> {
        match inputs {
            [] => Err(Error::invalid_argument(
                "no input given; pass message files, a hex message or --imap",
            )),
            [single] if !Path::new(single).is_file() => Ok(Self::Hex(single.clone())),
            paths => Ok(Self::Files(paths.iter().map(PathBuf::from).collect())),
        }
    }

    /// Read and decode the input.
    ///
    /// Files that fail to decode are skipped with a warning. A hex message
    /// that cannot be parsed or decoded is an error.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable file or a bad hex message.
    pub async fn decode(self) -> Result<Vec<DecodedMessage>> {
        match self {
            Self::Hex(text) => {
                let message = decode(&from_hex(&text)?)?;
                Ok(vec![DecodedMessage {
                    origin: "hex input".to_string(),
                    message,
                }])
            }
            Self::Files(paths) => fetch_and_decode(&mut FileSource::new(paths)).await,
        }
    }
}

/// Fetch everything from `source` and decode it, skipping failures.
///
/// # Errors
///
/// Returns an error if the source cannot be read.
pub async fn fetch_and_decode(source: &mut dyn MessageSource) -> Result<Vec<DecodedMessage>> {
    let raw = source.fetch().await?;
    let decoded = decode_all(&raw);
    info!(
        "Decoded {} of {} messages from {}",
        decoded.len(),
        raw.len(),
        source.name()
    );
    Ok(decoded)
}

/// Decode every raw message, skipping those that fail.
///
/// Failures are logged with the message origin.
#[must_use]
pub fn decode_all(raw: &[RawMessage]) -> Vec<DecodedMessage> {
    raw.iter()
        .filter_map(|item| match decode(&item.bytes) {
            Ok(message) => Some(DecodedMessage {
                origin: item.origin.clone(),
                message,
            }),
            Err(e) => {
                warn!("Error translating message {}: {}", item.origin, e);
                None
            }
        })
        .collect()
}
