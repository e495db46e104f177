//! `RockBLOCK` web API client for mobile-terminated messages.
//!
//! An MT message is sent by POSTing the IMEI, the hex-encoded message and
//! the account credentials to the gateway endpoint. The gateway answers
//! with a single line of plain text:
//!
//! - `OK,<message id>` when the message was queued
//! - `FAILED,<code>,<description>` when it was rejected

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::RockBlockSettings;
use crate::error::{Error, Result};
use crate::message::to_hex;

/// Receipt for a queued MT message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Gateway message ID, if the gateway reported one.
    pub message_id: Option<String>,
}

/// Client for the `RockBLOCK` MT endpoint.
#[derive(Debug, Clone)]
pub struct RockBlockClient {
    http: Client,
    settings: RockBlockSettings,
}

impl RockBlockClient {
    /// Create a client with the configured endpoint, credentials and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: RockBlockSettings) -> Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    /// The endpoint messages are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    /// Send an encoded message to the device with the given IMEI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the request fails, [`Error::SendFailed`]
    /// if the gateway rejects the message and
    /// [`Error::UnexpectedResponse`] for anything else it answers.
    pub async fn send(&self, imei: &str, message: &[u8]) -> Result<SendReceipt> {
        let data = to_hex(message);
        let form = [
            ("imei", imei),
            ("data", data.as_str()),
            ("username", self.settings.user.as_str()),
            ("password", self.settings.password.as_str()),
        ];

        info!("Sending {} bytes to {}", message.len(), imei);
        let response = self
            .http
            .post(&self.settings.endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("RockBLOCK endpoint answered with HTTP {}", status);
        }
        let body = response.text().await?;
        debug!("RockBLOCK response: {}", body.trim());

        let receipt = parse_response(&body)?;
        if let Some(id) = &receipt.message_id {
            info!("Message queued with ID {}", id);
        }
        Ok(receipt)
    }
}

/// Interpret the plain-text answer of the MT endpoint.
///
/// # Errors
///
/// Returns [`Error::SendFailed`] for a `FAILED` answer and
/// [`Error::UnexpectedResponse`] if the answer is not recognised.
pub fn parse_response(body: &str) -> Result<SendReceipt> {
    let line = body.trim();
    let mut parts = line.splitn(3, ',');
    match parts.next().map(str::trim) {
        Some("OK") => {
            let message_id = parts
                .next()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty());
            if message_id.is_none() {
                warn!("RockBLOCK accepted the message without a message ID");
            }
            Ok(SendReceipt { message_id })
        }
        Some("FAILED") => Err(Error::SendFailed {
            code: parts.next().unwrap_or_default().trim().to_string(),
            message: parts.next().unwrap_or_default().trim().to_string(),
        }),
        _ => Err(Error::UnexpectedResponse(line.to_string())),
    }
}
