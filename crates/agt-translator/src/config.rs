//! Configuration management for agt-translator.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.
//! Credentials for the mailbox and the `RockBLOCK` account live here.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "agt-translator";

/// Prefix of environment variables that override file settings.
const ENV_PREFIX: &str = "AGT_";

/// Sender address `RockBLOCK` uses for forwarded MO messages.
pub const DEFAULT_FROM_ADDRESS: &str = "@rockblock.rock7.com";

/// `RockBLOCK` endpoint accepting MT messages.
pub const DEFAULT_MT_ENDPOINT: &str = "https://core.rock7.com/rockblock/MT";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AGT_`, e.g. `AGT_EMAIL_HOST`)
/// 2. TOML config file at `~/.config/agt-translator/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mailbox that receives MO messages as e-mail attachments.
    pub email: EmailConfig,
    /// `RockBLOCK` web API account.
    pub rockblock: RockBlockConfig,
    /// Tracker that MT messages are sent to.
    pub device: DeviceConfig,
    /// GPX output settings.
    pub gpx: GpxConfig,
}

/// IMAP mailbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// IMAP server host name.
    pub host: Option<String>,
    /// IMAP over TLS port.
    pub port: u16,
    /// Login name.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Sender address (or address fragment) to search for.
    pub from: String,
    /// Mailbox to select.
    pub mailbox: String,
}

/// `RockBLOCK` account configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockBlockConfig {
    /// Account user name.
    pub user: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// MT endpoint URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

/// Target device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// IMEI of the tracker's Iridium modem.
    pub imei: Option<String>,
}

/// GPX output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpxConfig {
    /// Value of the `creator` attribute.
    pub creator: String,
    /// Name written into the GPX metadata and track.
    pub name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 993,
            user: None,
            password: None,
            from: DEFAULT_FROM_ADDRESS.to_string(),
            mailbox: "INBOX".to_string(),
        }
    }
}

impl Default for RockBlockConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            endpoint: DEFAULT_MT_ENDPOINT.to_string(),
            timeout: 30,
        }
    }
}

impl Default for GpxConfig {
    fn default() -> Self {
        Self {
            creator: "AGT Message Translator".to_string(),
            name: "Artemis Global Tracker".to_string(),
        }
    }
}

/// Mailbox settings with all required values present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    /// IMAP server host name.
    pub host: String,
    /// IMAP over TLS port.
    pub port: u16,
    /// Login name.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Sender address to search for.
    pub from: String,
    /// Mailbox to select.
    pub mailbox: String,
}

/// `RockBLOCK` settings with all required values present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RockBlockSettings {
    /// Account user name.
    pub user: String,
    /// Account password.
    pub password: String,
    /// MT endpoint URL.
    pub endpoint: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// Keys whose environment values are taken verbatim as strings.
///
/// The env provider parses values, which turns an all-digit IMEI or
/// password into a number and drops leading zeros.
const STRING_KEYS: &[&str] = &[
    "email.host",
    "email.user",
    "email.password",
    "email.from",
    "email.mailbox",
    "rockblock.user",
    "rockblock.password",
    "rockblock.endpoint",
    "device.imei",
    "gpx.creator",
    "gpx.name",
];

/// Layer `AGT_<SECTION>_<KEY>` variables on top of `figment`.
fn merge_env(figment: Figment) -> Figment {
    let env = Env::prefixed(ENV_PREFIX).split("_");
    let verbatim: Vec<(String, String)> = env
        .iter()
        .filter_map(|(key, value)| {
            let key = key.as_str().to_ascii_lowercase().replace('_', ".");
            STRING_KEYS.contains(&key.as_str()).then_some((key, value))
        })
        .collect();

    verbatim
        .into_iter()
        .fold(figment.merge(env), |figment, (key, value)| {
            figment.merge(Serialized::default(&key, value))
        })
}

fn required(value: Option<&String>, section: &'static str, key: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(Error::MissingSetting { section, key })
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested());

        let config: Config = merge_env(figment).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.email.port == 0 {
            return Err(Error::ConfigValidation {
                message: "email.port must be greater than 0".to_string(),
            });
        }

        let endpoint = &self.rockblock.endpoint;
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(Error::ConfigValidation {
                message: format!("rockblock.endpoint must be an http(s) URL: {endpoint}"),
            });
        }

        if self.rockblock.timeout == 0 {
            return Err(Error::ConfigValidation {
                message: "rockblock.timeout must be greater than 0".to_string(),
            });
        }

        if let Some(imei) = &self.device.imei {
            if imei.len() != 15 || !imei.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::ConfigValidation {
                    message: format!("device.imei must be 15 digits: {imei}"),
                });
            }
        }

        Ok(())
    }

    /// Mailbox settings, requiring host and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing setting.
    pub fn email_settings(&self) -> Result<EmailSettings> {
        Ok(EmailSettings {
            host: required(self.email.host.as_ref(), "email", "host")?,
            port: self.email.port,
            user: required(self.email.user.as_ref(), "email", "user")?,
            password: required(self.email.password.as_ref(), "email", "password")?,
            from: self.email.from.clone(),
            mailbox: self.email.mailbox.clone(),
        })
    }

    /// `RockBLOCK` settings, requiring credentials.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing setting.
    pub fn rockblock_settings(&self) -> Result<RockBlockSettings> {
        Ok(RockBlockSettings {
            user: required(self.rockblock.user.as_ref(), "rockblock", "user")?,
            password: required(self.rockblock.password.as_ref(), "rockblock", "password")?,
            endpoint: self.rockblock.endpoint.clone(),
            timeout: Duration::from_secs(self.rockblock.timeout),
        })
    }

    /// IMEI of the device MT messages are sent to.
    ///
    /// # Errors
    ///
    /// Returns an error if no IMEI is configured.
    pub fn device_imei(&self) -> Result<String> {
        required(self.device.imei.as_ref(), "device", "imei")
    }
}
