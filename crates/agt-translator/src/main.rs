//! `agtmsg` - CLI for agt-translator
//!
//! This binary decodes messages received from an Artemis Global Tracker and
//! encodes messages to be sent to it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use agt_translator::cli::{Cli, Command, ConfigCommand, DecodeCommand, EncodeCommand, OutputFormat};
use agt_translator::message::to_hex;
use agt_translator::source::{fetch_and_decode, DecodeInput};
use agt_translator::{encode, init_logging, Config, GpxTrack, MailboxSource, RockBlockClient};

const MASK: &str = "********";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match cli.command {
        Command::Decode(cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_decode(&config, cmd).await
        }
        Command::Encode(cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_encode(&config, &cmd).await
        }
        Command::Config(cmd) => handle_config(cli.config, cmd),
    }
}

async fn handle_decode(config: &Config, cmd: DecodeCommand) -> Result<()> {
    let decoded = if cmd.imap {
        let mut source = MailboxSource::new(config.email_settings()?, !cmd.all);
        fetch_and_decode(&mut source)
            .await
            .context("cannot read messages from mailbox")?
    } else {
        DecodeInput::from_args(&cmd.inputs)?.decode().await?
    };

    match cmd.format {
        OutputFormat::Plain => {
            for item in &decoded {
                println!("Message {}:", item.origin);
                print!("{}", item.message);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decoded)?),
    }

    if let Some(path) = &cmd.output {
        let track = GpxTrack::from_decoded(&config.gpx, &decoded);
        track
            .save(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!("Wrote {} track points to {}", track.len(), path.display());
    }
    Ok(())
}

async fn handle_encode(config: &Config, cmd: &EncodeCommand) -> Result<()> {
    let message = cmd.to_message();
    if message.is_empty() {
        warn!("No fields given; encoding an empty message");
    }
    let bytes = encode(&message)?;

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => println!("{}", to_hex(&bytes)),
    }

    if cmd.send {
        let imei = config.device_imei()?;
        let client = RockBlockClient::new(config.rockblock_settings()?)?;
        let receipt = client.send(&imei, &bytes).await?;
        match receipt.message_id {
            Some(id) => println!("Message sent (ID {id})"),
            None => println!("Message sent"),
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = masked(Config::load_from(config_path)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn masked(mut config: Config) -> Config {
    for password in [&mut config.email.password, &mut config.rockblock.password] {
        if password.is_some() {
            *password = Some(MASK.to_string());
        }
    }
    config
}

fn print_config(config: &Config) {
    let unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".to_string());

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Email]");
    println!("  Host:               {}", unset(&config.email.host));
    println!("  Port:               {}", config.email.port);
    println!("  User:               {}", unset(&config.email.user));
    println!("  Password:           {}", unset(&config.email.password));
    println!("  From:               {}", config.email.from);
    println!("  Mailbox:            {}", config.email.mailbox);
    println!();
    println!("[RockBLOCK]");
    println!("  User:               {}", unset(&config.rockblock.user));
    println!("  Password:           {}", unset(&config.rockblock.password));
    println!("  Endpoint:           {}", config.rockblock.endpoint);
    println!("  Timeout (s):        {}", config.rockblock.timeout);
    println!();
    println!("[Device]");
    println!("  IMEI:               {}", unset(&config.device.imei));
    println!();
    println!("[GPX]");
    println!("  Creator:            {}", config.gpx.creator);
    println!("  Track name:         {}", config.gpx.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_passwords() {
        let mut config = Config::default();
        config.email.password = Some("secret".to_string());
        let config = masked(config);
        assert_eq!(config.email.password.as_deref(), Some(MASK));
        assert!(config.rockblock.password.is_none());
    }
}
