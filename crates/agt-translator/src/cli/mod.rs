//! Command-line interface for agt-translator.
//!
//! This module provides the CLI structure for the `agtmsg` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_position, parse_time, parse_user_functions, ConfigCommand, DecodeCommand,
    EncodeCommand, OutputFormat, Position, UserFunctions,
};

/// agtmsg - Translate Artemis Global Tracker messages
///
/// Decodes binary SBD messages received from the tracker (from files, a hex
/// string or an IMAP mailbox) and encodes messages to be sent to it.
#[derive(Debug, Parser)]
#[command(name = "agtmsg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode mobile-originated messages
    Decode(DecodeCommand),

    /// Encode (and optionally send) a mobile-terminated message
    Encode(EncodeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
