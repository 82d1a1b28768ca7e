//! CLI commands and argument parsing.

pub mod inspect;
pub mod publish;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// Palisade - Audit event sanitization with PII range tracking
#[derive(Parser)]
#[command(name = "palisade")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Sanitize a JSON event and write the encoded envelope to stdout
    Publish(publish::PublishArgs),

    /// Show the PII index of encoded envelopes
    Inspect(inspect::InspectArgs),

    /// Print version information
    Version,
}

/// Reads the whole input file, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }

    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}
