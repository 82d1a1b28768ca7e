//! Publish command implementation.
//!
//! Reads a plain JSON event, marks the requested fields as sensitive and
//! writes the encoded envelope to stdout.

use std::fmt::Debug;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use palisade_audit::{
    FieldPath, Publisher, PublisherConfig, Record, WriterTransport, DEBUG_ENV, SILENCE_ENV,
};

/// A `PATH=LABEL` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveMark {
    /// Path of the string leaf to mark.
    pub path: FieldPath,
    /// Category label for the leaf.
    pub label: String,
}

/// Arguments for the publish command.
#[derive(Args)]
pub struct PublishArgs {
    /// Path to a JSON event file (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Mark a string field as sensitive, e.g. `.user=name` (repeatable)
    #[arg(short, long = "sensitive", value_name = "PATH=LABEL", value_parser = parse_mark)]
    pub sensitive: Vec<SensitiveMark>,

    /// Write indented JSON instead of a single line
    #[arg(long)]
    pub pretty: bool,

    /// Log the sensitive paths of each envelope
    #[arg(long, env = DEBUG_ENV)]
    pub debug: bool,

    /// Drop the event instead of writing it
    #[arg(long, env = SILENCE_ENV)]
    pub silence: bool,
}

/// Runs the publish command.
///
/// # Errors
///
/// Returns an error if:
/// - The input cannot be read or is not a JSON object
/// - A marked path does not exist or is not a string
/// - The envelope cannot be assembled or written
pub fn run(args: &PublishArgs) -> Result<()> {
    info!(input = ?args.input, marks = args.sensitive.len(), "Publishing audit event");

    let text = super::read_input(args.input.as_deref())?;
    let record = build_record(&text, &args.sensitive)?;

    let config = PublisherConfig::new()
        .with_debug(args.debug)
        .with_silence(args.silence);

    emit(&record, config, args.pretty, io::stdout())?;
    Ok(())
}

/// Publishes `record` through a writer transport and hands the writer back.
fn emit<W>(record: &Record, config: PublisherConfig, pretty: bool, writer: W) -> Result<W>
where
    W: Write + Send + Debug + 'static,
{
    let transport = Arc::new(if pretty {
        WriterTransport::pretty(writer)
    } else {
        WriterTransport::new(writer)
    });

    let publisher = Publisher::new(config, transport.clone());
    publisher.publish(record).context("Failed to publish event")?;
    publisher.flush().context("Failed to flush output")?;
    drop(publisher);

    let transport = Arc::try_unwrap(transport)
        .map_err(|_| anyhow::anyhow!("Output transport is still in use"))?;
    Ok(transport.into_inner())
}

/// Parses `text` as a JSON object and applies every mark to it.
fn build_record(text: &str, marks: &[SensitiveMark]) -> Result<Record> {
    let json: serde_json::Value = serde_json::from_str(text).context("Input is not valid JSON")?;
    let mut record = Record::try_from(json)?;

    for mark in marks {
        record
            .mark_sensitive(&mark.path, &mark.label)
            .with_context(|| format!("Failed to mark {} as sensitive", mark.path))?;
    }

    Ok(record)
}

/// Parses a `PATH=LABEL` argument.
fn parse_mark(arg: &str) -> Result<SensitiveMark, String> {
    let (path, label) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected PATH=LABEL, got '{arg}'"))?;

    if label.is_empty() {
        return Err(format!("missing label in '{arg}'"));
    }

    let path = FieldPath::parse(path).map_err(|e| e.to_string())?;

    Ok(SensitiveMark {
        path,
        label: label.to_string(),
    })
}
