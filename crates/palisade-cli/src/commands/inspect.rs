//! Inspect command implementation.
//!
//! Decodes encoded envelopes and prints their PII index. Field values are
//! never printed.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use palisade_audit::{decode_value, Envelope};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Path to a file of encoded envelopes (reads stdin when omitted)
    pub input: Option<PathBuf>,
}

/// Runs the inspect command.
///
/// Accepts a single envelope, pretty or compact, or several envelopes one
/// after another as written by `palisade publish`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or any envelope fails to decode.
pub fn run(args: &InspectArgs) -> Result<()> {
    let text = super::read_input(args.input.as_deref())?;
    let envelopes = decode_all(&text)?;

    info!(envelopes = envelopes.len(), "Inspecting audit envelopes");

    if envelopes.is_empty() {
        println!("No envelopes found");
        return Ok(());
    }

    for (i, envelope) in envelopes.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", render(i + 1, envelope)?);
    }

    Ok(())
}

/// Decodes every JSON document in `text`.
fn decode_all(text: &str) -> Result<Vec<Envelope>> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<serde_json::Value>()
        .enumerate()
        .map(|(i, doc)| {
            let doc = doc.with_context(|| format!("Envelope {} is not valid JSON", i + 1))?;
            decode_value(doc).with_context(|| format!("Failed to decode envelope {}", i + 1))
        })
        .collect()
}

/// Renders the summary of one envelope.
fn render(index: usize, envelope: &Envelope) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "Envelope {index}")?;
    writeln!(out, "  Generated: {}", envelope.generated_at().to_rfc3339())?;
    writeln!(out, "  Fields:    {}", envelope.record().len())?;
    writeln!(out, "  PII paths: {}", envelope.pii().len())?;

    for (path, ranges) in envelope.pii() {
        for range in ranges {
            writeln!(
                out,
                "    {path}  {}..{}  {}",
                range.begin(),
                range.end(),
                range.label()
            )?;
        }
    }

    Ok(out)
}
