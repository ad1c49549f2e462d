use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use marshal48::json_host::JsonHost;
use marshal48::project::Projector;
use marshal48::repr::represent;
use marshal48::session::Session;
use marshal48::unmarshal::decode as decode_stream;

/// Decode a Marshal 4.8 file and write its JSON projection.
pub fn execute(input: PathBuf, output: Option<PathBuf>, pretty: bool) -> Result<()> {
    let bytes = fs::read(&input).with_context(|| format!("Failed to read file: {}", input.display()))?;

    let mut session = Session::new();
    let value = decode_stream(&bytes[..], &mut session)
        .with_context(|| format!("Failed to decode marshal stream: {}", input.display()))?;

    let mut host = JsonHost::new();
    let mut projector = Projector::new();
    let handle = projector
        .to_host(value, &session, &mut host)
        .context("Failed to project decoded value onto the JSON host")?;
    let json = handle.borrow().clone();

    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .context("Failed to serialize JSON output")?;

    let output_path = output.unwrap_or_else(|| input.with_extension("json"));
    fs::write(&output_path, text).with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    log::info!("Decoded {} -> {}", input.display(), output_path.display());
    Ok(())
}

/// Decode a Marshal 4.8 file and print its bounded textual representation.
pub fn execute_repr(input: PathBuf) -> Result<()> {
    let bytes = fs::read(&input).with_context(|| format!("Failed to read file: {}", input.display()))?;

    let mut session = Session::new();
    let value = decode_stream(&bytes[..], &mut session)
        .with_context(|| format!("Failed to decode marshal stream: {}", input.display()))?;

    let rendered = represent(value, &session).context("Failed to render representation")?;
    println!("{}", rendered.text);
    if rendered.saw_cycle {
        log::warn!("representation truncated a self-referential cycle with an @<id> back-reference");
    }
    Ok(())
}
