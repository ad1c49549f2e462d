use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use marshal48::json_host::{wrap_json, JsonHost};
use marshal48::marshal::encode as encode_stream;
use marshal48::project::from_host;
use marshal48::session::Session;

/// Read a JSON document and encode it as a Marshal 4.8 stream.
pub fn execute(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let text = fs::read_to_string(&input).with_context(|| format!("Failed to read file: {}", input.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse JSON: {}", input.display()))?;

    let host = JsonHost::new();
    let mut session = Session::new();
    let handle = wrap_json(json);
    let value = from_host(&handle, &mut session, &host).context("Failed to lift JSON document into a value")?;

    let mut bytes = Vec::new();
    encode_stream(value, &session, &mut bytes).context("Failed to encode marshal stream")?;

    let output_path = output.unwrap_or_else(|| input.with_extension("marshal"));
    fs::write(&output_path, bytes).with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    log::info!("Encoded {} -> {}", input.display(), output_path.display());
    Ok(())
}
