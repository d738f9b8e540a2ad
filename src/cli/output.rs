use crate::cli::{CommandOutput, OutputFormat};
use anyhow::Result;
use std::io::Write;

pub fn emit_output(output: &CommandOutput, format: OutputFormat, compact: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => handle.write_all(output.summary.as_bytes())?,
        OutputFormat::Json if compact => serde_json::to_writer(&mut handle, &output.payload)?,
        OutputFormat::Json => serde_json::to_writer_pretty(&mut handle, &output.payload)?,
    }
    handle.write_all(b"\n")?;
    Ok(())
}
