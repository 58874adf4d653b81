use anyhow::{Context, Result};
use cantus_etl::{CommandTranscriber, Config, Transcriber};
use std::path::Path;

pub fn run_transcribe(config: &Config, input: &Path, output_dir: &Path) -> Result<()> {
    let Some(template) = config.transcriber.as_deref() else {
        anyhow::bail!(
            "No transcriber configured\n\nSet `transcriber` in the config file or CANTUS_TRANSCRIBER."
        );
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let midi = CommandTranscriber::new(template)
        .transcribe(input, output_dir)
        .with_context(|| format!("Failed to transcribe {}", input.display()))?;

    println!("✓ Wrote {}", midi.display());
    Ok(())
}
