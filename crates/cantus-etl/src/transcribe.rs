//! Audio-to-MIDI transcription through an external tool.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{IngestError, IngestResult};

/// Converts a WAV recording into a MIDI file.
pub trait Transcriber: Send + Sync + fmt::Debug {
    /// Transcribe `wav` into `output_dir`, returning the path of the
    /// written `.mid` file (named after the WAV file's stem).
    fn transcribe(&self, wav: &Path, output_dir: &Path) -> IngestResult<PathBuf>;
}

/// Where the MIDI transcription of `wav` lands inside `output_dir`.
pub fn midi_path_for(wav: &Path, output_dir: &Path) -> PathBuf {
    let stem = wav
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}.mid"))
}

/// Runs a shell-free command line built from a template.
///
/// The template is split on whitespace and the placeholders `{input}`,
/// `{output_dir}` and `{output}` are substituted in each argument.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    template: String,
}

impl CommandTranscriber {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn command_line(&self, wav: &Path, output_dir: &Path, output: &Path) -> Vec<String> {
        let input = wav.to_string_lossy();
        let dir = output_dir.to_string_lossy();
        let out = output.to_string_lossy();
        self.template
            .split_whitespace()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output_dir}", &dir)
                    .replace("{output}", &out)
            })
            .collect()
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, wav: &Path, output_dir: &Path) -> IngestResult<PathBuf> {
        let failed = |message: String| IngestError::Transcription {
            path: wav.to_path_buf(),
            message,
        };

        std::fs::create_dir_all(output_dir).map_err(|e| failed(e.to_string()))?;
        let midi_path = midi_path_for(wav, output_dir);

        let args = self.command_line(wav, output_dir, &midi_path);
        let Some((program, rest)) = args.split_first() else {
            return Err(failed("transcriber command is empty".to_string()));
        };

        log::debug!("Transcribing {} with {}", wav.display(), program);
        let output = Command::new(program)
            .args(rest)
            .output()
            .map_err(|e| failed(format!("could not run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if !midi_path.is_file() {
            return Err(failed(format!(
                "{program} did not produce {}",
                midi_path.display()
            )));
        }

        log::info!("Transcribed {} -> {}", wav.display(), midi_path.display());
        Ok(midi_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_midi_path_for() {
        assert_eq!(
            midi_path_for(Path::new("/data/take 1.wav"), Path::new("/out")),
            PathBuf::from("/out/take 1.mid")
        );
    }

    #[test]
    fn test_command_line_substitution() {
        let transcriber = CommandTranscriber::new("tool --out={output_dir} {input}");
        let args = transcriber.command_line(
            Path::new("/a/b.wav"),
            Path::new("/c"),
            Path::new("/c/b.mid"),
        );
        assert_eq!(args, vec!["tool", "--out=/c", "/a/b.wav"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_transcriber_runs_tool() {
        let temp_dir = TempDir::new().unwrap();
        let wav = temp_dir.path().join("hum.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let transcriber = CommandTranscriber::new("cp {input} {output}");
        let midi = transcriber.transcribe(&wav, temp_dir.path()).unwrap();
        assert_eq!(midi, temp_dir.path().join("hum.mid"));
        assert!(midi.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_transcriber_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let wav = temp_dir.path().join("hum.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let err = CommandTranscriber::new("false")
            .transcribe(&wav, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, IngestError::Transcription { .. }));

        // Succeeds but writes nothing
        let err = CommandTranscriber::new("true")
            .transcribe(&wav, temp_dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("did not produce"));
    }

    #[test]
    fn test_empty_template() {
        let temp_dir = TempDir::new().unwrap();
        let err = CommandTranscriber::new("   ")
            .transcribe(Path::new("x.wav"), temp_dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
