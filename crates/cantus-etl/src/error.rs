//! Error types for feature extraction and ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a score and linearizing its melody.
#[derive(Debug, Error)]
pub enum MelodyError {
    /// The file could not be parsed as a standard MIDI file.
    #[error("MIDI parse error: {0}")]
    Parse(String),

    /// The file uses SMPTE timecode instead of ticks per beat.
    #[error("unsupported timing: only metrical (ticks per beat) MIDI is supported")]
    UnsupportedTiming,

    /// No track carries any note events.
    #[error("no track contains note events")]
    NoMelodyTrack,

    /// No tempo event was found; callers fall back to a default tempo.
    #[error("no tempo event found")]
    MissingTempo,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while windowing a melody and building histograms.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// A window holds no events and cannot be histogrammed.
    #[error("window contains no events")]
    EmptyWindow,

    /// Window length or stride is unusable.
    #[error("invalid window: interval {interval} ticks, stride {stride} ticks")]
    InvalidWindow { interval: u64, stride: u64 },

    #[error("histogram error: {0}")]
    Histogram(#[from] cantus_core::Error),
}

/// Errors raised while ingesting one dataset asset.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{}: {source}", path.display())]
    Melody {
        path: PathBuf,
        #[source]
        source: MelodyError,
    },

    #[error("{}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: FingerprintError,
    },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("transcription of {} failed: {message}", path.display())]
    Transcription { path: PathBuf, message: String },

    #[error(transparent)]
    Core(#[from] cantus_core::Error),
}

impl IngestError {
    /// The asset this error is about, if it concerns a single file.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Melody { path, .. }
            | Self::Fingerprint { path, .. }
            | Self::Image { path, .. }
            | Self::Transcription { path, .. } => Some(path),
            Self::Core(_) => None,
        }
    }
}

pub type MelodyResult<T> = std::result::Result<T, MelodyError>;
pub type FingerprintResult<T> = std::result::Result<T, FingerprintError>;
pub type IngestResult<T> = std::result::Result<T, IngestError>;
