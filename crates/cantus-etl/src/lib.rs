//! Dataset ingestion and feature extraction for cantus.
//!
//! Turns a session's raw assets into feature stores: images become
//! flattened grayscale rows, MIDI tracks become monophonic melodies and then
//! per-window interval-histogram fingerprints. WAV recordings are first
//! handed to an external transcriber.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod imaging;
pub mod ingest;
pub mod melody;
pub mod scan;
pub mod score;
pub mod transcribe;

pub use config::Config;
pub use error::{FingerprintError, IngestError, MelodyError};
pub use fingerprint::{FingerprintExtractor, Window, WindowSpec};
pub use ingest::{ingest, IngestOptions, IngestReport};
pub use melody::{MelodyExtractor, MelodyLine};
pub use score::{Score, ScoreTrack};
pub use transcribe::{CommandTranscriber, Transcriber};
