//! Batch ingestion of a session's dataset into feature stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cantus_core::model::{FeatureMatrix, Fingerprint};
use cantus_core::store::{self, AudioFeatureStore, ImageFeatureStore};
use cantus_core::{Error, ItemFailure, SessionLayout, WorkerPool};
use serde::Serialize;

use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::fingerprint::{FingerprintExtractor, DEFAULT_INTERVAL_BEATS, DEFAULT_STRIDE_BEATS};
use crate::imaging::{self, DEFAULT_IMAGE_SIZE};
use crate::melody::MelodyExtractor;
use crate::scan::{self, file_key, AssetKind};
use crate::transcribe::{midi_path_for, CommandTranscriber, Transcriber};

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Rebuild the image store even if `features.json` already exists.
    pub force_rebuild: bool,
    pub image_size: u32,
    pub interval_beats: u32,
    pub stride_beats: u32,
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            force_rebuild: false,
            image_size: DEFAULT_IMAGE_SIZE,
            interval_beats: DEFAULT_INTERVAL_BEATS,
            stride_beats: DEFAULT_STRIDE_BEATS,
            transcriber: None,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force_rebuild: false,
            image_size: config.image_size,
            interval_beats: config.interval_beats,
            stride_beats: config.stride_beats,
            transcriber: config
                .transcriber
                .as_deref()
                .map(|template| Arc::new(CommandTranscriber::new(template)) as Arc<dyn Transcriber>),
        }
    }

    #[must_use]
    pub fn with_force_rebuild(mut self, force_rebuild: bool) -> Self {
        self.force_rebuild = force_rebuild;
        self
    }
}

/// What an ingestion run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub images_indexed: usize,
    pub image_store_reused: bool,
    pub audio_indexed: usize,
    pub transcribed: usize,
    pub failures: Vec<ItemFailure>,
}

/// Build the feature stores of a session.
///
/// The image store is reused when present unless `force_rebuild` is set;
/// the audio store is always rebuilt. Unreadable files are reported in
/// [`IngestReport::failures`] and never abort the run.
pub fn ingest(
    layout: &SessionLayout,
    options: &IngestOptions,
    pool: &WorkerPool,
) -> IngestResult<IngestReport> {
    log::info!("Ingesting session {}", layout.id());
    let mut report = IngestReport::default();

    index_images(layout, options, pool, &mut report)?;
    transcribe_recordings(layout, options, pool, &mut report);
    index_audio(layout, options, pool, &mut report)?;

    log::info!(
        "Ingestion complete: {} images{}, {} melodies, {} transcribed, {} failures",
        report.images_indexed,
        if report.image_store_reused { " (reused)" } else { "" },
        report.audio_indexed,
        report.transcribed,
        report.failures.len()
    );
    Ok(report)
}

fn index_images(
    layout: &SessionLayout,
    options: &IngestOptions,
    pool: &WorkerPool,
    report: &mut IngestReport,
) -> IngestResult<()> {
    let store_path = layout.image_features_path();
    if store_path.is_file() && !options.force_rebuild {
        let existing = store::load_image_store(&store_path)?;
        log::info!(
            "Reusing image features from {} ({} images)",
            store_path.display(),
            existing.len()
        );
        report.images_indexed = existing.len();
        report.image_store_reused = true;
        return Ok(());
    }

    let paths = scan::scan(&layout.images_dir(), AssetKind::Image);
    let size = options.image_size;
    let batch = pool.map_isolated(
        &paths,
        |path| file_key(path),
        |path| {
            log::debug!("Reading image {}", path.display());
            imaging::load_pixels(path, size)
                .map(|pixels| (file_key(path), pixels))
                .map_err(|source| IngestError::Image {
                    path: path.clone(),
                    source,
                })
        },
    );
    report.failures.extend(batch.failures);

    let (filenames, rows): (Vec<String>, Vec<Vec<f64>>) = batch.succeeded.into_iter().unzip();
    let image_store = ImageFeatureStore::new(FeatureMatrix::from_rows(rows)?, filenames)?;
    store::save_image_store(&store_path, &image_store)?;

    report.images_indexed = image_store.len();
    log::info!(
        "Indexed {} images into {}",
        image_store.len(),
        store_path.display()
    );
    Ok(())
}

/// WAV files in the audio directory that have no MIDI sibling yet.
fn pending_recordings(audio_dir: &Path) -> Vec<PathBuf> {
    scan::scan(audio_dir, AssetKind::Wav)
        .into_iter()
        .filter(|wav| !midi_path_for(wav, audio_dir).exists())
        .collect()
}

fn transcribe_recordings(
    layout: &SessionLayout,
    options: &IngestOptions,
    pool: &WorkerPool,
    report: &mut IngestReport,
) {
    let audio_dir = layout.audio_dir();
    let pending = pending_recordings(&audio_dir);
    if pending.is_empty() {
        return;
    }

    let Some(transcriber) = options.transcriber.as_ref() else {
        for wav in &pending {
            let failure = ItemFailure {
                item: file_key(wav),
                error: Error::unreadable(wav, "no transcriber configured").to_string(),
            };
            log::warn!("{}", failure);
            report.failures.push(failure);
        }
        return;
    };

    log::info!("Transcribing {} recording(s)", pending.len());
    let batch = pool.map_isolated(
        &pending,
        |wav| file_key(wav),
        |wav| transcriber.transcribe(wav, &audio_dir),
    );
    report.transcribed = batch.succeeded.len();
    report.failures.extend(batch.failures);
}

fn index_audio(
    layout: &SessionLayout,
    options: &IngestOptions,
    pool: &WorkerPool,
    report: &mut IngestReport,
) -> IngestResult<()> {
    let paths = scan::scan(&layout.audio_dir(), AssetKind::Midi);
    let extractor = FingerprintExtractor::new(options.interval_beats, options.stride_beats);

    let batch = pool.map_isolated(
        &paths,
        |path| file_key(path),
        |path| {
            log::debug!("Fingerprinting {}", path.display());
            fingerprint_file(path, &extractor).map(|fp| (file_key(path), fp))
        },
    );
    report.failures.extend(batch.failures);

    let audio_store: AudioFeatureStore = batch.succeeded.into_iter().collect();
    let store_path = layout.audio_features_path();
    store::save_audio_store(&store_path, &audio_store)?;

    report.audio_indexed = audio_store.len();
    log::info!(
        "Indexed {} melodies into {}",
        audio_store.len(),
        store_path.display()
    );
    Ok(())
}

/// Extract the melody of a MIDI file and fingerprint it.
pub fn fingerprint_file(path: &Path, extractor: &FingerprintExtractor) -> IngestResult<Fingerprint> {
    let line = MelodyExtractor::new()
        .extract_file(path)
        .map_err(|source| IngestError::Melody {
            path: path.to_path_buf(),
            source,
        })?;
    extractor
        .fingerprint(&line)
        .map_err(|source| IngestError::Fingerprint {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::test_support::smf_bytes;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn layout(temp_dir: &TempDir) -> SessionLayout {
        SessionLayout::create(temp_dir.path(), "ingest-test".parse().unwrap()).unwrap()
    }

    fn write_melody(path: &Path, keys: &[u8]) {
        let mut notes = Vec::new();
        for &key in keys {
            notes.push((0, 0, key, 80, true));
            notes.push((96, 0, key, 64, false));
        }
        fs::write(path, smf_bytes(96, &[(Some("voice"), notes)], Some(500_000))).unwrap();
    }

    fn small_options() -> IngestOptions {
        IngestOptions {
            image_size: 8,
            ..IngestOptions::default()
        }
    }

    #[test]
    fn test_ingest_builds_both_stores() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        RgbImage::from_pixel(10, 10, Rgb([10, 20, 30]))
            .save(layout.images_dir().join("a.png"))
            .unwrap();
        RgbImage::from_pixel(12, 9, Rgb([200, 100, 0]))
            .save(layout.images_dir().join("b.png"))
            .unwrap();
        write_melody(&layout.audio_dir().join("a.mid"), &[60, 62, 64, 65]);

        let pool = WorkerPool::new(Some(2)).unwrap();
        let report = ingest(&layout, &small_options(), &pool).unwrap();

        assert_eq!(report.images_indexed, 2);
        assert!(!report.image_store_reused);
        assert_eq!(report.audio_indexed, 1);
        assert!(report.failures.is_empty());

        let images = store::load_image_store(&layout.image_features_path()).unwrap();
        assert_eq!(images.filenames, vec!["a.png", "b.png"]);
        assert_eq!(images.dataset.n_cols(), 64);

        let audio = store::load_audio_store(&layout.audio_features_path()).unwrap();
        assert!(!audio["a.mid"].is_empty());
    }

    #[test]
    fn test_image_store_is_reused_unless_forced() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save(layout.images_dir().join("a.png"))
            .unwrap();
        let pool = WorkerPool::new(Some(1)).unwrap();

        ingest(&layout, &small_options(), &pool).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save(layout.images_dir().join("b.png"))
            .unwrap();

        let reused = ingest(&layout, &small_options(), &pool).unwrap();
        assert!(reused.image_store_reused);
        assert_eq!(reused.images_indexed, 1);

        let rebuilt = ingest(&layout, &small_options().with_force_rebuild(true), &pool).unwrap();
        assert!(!rebuilt.image_store_reused);
        assert_eq!(rebuilt.images_indexed, 2);
    }

    #[test]
    fn test_bad_files_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        fs::write(layout.images_dir().join("broken.png"), b"nope").unwrap();
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .save(layout.images_dir().join("ok.png"))
            .unwrap();
        fs::write(layout.audio_dir().join("broken.mid"), b"nope").unwrap();
        write_melody(&layout.audio_dir().join("ok.mid"), &[67, 65, 64]);

        let pool = WorkerPool::new(Some(2)).unwrap();
        let report = ingest(&layout, &small_options(), &pool).unwrap();

        assert_eq!(report.images_indexed, 1);
        assert_eq!(report.audio_indexed, 1);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.item.as_str()).collect();
        assert!(failed.contains(&"broken.png"));
        assert!(failed.contains(&"broken.mid"));
    }

    #[test]
    fn test_wav_without_transcriber_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        fs::write(layout.audio_dir().join("hum.wav"), b"RIFF").unwrap();

        let pool = WorkerPool::new(Some(1)).unwrap();
        let report = ingest(&layout, &small_options(), &pool).unwrap();

        assert_eq!(report.transcribed, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "hum.wav");
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_transcriber_feeds_audio_store() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        let fixture_dir = TempDir::new().unwrap();
        let fixture = fixture_dir.path().join("fixture.mid");
        write_melody(&fixture, &[72, 69, 67, 64]);
        fs::write(layout.audio_dir().join("hum.wav"), b"RIFF").unwrap();

        let transcriber: Arc<dyn Transcriber> = Arc::new(CommandTranscriber::new(format!(
            "cp {} {{output}}",
            fixture.display()
        )));
        let options = IngestOptions {
            transcriber: Some(transcriber),
            ..small_options()
        };
        let pool = WorkerPool::new(Some(2)).unwrap();
        let report = ingest(&layout, &options, &pool).unwrap();

        assert_eq!(report.transcribed, 1);
        assert_eq!(report.audio_indexed, 1);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert!(layout.audio_dir().join("hum.mid").is_file());

        let audio = store::load_audio_store(&layout.audio_features_path()).unwrap();
        assert!(!audio["hum.mid"].is_empty());

        // The MIDI sibling now exists, so nothing is transcribed again.
        let again = ingest(&layout, &options, &pool).unwrap();
        assert_eq!(again.transcribed, 0);
        assert_eq!(again.audio_indexed, 1);
    }

    #[test]
    fn test_wav_with_midi_sibling_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout(&temp_dir);
        fs::write(layout.audio_dir().join("song.wav"), b"RIFF").unwrap();
        write_melody(&layout.audio_dir().join("song.mid"), &[60, 64]);

        assert!(pending_recordings(&layout.audio_dir()).is_empty());
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            transcriber: Some("tool {input} {output_dir}".to_string()),
            image_size: 32,
            ..Config::default()
        };
        let options = IngestOptions::from_config(&config);
        assert_eq!(options.image_size, 32);
        assert!(options.transcriber.is_some());
        assert!(!options.force_rebuild);
    }
}
