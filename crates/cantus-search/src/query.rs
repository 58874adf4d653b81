//! One retrieval run over a session: rank, fuse, persist.

use std::path::Path;
use std::time::{Duration, Instant};

use cantus_core::model::MapperEntry;
use cantus_core::store;
use cantus_core::{ItemFailure, SessionLayout, WorkerPool};
use cantus_etl::fingerprint::{DEFAULT_INTERVAL_BEATS, DEFAULT_STRIDE_BEATS};
use cantus_etl::imaging::{self, DEFAULT_IMAGE_SIZE};
use cantus_etl::ingest::fingerprint_file;
use cantus_etl::{Config, FingerprintExtractor, IngestError};
use serde::Serialize;

use crate::audio_retriever::{AudioMatch, AudioRanking, AudioRetriever};
use crate::error::{PcaError, Result, SearchError};
use crate::fusion::{ResultFusion, DEFAULT_TOP_K};
use crate::image_retriever::{ImageMatch, ImageRetriever};
use crate::pca::PcaEngine;

/// Default number of principal components for image search.
pub const DEFAULT_COMPONENTS: usize = 100;

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub n_components: usize,
    pub top_k: usize,
    pub image_size: u32,
    pub interval_beats: u32,
    pub stride_beats: u32,
    pub pca_seed: u64,
    /// Leave the query input files in place after the run.
    pub keep_query: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_COMPONENTS,
            top_k: DEFAULT_TOP_K,
            image_size: DEFAULT_IMAGE_SIZE,
            interval_beats: DEFAULT_INTERVAL_BEATS,
            stride_beats: DEFAULT_STRIDE_BEATS,
            pca_seed: 0,
            keep_query: false,
        }
    }
}

impl QueryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            n_components: config.n_components,
            top_k: config.top_k,
            image_size: config.image_size,
            interval_beats: config.interval_beats,
            stride_beats: config.stride_beats,
            pca_seed: config.pca_seed,
            keep_query: false,
        }
    }
}

/// Everything a query run produced.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// The fused ranking, also written back to `mapper.json`.
    pub results: Vec<MapperEntry>,
    pub image_matches: Option<Vec<ImageMatch>>,
    pub audio_matches: Option<Vec<AudioMatch>>,
    /// Dataset melodies that could not be scored.
    pub failures: Vec<ItemFailure>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Run the query inputs of a session against its feature stores.
///
/// The pristine mapper is backed up before `mapper.json` is overwritten
/// with the fused results, and the elapsed time is written to `time.txt`.
pub fn run_query(
    layout: &SessionLayout,
    options: &QueryOptions,
    pool: &WorkerPool,
) -> Result<QueryOutcome> {
    let start = Instant::now();

    let image_query = layout.query_image_path();
    let audio_query = layout.query_audio_path();
    let has_image = image_query.is_file();
    let has_audio = audio_query.is_file();
    if !has_image && !has_audio {
        return Err(SearchError::EmptyQuery);
    }
    log::info!(
        "Querying session {} (image: {}, audio: {})",
        layout.id(),
        has_image,
        has_audio
    );

    let mapper = store::load_source_mapper(layout)?;
    if store::backup_mapper(layout)? {
        log::debug!("Saved pristine mapper to {}", layout.mapper_backup_path().display());
    }

    let image_matches = if has_image {
        query_images(layout, &image_query, options)?
    } else {
        None
    };

    let mut failures = Vec::new();
    let audio_matches = if has_audio {
        let ranking = query_audio(layout, &audio_query, options, pool)?;
        failures = ranking.failures;
        Some(ranking.matches)
    } else {
        None
    };

    let results = ResultFusion::new(&mapper, options.top_k)
        .fuse(image_matches.as_deref(), audio_matches.as_deref());
    store::save_mapper(&layout.mapper_path(), &results)?;

    if !options.keep_query {
        layout.clear_query_inputs()?;
    }

    let elapsed = start.elapsed();
    write_time_report(layout, elapsed)?;
    log::info!(
        "Query produced {} results in {:.2}s",
        results.len(),
        elapsed.as_secs_f64()
    );

    Ok(QueryOutcome {
        results,
        image_matches,
        audio_matches,
        failures,
        elapsed,
    })
}

/// `None` when the dataset images cannot support a PCA basis (no images,
/// or no variance between them); the query then falls back to audio only.
fn query_images(
    layout: &SessionLayout,
    input: &Path,
    options: &QueryOptions,
) -> Result<Option<Vec<ImageMatch>>> {
    let store_path = layout.image_features_path();
    if !store_path.is_file() {
        return Err(SearchError::MissingFeatures(store_path));
    }
    let image_store = store::load_image_store(&store_path)?;
    if image_store.is_empty() {
        log::warn!("Session has no indexed images; skipping image search");
        return Ok(None);
    }

    let engine = PcaEngine::new(options.pca_seed);
    let retriever = match ImageRetriever::build(&image_store, options.n_components, &engine) {
        Ok(retriever) => retriever,
        Err(error @ (PcaError::DegenerateInput | PcaError::DimensionMismatch { .. })) => {
            log::warn!(
                "Skipping image search over {} images: {}",
                image_store.len(),
                error
            );
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };
    let pixels = imaging::load_pixels(input, options.image_size).map_err(|source| {
        IngestError::Image {
            path: input.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(retriever.query(&pixels)?))
}

fn query_audio(
    layout: &SessionLayout,
    input: &Path,
    options: &QueryOptions,
    pool: &WorkerPool,
) -> Result<AudioRanking> {
    let store_path = layout.audio_features_path();
    if !store_path.is_file() {
        return Err(SearchError::MissingFeatures(store_path));
    }
    let audio_store = store::load_audio_store(&store_path)?;

    let extractor = FingerprintExtractor::new(options.interval_beats, options.stride_beats);
    let fingerprint = fingerprint_file(input, &extractor)?;
    AudioRetriever::new(pool).rank(&fingerprint, &audio_store)
}

/// Render an elapsed time the way `time.txt` stores it.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("Total estimated time: {:.2}\n", elapsed.as_secs_f64())
}

pub fn write_time_report(layout: &SessionLayout, elapsed: Duration) -> Result<()> {
    std::fs::write(layout.time_report_path(), format_elapsed(elapsed))
        .map_err(cantus_core::Error::from)?;
    Ok(())
}
