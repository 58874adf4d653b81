use anyhow::{Context, Result};
use cantus_core::WorkerPool;
use cantus_etl::{ingest, Config, IngestOptions};

use super::open_session;

pub fn run_ingest(config: &Config, session: &str, force: bool, pool: &WorkerPool) -> Result<()> {
    let layout = open_session(config, session)?;
    let options = IngestOptions::from_config(config).with_force_rebuild(force);

    log::info!(
        "Ingesting session {} on {} workers",
        layout.id(),
        pool.size()
    );
    let report = ingest(&layout, &options, pool).context("Ingestion failed")?;

    if report.image_store_reused {
        println!("  ✓ Image store reused ({} images)", report.images_indexed);
    } else {
        println!("  ✓ Indexed {} images", report.images_indexed);
    }
    if report.transcribed > 0 {
        println!("  ✓ Transcribed {} recordings", report.transcribed);
    }
    println!("  ✓ Fingerprinted {} melodies", report.audio_indexed);

    if !report.failures.is_empty() {
        eprintln!("\n  ✗ {} files skipped:", report.failures.len());
        for failure in &report.failures {
            eprintln!("    {}: {}", failure.item, failure.error);
        }
    }

    println!("\n✓ Ingestion complete");
    Ok(())
}
