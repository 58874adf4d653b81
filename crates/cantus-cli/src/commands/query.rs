use anyhow::{Context, Result};
use cantus_core::WorkerPool;
use cantus_etl::Config;
use cantus_search::QueryOptions;

use super::open_session;

pub fn run_query(config: &Config, session: &str, keep_query: bool, pool: &WorkerPool) -> Result<()> {
    let layout = open_session(config, session)?;
    let options = QueryOptions {
        keep_query,
        ..QueryOptions::from_config(config)
    };

    let outcome = cantus_search::run_query(&layout, &options, pool).context("Query failed")?;

    for failure in &outcome.failures {
        log::warn!("Could not score {}: {}", failure.item, failure.error);
    }

    println!("{}", serde_json::to_string_pretty(&outcome.results)?);
    eprintln!(
        "Total estimated time: {:.2}",
        outcome.elapsed.as_secs_f64()
    );
    Ok(())
}
