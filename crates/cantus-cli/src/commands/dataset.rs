use anyhow::{Context, Result};
use cantus_core::store;
use cantus_etl::Config;

use super::open_session;

pub fn show_dataset(config: &Config, session: &str) -> Result<()> {
    let layout = open_session(config, session)?;
    let entries = store::list_dataset(&layout).context("Failed to list dataset")?;
    log::debug!("{} complete dataset entries", entries.len());

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
