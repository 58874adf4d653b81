use anyhow::{Context, Result};
use cantus_core::{store, SessionId, SessionLayout};
use cantus_etl::Config;

/// Open an existing session under the configured root.
pub fn open_session(config: &Config, session: &str) -> Result<SessionLayout> {
    let id: SessionId = session.parse()?;
    let layout = SessionLayout::open(&config.sessions_root, id)
        .with_context(|| format!("Failed to open session '{session}'"))?;
    Ok(layout)
}

pub fn new_session(config: &Config) -> Result<()> {
    let layout = SessionLayout::create(&config.sessions_root, SessionId::generate())
        .context("Failed to create session directory")?;
    log::info!("Created session {}", layout.dir().display());

    println!("{}", layout.id());
    Ok(())
}

pub fn restore_mapper(config: &Config, session: &str) -> Result<()> {
    let layout = open_session(config, session)?;
    store::restore_mapper(&layout).context("Failed to restore mapper")?;

    println!("✓ Restored {}", layout.mapper_path().display());
    Ok(())
}
