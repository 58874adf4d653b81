use anyhow::{Context, Result};
use cantus_etl::{config, Config};
use std::path::PathBuf;

const VALID_KEYS: &str = "sessions_root, image_size, n_components, top_k, interval_beats, \
                          stride_beats, pca_seed, workers, transcriber";

/// Show the current effective configuration.
pub fn show_config(root: Option<PathBuf>) -> Result<()> {
    let config = Config::load_with_root(root)?;

    println!("Current Configuration");
    println!("=====================\n");

    let config_path = config::config_file_path();
    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    for key in VALID_KEYS.split(", ") {
        println!("  {key}: {}", value_of(&config, key).unwrap_or_default());
    }
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (CANTUS_*) > Config file > Defaults");

    Ok(())
}

fn value_of(config: &Config, key: &str) -> Option<String> {
    let value = match key {
        "sessions_root" => config.sessions_root.display().to_string(),
        "image_size" => config.image_size.to_string(),
        "n_components" => config.n_components.to_string(),
        "top_k" => config.top_k.to_string(),
        "interval_beats" => config.interval_beats.to_string(),
        "stride_beats" => config.stride_beats.to_string(),
        "pca_seed" => config.pca_seed.to_string(),
        "workers" => config
            .workers
            .map_or_else(|| String::from("<all threads>"), |n| n.to_string()),
        "transcriber" => config
            .transcriber
            .clone()
            .unwrap_or_else(|| String::from("<not set>")),
        _ => return None,
    };
    Some(value)
}

/// Get a specific config value.
pub fn get_config(key: Option<String>, root: Option<PathBuf>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load_with_root(root)?;
        let Some(value) = value_of(&config, &key) else {
            anyhow::bail!("Unknown config key: {key}\n\nValid keys: {VALID_KEYS}");
        };
        println!("{value}");
    } else {
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'cantus config init' to create it.");
        }
    }

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure cantus.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
