use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::fingerprint::{DEFAULT_INTERVAL_BEATS, DEFAULT_STRIDE_BEATS};
use crate::imaging::DEFAULT_IMAGE_SIZE;

/// Configuration for cantus.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (CANTUS_* prefix)
/// 3. Config file (~/.config/cantus/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one sub-directory per session.
    ///
    /// Can be set via:
    /// - CLI: --root /path/to/sessions
    /// - ENV: CANTUS_SESSIONS_ROOT
    /// - Config: sessions_root = "/path/to/sessions"
    /// - Default: ~/.local/share/cantus/sessions
    #[serde(default = "default_sessions_root")]
    pub sessions_root: PathBuf,

    /// Side length images are resized to before flattening.
    #[serde(default = "default_image_size")]
    pub image_size: u32,

    /// Number of principal components kept for image search.
    #[serde(default = "default_n_components")]
    pub n_components: usize,

    /// How many image matches take part in result fusion.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Melody window length, in beats.
    #[serde(default = "default_interval_beats")]
    pub interval_beats: u32,

    /// Melody window stride, in beats.
    #[serde(default = "default_stride_beats")]
    pub stride_beats: u32,

    /// Seed for the random projection used by PCA.
    #[serde(default)]
    pub pca_seed: u64,

    /// Worker threads for batch work (default: one per hardware thread).
    #[serde(default)]
    pub workers: Option<usize>,

    /// External audio-to-MIDI command, with `{input}`, `{output_dir}` and
    /// `{output}` placeholders.
    ///
    /// Can be set via:
    /// - ENV: CANTUS_TRANSCRIBER
    /// - Config: transcriber = "basic-pitch {output_dir} {input}"
    #[serde(default)]
    pub transcriber: Option<String>,

    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sessions_root: default_sessions_root(),
            image_size: default_image_size(),
            n_components: default_n_components(),
            top_k: default_top_k(),
            interval_beats: default_interval_beats(),
            stride_beats: default_stride_beats(),
            pca_seed: 0,
            workers: None,
            transcriber: None,
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/cantus/config.toml
    /// Reads environment variables with CANTUS_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("cantus");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with a custom sessions root (the --root CLI flag).
    pub fn load_with_root(sessions_root: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(root) = sessions_root {
            config.sessions_root = root;
        }
        Ok(config)
    }
}

fn default_sessions_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cantus")
        .join("sessions")
}

const fn default_image_size() -> u32 {
    DEFAULT_IMAGE_SIZE
}

const fn default_n_components() -> usize {
    100
}

const fn default_top_k() -> usize {
    10
}

const fn default_interval_beats() -> u32 {
    DEFAULT_INTERVAL_BEATS
}

const fn default_stride_beats() -> u32 {
    DEFAULT_STRIDE_BEATS
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/cantus/config.toml
/// - macOS: ~/Library/Application Support/cantus/config.toml
/// - Windows: %APPDATA%\cantus\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cantus")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Cantus Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (CANTUS_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Directory holding one sub-directory per session
#
# Can also be set via:
# - CLI: cantus --root /custom/sessions query --session <id>
# - Environment: CANTUS_SESSIONS_ROOT=/custom/sessions
#sessions_root = "/path/to/sessions"

# Images are converted to grayscale and resized to image_size x image_size
image_size = 120

# Principal components kept for image search
n_components = 100

# Image matches that take part in result fusion
top_k = 10

# Melody windows, measured in beats (ticks per beat x beats)
interval_beats = 40
stride_beats = 4

# Seed for the random projection used by PCA
pca_seed = 0

# Worker threads for ingestion and ranking (default: all hardware threads)
#workers = 8

# External command that transcribes a WAV recording into a MIDI file.
# {input} is replaced by the WAV path, {output_dir} by the directory the
# .mid file must be written to and {output} by the full .mid path (named
# after the WAV file).
#transcriber = "basic-pitch {output_dir} {input}"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.sessions_root.as_os_str().is_empty());
        assert_eq!(config.image_size, 120);
        assert_eq!(config.n_components, 100);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.interval_beats, 40);
        assert_eq!(config.stride_beats, 4);
        assert!(config.transcriber.is_none());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_custom_root() {
        let custom_root = PathBuf::from("/tmp/cantus-sessions");
        let config = Config::load_with_root(Some(custom_root.clone())).unwrap();
        assert_eq!(config.sessions_root, custom_root);
    }
}
