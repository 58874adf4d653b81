use anyhow::Result;
use cantus_core::WorkerPool;
use cantus_etl::Config;
use clap::Parser;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cantus", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the sessions (default: ~/.local/share/cantus/sessions)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    #[command(flatten)]
    Work(WorkCommand),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Commands that need a loaded configuration and logging.
#[derive(Debug, clap::Subcommand)]
enum WorkCommand {
    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Build the feature stores of a session
    ///
    /// Images in `images/` are converted to grayscale, resized and flattened
    /// into `features.json`. That store is reused on later runs unless
    /// `--force` is given.
    ///
    /// Every MIDI file in `audio/` is reduced to its melody line and
    /// fingerprinted into `audio_features.json`; this store is rebuilt on
    /// every run. WAV recordings without a matching `.mid` are transcribed
    /// first when a transcriber is configured.
    ///
    /// Files that cannot be read are reported and skipped.
    Ingest {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// Rebuild the image store even if it already exists
        #[arg(long)]
        force: bool,
    },
    /// Run the query inputs of a session
    ///
    /// Uses `query/image/input.png` and/or `query/audio/input.mid`. Image
    /// and melody rankings are fused through `mapper.json`; the result
    /// replaces `mapper.json` (the original is kept in `copy_mapper.json`)
    /// and is printed as JSON.
    Query {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// Keep the query input files after the run
        #[arg(long)]
        keep_query: bool,
    },
    /// Put the original mapper back after queries
    Restore {
        /// Session identifier
        #[arg(long)]
        session: String,
    },
    /// List mapper entries whose image and audio files are both present
    Dataset {
        /// Session identifier
        #[arg(long)]
        session: String,
    },
    /// Transcribe one WAV recording to MIDI with the configured command
    Transcribe {
        /// WAV file to transcribe
        #[arg(long)]
        input: PathBuf,

        /// Directory the MIDI file is written to
        #[arg(long)]
        output_dir: PathBuf,
    },
}

#[derive(Debug, clap::Subcommand)]
enum SessionAction {
    /// Create a new session with a random identifier
    New,
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
    /// Print one config value, or the whole file without a key
    Get {
        key: Option<String>,
    },
}

fn init_logging(config: &Config) -> Result<()> {
    twyg::setup(config.logging.clone())
        .map_err(|error| anyhow::anyhow!("Could not set up logging: {error:?}"))?;
    Ok(())
}

fn run_config(action: ConfigAction, root: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => commands::config::show_config(root),
        ConfigAction::Path => commands::config::show_path(),
        ConfigAction::Example => commands::config::show_example(),
        ConfigAction::Init => commands::config::init_config(),
        ConfigAction::Get { key } => commands::config::get_config(key, root),
    }
}

fn run(command: WorkCommand, root: Option<PathBuf>) -> Result<()> {
    let config = Config::load_with_root(root)?;
    init_logging(&config)?;

    match command {
        WorkCommand::Session {
            action: SessionAction::New,
        } => {
            commands::new_session(&config)?;
        }
        WorkCommand::Ingest { session, force } => {
            let pool = WorkerPool::new(config.workers)?;
            commands::run_ingest(&config, &session, force, &pool)?;
        }
        WorkCommand::Query {
            session,
            keep_query,
        } => {
            let pool = WorkerPool::new(config.workers)?;
            commands::run_query(&config, &session, keep_query, &pool)?;
        }
        WorkCommand::Restore { session } => {
            commands::restore_mapper(&config, &session)?;
        }
        WorkCommand::Dataset { session } => {
            commands::show_dataset(&config, &session)?;
        }
        WorkCommand::Transcribe { input, output_dir } => {
            commands::run_transcribe(&config, &input, &output_dir)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the config file does not parse.
    match cli.command {
        Commands::Config { action } => run_config(action, cli.root),
        Commands::Work(command) => run(command, cli.root),
    }
}
