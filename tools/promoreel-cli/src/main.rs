//! Promoreel CLI: command-line interface for rendering promotional videos.
//!
//! Usage:
//!   promoreel init                 Write a config and create the storage layout
//!   promoreel render [OPTIONS]     Create a job and render it
//!   promoreel submit [OPTIONS]     Store a pending job for `queue`
//!   promoreel plan [OPTIONS]       Print the render plan without encoding
//!   promoreel queue                Render every pending job on a worker pool
//!   promoreel status [ID]          Show one job or the most recent jobs
//!   promoreel retry <ID>           Start a job over as a new pending job
//!   promoreel delete <ID>          Remove a job and its files
//!   promoreel stale                Report jobs stuck in processing
//!   promoreel templates [ID]       List style templates or show one
//!   promoreel check                Check encoder and storage setup

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use promoreel_common::config::{config_file_path, AppConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "promoreel",
    about = "Template-driven promotional video renderer",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep config, storage, outputs and job records under this directory
    #[arg(long, global = true, conflicts_with = "config")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Job options shared by `render`, `submit` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Read the template id and options from a JSON job file instead of flags
    #[arg(long)]
    from: Option<PathBuf>,

    /// Style template id
    #[arg(short, long, default_value = "luxury")]
    template: String,

    /// Headline shown on the caption and end card
    #[arg(long)]
    title: Option<String>,

    /// Second end card line
    #[arg(long)]
    subtitle: Option<String>,

    /// Location line on the end card
    #[arg(long)]
    location: Option<String>,

    /// Media id from the asset manifest (repeatable)
    #[arg(long = "media-id")]
    media_ids: Vec<u64>,

    /// Media path, relative to the storage root or absolute (repeatable)
    #[arg(short, long = "media")]
    media_paths: Vec<String>,

    /// Voiceover file
    #[arg(long)]
    voiceover: Option<String>,

    /// Theme for generated images when no media is given
    #[arg(long)]
    theme: Option<String>,

    /// Also render a square variant
    #[arg(long)]
    bundle: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the storage directories
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a render job and render it now
    Render {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Store a pending render job for a later `queue` run
    Submit {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Print the render plan for a job without encoding
    Plan {
        #[command(flatten)]
        job: JobArgs,

        /// Print the encoder command line instead of the plan
        #[arg(long)]
        args: bool,
    },

    /// Render every pending job in the job store
    Queue {
        /// Number of concurrent render workers
        #[arg(short, long, default_value = "2")]
        workers: usize,
    },

    /// Show a job, or list the most recent jobs
    Status {
        /// Job id
        id: Option<String>,

        /// Print the full JSON record
        #[arg(long)]
        json: bool,

        /// Number of jobs to list, newest first
        #[arg(short, long, default_value_t = commands::status::DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Start a job over as a new pending job with the same options
    Retry {
        /// Job id
        id: String,

        /// Render the new job immediately instead of leaving it for `queue`
        #[arg(long)]
        now: bool,
    },

    /// Remove a job record with its video, thumbnail and debug report
    Delete {
        /// Job id
        id: String,
    },

    /// Report jobs that have been processing for too long
    Stale {
        /// Age in minutes after which a processing job is stale
        #[arg(long, default_value = "30")]
        max_age_mins: i64,
    },

    /// List the style templates, or show one
    Templates {
        /// Template id
        id: Option<String>,
    },

    /// Check encoder and storage setup
    Check,
}

fn config_path(cli: &Cli) -> PathBuf {
    match (&cli.root, &cli.config) {
        (Some(root), _) => root.join("config.json"),
        (None, Some(path)) => path.clone(),
        (None, None) => config_file_path(),
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    let path = config_path(cli);
    match &cli.root {
        Some(root) if !path.exists() => AppConfig::rooted_at(root),
        _ => AppConfig::load_from(&path),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);
    let config_path = config_path(&cli);

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    promoreel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { force } => commands::init::run(config, &config_path, force),
        Commands::Render { job } => commands::render::run(config, job),
        Commands::Submit { job } => commands::submit::run(config, job),
        Commands::Plan { job, args } => commands::plan::run(config, job, args),
        Commands::Queue { workers } => commands::queue::run(config, workers).await,
        Commands::Status { id, json, limit } => commands::status::run(config, id, json, limit),
        Commands::Retry { id, now } => commands::retry::run(config, id, now),
        Commands::Delete { id } => commands::delete::run(config, id),
        Commands::Stale { max_age_mins } => commands::stale::run(config, max_age_mins),
        Commands::Templates { id } => commands::templates::run(id),
        Commands::Check => commands::check::run(config),
    }
}
