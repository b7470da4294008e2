//! songfacts: song fact store builder and query tool
//!
//! Main binary with subcommands:
//! - `build-dump`: Build a fact store from an AcousticBrainz dump directory
//! - `collect`: Fetch song data from MusicBrainz and AcousticBrainz
//! - `build`: Build a fact store from collected song records
//! - `query`: Query a fact store

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod build;
mod collect;
mod query;

#[derive(Parser)]
#[command(name = "songfacts")]
#[command(about = "Song fact store builder and query tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fact store from an on-disk AcousticBrainz dump
    BuildDump {
        /// Root directory of the dump
        #[arg(env = "SONGFACTS_DUMP_ROOT")]
        dump_root: PathBuf,

        /// Where to write the fact store
        #[arg(long, env = "SONGFACTS_KB_PATH", default_value = "data/knowledge_base.json")]
        output: PathBuf,

        /// Process only the first N recordings
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Resolve songs on MusicBrainz and fetch their AcousticBrainz features
    Collect {
        /// JSON array of {"artist", "track", ...} objects
        #[arg(long, env = "SONGFACTS_SONG_LIST", default_value = "data/song_list_flat.json")]
        song_list: PathBuf,

        /// Where to write the collected records
        #[arg(long, env = "SONGFACTS_RAW_SONGS", default_value = "data/raw_songs.json")]
        output: PathBuf,

        /// Process only the first N songs
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        network: collect::NetworkArgs,
    },

    /// Build a fact store from collected song records
    Build {
        /// JSON array of song records
        #[arg(long, env = "SONGFACTS_RAW_SONGS", default_value = "data/raw_songs.json")]
        input: PathBuf,

        /// Where to write the fact store
        #[arg(long, env = "SONGFACTS_KB_PATH", default_value = "data/knowledge_base.json")]
        output: PathBuf,
    },

    /// Query a fact store (results are printed as JSON)
    Query {
        /// Fact store to load
        #[arg(long, env = "SONGFACTS_KB_PATH", default_value = "data/knowledge_base.json")]
        kb: PathBuf,

        #[command(subcommand)]
        command: query::QueryCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "songfacts=info,songfacts_kb=info,songfacts_brainz=info".to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::BuildDump {
            dump_root,
            output,
            limit,
        } => build::run_dump(&dump_root, &output, limit),

        Commands::Collect {
            song_list,
            output,
            limit,
            network,
        } => collect::run(&song_list, &output, limit, &network).await,

        Commands::Build { input, output } => build::run_records(&input, &output),

        Commands::Query { kb, command } => query::run(&kb, command),
    }
}
