//! Query front-end over a saved fact store.

use std::path::Path;

use clap::Subcommand;
use miette::Result;
use serde_json::{Value, json};

use songfacts_kb::{FactType, KbError, OrderedMap, QueryEngine};

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Show a registered song
    Song { id: String },

    /// Show one fact for a song (e.g. `tempo` or `has_tempo`)
    Fact { fact_type: String, id: String },

    /// Songs with a genre
    Genre { label: String },

    /// Songs with a mood
    Mood { label: String },

    /// Songs with a danceability label
    Danceable { label: String },

    /// Songs with a voice/instrumental label
    VoiceInstrumental { label: String },

    /// Songs with a timbre label
    Timbre { label: String },

    /// Songs in a tempo bucket such as `120-130`
    Tempo { bucket: String },

    /// Songs whose loudness (dB) lies within an inclusive range
    Loudness {
        #[arg(long, allow_negative_numbers = true)]
        min: f64,
        #[arg(long, allow_negative_numbers = true)]
        max: f64,
    },

    /// Every known genre
    Genres,

    /// Every known mood
    Moods,

    /// Every registered song id
    Songs,

    /// Resolve a title (and optionally artist) to the best matching song id
    Resolve {
        track: String,
        #[arg(long)]
        artist: Option<String>,
    },

    /// All song ids matching a title (and optionally artist)
    Find {
        track: String,
        #[arg(long)]
        artist: Option<String>,
    },

    /// Song and fact counts
    Stats,
}

/// Load the store, answer one query and print the result as JSON.
pub fn run(kb: &Path, command: QueryCommand) -> Result<()> {
    let engine = QueryEngine::load(kb).map_err(|e| miette::miette!("{}", e))?;
    let answer = answer(&engine, command).map_err(|e| miette::miette!("{}", e))?;
    let text = serde_json::to_string_pretty(&answer).map_err(|e| miette::miette!("{}", e))?;
    println!("{}", text);
    Ok(())
}

fn answer(engine: &QueryEngine, command: QueryCommand) -> Result<Value, KbError> {
    let value = match command {
        QueryCommand::Song { id } => serde_json::to_value(engine.get_song(&id))?,
        QueryCommand::Fact { fact_type, id } => {
            let name = fact_type
                .parse::<FactType>()
                .map(|t| t.as_str().to_string())
                .unwrap_or(fact_type);
            serde_json::to_value(engine.get_fact(&name, &id))?
        }
        QueryCommand::Genre { label } => json!(engine.songs_by_genre(&label)),
        QueryCommand::Mood { label } => json!(engine.songs_by_mood(&label)),
        QueryCommand::Danceable { label } => json!(engine.songs_by_danceable(&label)),
        QueryCommand::VoiceInstrumental { label } => {
            json!(engine.songs_by_voice_instrumental(&label))
        }
        QueryCommand::Timbre { label } => json!(engine.songs_by_timbre(&label)),
        QueryCommand::Tempo { bucket } => json!(engine.songs_by_tempo_range(&bucket)),
        QueryCommand::Loudness { min, max } => json!(engine.songs_in_loudness_range(min, max)),
        QueryCommand::Genres => json!(engine.get_all_genres()),
        QueryCommand::Moods => json!(engine.get_all_moods()),
        QueryCommand::Songs => json!(engine.get_all_songs()),
        QueryCommand::Resolve { track, artist } => {
            json!(engine.resolve_identifier_by_name(&track, artist.as_deref())?)
        }
        QueryCommand::Find { track, artist } => {
            json!(engine.find_all_identifiers_by_name(&track, artist.as_deref()))
        }
        QueryCommand::Stats => {
            let facts: OrderedMap<usize> = engine.fact_counts().into_iter().collect();
            json!({
                "songs": engine.song_count(),
                "facts": facts,
                "genres": engine.get_all_genres().len(),
                "moods": engine.get_all_moods().len(),
            })
        }
    };
    Ok(value)
}
