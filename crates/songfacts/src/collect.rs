//! API collection pipeline: song list -> MusicBrainz ids -> features and credits.

use std::path::Path;
use std::time::Duration;

use clap::Args;
use miette::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use songfacts_brainz::{
    ACOUSTICBRAINZ_URL, AcousticBrainzClient, AcousticFeatures, ClientConfig, DEFAULT_USER_AGENT,
    MUSICBRAINZ_URL, MusicBrainzClient, RecordingDetails,
};
use songfacts_kb::{
    AnalysisDocument, AnalysisShape, AudioFeatures, SongRecord, normalize_recording,
};

const PROGRESS_INTERVAL: usize = 10;

/// Fields written by the pipeline; input fields with these names are replaced.
const COLLECTED_FIELDS: &[&str] = &[
    "artist",
    "track",
    "mbid",
    "audio_features",
    "genres",
    "danceable",
    "voice_instrumental",
    "timbre",
    "moods",
    "credits",
    "language",
    "collection_status",
];

/// Network settings shared by both API clients.
#[derive(Debug, Args)]
pub struct NetworkArgs {
    /// MusicBrainz base URL
    #[arg(long, env = "SONGFACTS_MUSICBRAINZ_URL", default_value = MUSICBRAINZ_URL)]
    musicbrainz_url: String,

    /// AcousticBrainz base URL
    #[arg(long, env = "SONGFACTS_ACOUSTICBRAINZ_URL", default_value = ACOUSTICBRAINZ_URL)]
    acousticbrainz_url: String,

    /// User-Agent sent to both services
    #[arg(long, env = "SONGFACTS_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Attempts per request, including the first
    #[arg(long, env = "SONGFACTS_MAX_ATTEMPTS", default_value = "3")]
    max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "SONGFACTS_RETRY_BACKOFF_MS", default_value = "2000")]
    retry_backoff_ms: u64,
}

impl NetworkArgs {
    fn apply(&self, config: ClientConfig, base_url: &str) -> ClientConfig {
        config
            .with_base_url(base_url)
            .with_user_agent(self.user_agent.clone())
            .with_max_attempts(self.max_attempts)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }
}

/// One entry of the input song list.
#[derive(Debug, Deserialize)]
struct SongListEntry {
    artist: Option<String>,
    track: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CollectionStatus {
    Complete,
    Partial,
    Failed,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct Credits {
    main_artist: String,
    featured_artists: Vec<String>,
    writers: Vec<String>,
    producers: Vec<String>,
}

/// One output row: the input entry plus everything collected for it.
#[derive(Debug, Serialize)]
struct CollectedSong {
    artist: String,
    track: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
    mbid: Option<String>,
    audio_features: AudioFeatures,
    genres: Vec<String>,
    danceable: Option<String>,
    voice_instrumental: Option<String>,
    timbre: Option<String>,
    moods: Vec<String>,
    credits: Credits,
    language: Option<String>,
    collection_status: CollectionStatus,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CollectReport {
    total: usize,
    complete: usize,
    partial: usize,
    failed: usize,
}

/// Run the collection pipeline and write the collected rows.
pub async fn run(
    song_list: &Path,
    output: &Path,
    limit: Option<usize>,
    network: &NetworkArgs,
) -> Result<()> {
    info!(path = %song_list.display(), "loading song list");
    let text = tokio::fs::read_to_string(song_list)
        .await
        .map_err(|e| miette::miette!("failed to read {}: {}", song_list.display(), e))?;
    let mut entries: Vec<Value> = serde_json::from_str(&text)
        .map_err(|e| miette::miette!("invalid song list {}: {}", song_list.display(), e))?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    let music = MusicBrainzClient::new(
        network.apply(ClientConfig::musicbrainz(), &network.musicbrainz_url),
    )
    .map_err(|e| miette::miette!("{}", e))?;
    let acoustic = AcousticBrainzClient::new(
        network.apply(ClientConfig::acousticbrainz(), &network.acousticbrainz_url),
    )
    .map_err(|e| miette::miette!("{}", e))?;

    let total = entries.len();
    info!(songs = total, "collecting song data");
    let mut rows = Vec::with_capacity(entries.len());
    let mut report = CollectReport::default();
    for (i, value) in entries.into_iter().enumerate() {
        if (i + 1) % PROGRESS_INTERVAL == 0 {
            info!(processed = i + 1, total, "collection progress");
        }
        let entry: SongListEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index = i, error = %e, "skipping malformed song list entry");
                continue;
            }
        };
        let row = collect_song(&music, &acoustic, entry).await;
        report.record(row.collection_status);
        rows.push(row);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| miette::miette!("failed to create {}: {}", parent.display(), e))?;
    }
    let json = serde_json::to_string_pretty(&rows).map_err(|e| miette::miette!("{}", e))?;
    tokio::fs::write(output, json)
        .await
        .map_err(|e| miette::miette!("failed to write {}: {}", output.display(), e))?;

    info!(
        total = report.total,
        complete = report.complete,
        partial = report.partial,
        failed = report.failed,
        output = %output.display(),
        "collection complete"
    );
    Ok(())
}

impl CollectReport {
    fn record(&mut self, status: CollectionStatus) {
        self.total += 1;
        match status {
            CollectionStatus::Complete => self.complete += 1,
            CollectionStatus::Partial => self.partial += 1,
            CollectionStatus::Failed => self.failed += 1,
        }
    }
}

async fn collect_song(
    music: &MusicBrainzClient,
    acoustic: &AcousticBrainzClient,
    entry: SongListEntry,
) -> CollectedSong {
    let artist = entry.artist.clone().unwrap_or_default();
    let track = entry.track.clone().unwrap_or_default();

    let mbid = match music.search_recording(&artist, &track).await {
        Ok(mbid) => mbid,
        Err(e) => {
            warn!(artist = %artist, track = %track, error = %e, "musicbrainz search failed");
            None
        }
    };
    let Some(mbid) = mbid else {
        return assemble_row(entry, None, None, None);
    };

    let features = acoustic.features(&mbid).await;
    let details = match music.recording_details(&mbid).await {
        Ok(details) => details,
        Err(e) => {
            warn!(mbid = %mbid, error = %e, "musicbrainz recording lookup failed");
            None
        }
    };

    assemble_row(entry, Some(mbid), features, details)
}

/// Combine the lookups for one song into an output row.
fn assemble_row(
    entry: SongListEntry,
    mbid: Option<String>,
    features: Option<AcousticFeatures>,
    details: Option<RecordingDetails>,
) -> CollectedSong {
    let status = match (&mbid, &features, &details) {
        (None, _, _) => CollectionStatus::Failed,
        (Some(_), Some(_), Some(_)) => CollectionStatus::Complete,
        _ => CollectionStatus::Partial,
    };

    let record = match (&mbid, &features) {
        (Some(mbid), Some(features)) => normalize_features(mbid, features),
        _ => None,
    }
    .unwrap_or_default();

    let mut extra = entry.extra;
    extra.retain(|key, _| !COLLECTED_FIELDS.contains(&key.as_str()));

    let credits = details
        .as_ref()
        .map(|d| Credits {
            main_artist: d.artist.clone(),
            featured_artists: d.featured_artists.clone(),
            writers: d.writers.clone(),
            producers: d.producers.clone(),
        })
        .unwrap_or_default();

    CollectedSong {
        artist: entry.artist.unwrap_or_default(),
        track: entry.track.unwrap_or_default(),
        extra,
        mbid,
        audio_features: record.audio_features,
        genres: record.genres,
        danceable: record.danceable,
        voice_instrumental: record.voice_instrumental,
        timbre: record.timbre,
        moods: record.moods,
        credits,
        language: details.and_then(|d| d.language),
        collection_status: status,
    }
}

fn normalize_features(mbid: &str, features: &AcousticFeatures) -> Option<SongRecord> {
    normalize_recording(
        mbid,
        resolve(mbid, features.low_level.as_ref()),
        resolve(mbid, features.high_level.as_ref()),
    )
}

fn resolve<'a>(mbid: &'a str, body: Option<&'a Value>) -> Option<AnalysisDocument<'a>> {
    body.and_then(|body| AnalysisShape::ApiResponse { mbid, body }.resolve())
}
