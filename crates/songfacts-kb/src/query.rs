//! Read-only queries over a loaded fact store.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::KbError;
use crate::store::{FactStore, FactType, FactValue, IndexName, Song};

/// An immutable view over one fact store snapshot.
///
/// Nothing here mutates the store, so a `QueryEngine` can be shared across
/// threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: FactStore,
}

impl QueryEngine {
    /// Load a snapshot from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KbError> {
        let path = path.as_ref();
        let engine = Self::new(FactStore::load(path)?);
        info!(
            path = %path.display(),
            songs = engine.song_count(),
            "loaded fact store"
        );
        Ok(engine)
    }

    pub fn new(store: FactStore) -> Self {
        let dangling = store.dangling_ids();
        if !dangling.is_empty() {
            warn!(
                count = dangling.len(),
                example = %dangling.iter().next().map(String::as_str).unwrap_or_default(),
                "fact store references unregistered songs"
            );
        }
        Self { store }
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn get_song(&self, id: &str) -> Option<&Song> {
        self.store.song(id)
    }

    /// The value recorded for `id` under `fact_type`, or `None` when either
    /// is unknown.
    pub fn get_fact(&self, fact_type: impl AsRef<str>, id: &str) -> Option<&FactValue> {
        self.store.fact_table(fact_type.as_ref())?.get(id)
    }

    /// Whether an entry exists, whatever its value (including `null`).
    pub fn has_fact(&self, fact_type: impl AsRef<str>, id: &str) -> bool {
        self.store
            .fact_table(fact_type.as_ref())
            .is_some_and(|table| table.contains_key(id))
    }

    pub fn songs_by_genre(&self, genre: &str) -> &[String] {
        self.indexed(IndexName::Genre, genre)
    }

    pub fn songs_by_danceable(&self, label: &str) -> &[String] {
        self.indexed(IndexName::Danceable, label)
    }

    pub fn songs_by_voice_instrumental(&self, label: &str) -> &[String] {
        self.indexed(IndexName::VoiceInstrumental, label)
    }

    pub fn songs_by_timbre(&self, label: &str) -> &[String] {
        self.indexed(IndexName::Timbre, label)
    }

    pub fn songs_by_mood(&self, mood: &str) -> &[String] {
        self.indexed(IndexName::Mood, mood)
    }

    /// Songs in a tempo bucket such as `"120-130"`.
    pub fn songs_by_tempo_range(&self, bucket: &str) -> &[String] {
        self.indexed(IndexName::TempoRange, bucket)
    }

    /// Songs whose loudness lies in `[min, max]`, in document order.
    pub fn songs_in_loudness_range(&self, min: f64, max: f64) -> Vec<String> {
        let Some(table) = self.store.fact_table(FactType::Loudness.as_str()) else {
            return Vec::new();
        };
        table
            .iter()
            .filter(|(_, value)| {
                value
                    .as_f64()
                    .is_some_and(|loudness| min <= loudness && loudness <= max)
            })
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub fn get_all_genres(&self) -> BTreeSet<String> {
        self.index_keys(IndexName::Genre)
    }

    pub fn get_all_moods(&self) -> BTreeSet<String> {
        self.index_keys(IndexName::Mood)
    }

    /// Every registered song id, in registration order.
    pub fn get_all_songs(&self) -> Vec<String> {
        self.store.songs().keys().map(str::to_string).collect()
    }

    pub fn song_count(&self) -> usize {
        self.store.songs().len()
    }

    /// Number of entries per fact table, in document order.
    pub fn fact_counts(&self) -> Vec<(String, usize)> {
        self.store
            .facts()
            .iter()
            .map(|(name, table)| (name.to_string(), table.len()))
            .collect()
    }

    /// Resolve a track title (and optionally artist) to a song id.
    ///
    /// Case-insensitive exact matches are tried first; failing that, the
    /// first song whose title and artist contain or are contained by the
    /// query wins. An artist that is empty after trimming, including a
    /// whitespace-only one, means "any artist" in both phases.
    pub fn resolve_identifier_by_name(
        &self,
        track: &str,
        artist: Option<&str>,
    ) -> Result<Option<String>, KbError> {
        let track = track.trim().to_lowercase();
        if track.is_empty() {
            return Err(KbError::InvalidInput(
                "track name must be a non-empty string".to_string(),
            ));
        }
        let artist = normalize_artist(artist);
        let artist = artist.as_deref();

        let exact = self.store.songs().iter().find(|(_, song)| {
            let (song_track, song_artist) = normalized(song);
            song_track == track && artist.is_none_or(|a| song_artist == a)
        });
        if let Some((id, _)) = exact {
            return Ok(Some(id.to_string()));
        }

        Ok(self
            .store
            .songs()
            .iter()
            .find(|(_, song)| partial_match(song, &track, artist))
            .map(|(id, _)| id.to_string()))
    }

    /// Every song id matching `track` (and `artist`) by equality or
    /// substring in either direction, in registration order. A blank
    /// artist is no filter.
    pub fn find_all_identifiers_by_name(&self, track: &str, artist: Option<&str>) -> Vec<String> {
        let track = track.trim().to_lowercase();
        let artist = normalize_artist(artist);
        self.store
            .songs()
            .iter()
            .filter(|(_, song)| partial_match(song, &track, artist.as_deref()))
            .map(|(id, _)| id.to_string())
            .collect()
    }

    fn indexed(&self, index: IndexName, label: &str) -> &[String] {
        self.store
            .index(index.as_str())
            .and_then(|entries| entries.get(&label.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn index_keys(&self, index: IndexName) -> BTreeSet<String> {
        self.store
            .index(index.as_str())
            .map(|entries| entries.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn normalize_artist(artist: Option<&str>) -> Option<String> {
    artist
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
}

fn normalized(song: &Song) -> (String, String) {
    (song.track.trim().to_lowercase(), song.artist.trim().to_lowercase())
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn partial_match(song: &Song, track: &str, artist: Option<&str>) -> bool {
    let (song_track, song_artist) = normalized(song);
    overlaps(&song_track, track) && artist.is_none_or(|a| overlaps(&song_artist, a))
}
