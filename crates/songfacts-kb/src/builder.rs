//! Folds song records into a [`FactStore`].

use tracing::{debug, info};

use crate::normalizer::tempo_bucket;
use crate::record::SongRecord;
use crate::store::{FactStore, FactTable, FactType, FactValue, IndexName, Song};

/// Incrementally assembles a fact store from song records.
///
/// Records are applied in the order given. A record whose id was already
/// seen replaces the song registration, overwrites scalar facts, and
/// appends to the genre and mood lists. Index lists only ever grow.
#[derive(Debug)]
pub struct FactStoreBuilder {
    store: FactStore,
    added: usize,
    skipped: usize,
}

impl Default for FactStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStoreBuilder {
    pub fn new() -> Self {
        Self {
            store: FactStore::with_schema(),
            added: 0,
            skipped: 0,
        }
    }

    /// Apply one record. Returns `false` when it was skipped for lacking an id.
    pub fn add(&mut self, record: &SongRecord) -> bool {
        let Some(mbid) = record.mbid.as_deref().filter(|id| !id.is_empty()) else {
            self.skipped += 1;
            return false;
        };
        let store = &mut self.store;

        store.songs.insert(
            mbid,
            Song {
                mbid: mbid.to_string(),
                artist: record.artist.clone(),
                track: record.track.clone(),
                album: record.album.clone(),
            },
        );

        let features = &record.audio_features;
        if let Some(tempo) = features.tempo {
            store.fact_table_mut(FactType::Tempo).insert(mbid, FactValue::Number(tempo));
            if let Some(bucket) = tempo_bucket(Some(tempo)) {
                push_index(store, IndexName::TempoRange, &bucket, mbid);
            }
        }
        for (fact_type, value) in [(FactType::Key, &features.key), (FactType::Mode, &features.mode)] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                store.fact_table_mut(fact_type).insert(mbid, FactValue::from(value));
            }
        }
        for (fact_type, value) in [
            (FactType::Loudness, features.loudness),
            (FactType::Duration, features.duration),
        ] {
            if let Some(value) = value {
                store.fact_table_mut(fact_type).insert(mbid, FactValue::Number(value));
            }
        }

        for genre in &record.genres {
            append_list_fact(store.fact_table_mut(FactType::Genre), mbid, genre);
            let key = genre.trim().to_lowercase();
            if !key.is_empty() {
                push_index(store, IndexName::Genre, &key, mbid);
            }
        }

        for (fact_type, index, label) in [
            (FactType::Danceable, IndexName::Danceable, &record.danceable),
            (
                FactType::VoiceInstrumental,
                IndexName::VoiceInstrumental,
                &record.voice_instrumental,
            ),
            (FactType::Timbre, IndexName::Timbre, &record.timbre),
        ] {
            if let Some(label) = label.as_deref().filter(|l| !l.is_empty()) {
                store.fact_table_mut(fact_type).insert(mbid, FactValue::from(label));
                push_index(store, index, label, mbid);
            }
        }

        for mood in &record.moods {
            append_list_fact(store.fact_table_mut(FactType::Mood), mbid, mood);
            let key = mood.trim().to_lowercase();
            if !key.is_empty() {
                push_index(store, IndexName::Mood, &key, mbid);
            }
        }

        self.added += 1;
        true
    }

    /// Deduplicate the genre and mood lists and return the store.
    pub fn finish(mut self) -> FactStore {
        for fact_type in [FactType::Genre, FactType::Mood] {
            for value in self.store.fact_table_mut(fact_type).values_mut() {
                if let FactValue::List(items) = value {
                    dedup_in_order(items);
                }
            }
        }
        info!(
            records = self.added,
            songs = self.store.songs.len(),
            skipped = self.skipped,
            "built fact store"
        );
        self.store
    }
}

/// Build a fact store from records in one pass.
pub fn build_fact_store<'a>(records: impl IntoIterator<Item = &'a SongRecord>) -> FactStore {
    let mut builder = FactStoreBuilder::new();
    for record in records {
        if !builder.add(record) {
            debug!("skipping record without mbid");
        }
    }
    builder.finish()
}

fn push_index(store: &mut FactStore, index: IndexName, key: &str, mbid: &str) {
    store
        .index_mut(index)
        .get_or_insert_with(key, Vec::new)
        .push(mbid.to_string());
}

fn append_list_fact(table: &mut FactTable, mbid: &str, item: &str) {
    let entry = table.get_or_insert_with(mbid, || FactValue::List(Vec::new()));
    match entry {
        FactValue::List(items) => items.push(item.to_string()),
        other => *other = FactValue::List(vec![item.to_string()]),
    }
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
