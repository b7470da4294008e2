//! Building a fact store from an on-disk AcousticBrainz dump.
//!
//! A dump is a directory tree of per-recording JSON files. The recording id
//! is taken from the file name and the document kind (low-level or
//! high-level) from the path.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::builder::FactStoreBuilder;
use crate::error::KbError;
use crate::normalizer::normalize_recording;
use crate::ordered::OrderedMap;
use crate::record::SongRecord;
use crate::shape::AnalysisShape;
use crate::store::FactStore;

/// Recording ids in dump file names, optionally prefixed by hex digits.
static RECORDING_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[0-9a-f]+)?([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
    )
    .unwrap()
});

const PROGRESS_INTERVAL: usize = 5000;

/// The documents found for one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpFiles {
    pub low_level: Option<PathBuf>,
    pub high_level: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRecording {
    pub mbid: String,
    pub files: DumpFiles,
}

/// Outcome counts of a dump build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    /// Recordings with at least one document on disk.
    pub discovered: usize,
    /// Recordings that produced a song record.
    pub loaded: usize,
    /// Recordings with nothing usable.
    pub empty: usize,
}

/// Walk `root` and group analysis files by recording id.
///
/// Files are visited in sorted path order; when several files of the same
/// kind share an id, the last one visited wins.
pub fn discover_dump_files(root: impl AsRef<Path>) -> Result<Vec<DiscoveredRecording>, KbError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(KbError::NotFound {
            path: root.to_path_buf(),
        });
    }

    let mut by_id: OrderedMap<DumpFiles> = OrderedMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable dump entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        let Some(mbid) = RECORDING_ID.captures(name).map(|c| c[1].to_lowercase()) else {
            continue;
        };

        let path = entry.into_path();
        let lowered = path.to_string_lossy().to_lowercase();
        let files = by_id.get_or_insert_with(&mbid, DumpFiles::default);
        if lowered.contains("highlevel") || lowered.contains("high_level") {
            files.high_level = Some(path);
        } else {
            files.low_level = Some(path);
        }
    }

    debug!(root = %root.display(), recordings = by_id.len(), "discovered dump files");
    Ok(by_id
        .iter()
        .map(|(mbid, files)| DiscoveredRecording {
            mbid: mbid.to_string(),
            files: files.clone(),
        })
        .collect())
}

/// Read and normalize one recording's dump documents.
///
/// Unreadable or invalid files are treated as missing.
pub fn load_song_from_dump(mbid: &str, files: &DumpFiles) -> Option<SongRecord> {
    let low = files.low_level.as_deref().and_then(read_document);
    let high = files.high_level.as_deref().and_then(read_document);

    normalize_recording(
        mbid,
        low.as_ref().and_then(|v| AnalysisShape::DumpFile(v).resolve()),
        high.as_ref().and_then(|v| AnalysisShape::DumpFile(v).resolve()),
    )
}

/// Discover, load and build a fact store from a dump directory.
///
/// `limit` caps the number of recordings considered.
pub fn build_from_dump(
    root: impl AsRef<Path>,
    limit: Option<usize>,
) -> Result<(FactStore, DumpReport), KbError> {
    let mut recordings = discover_dump_files(root)?;
    if let Some(limit) = limit {
        recordings.truncate(limit);
    }

    let mut report = DumpReport {
        discovered: recordings.len(),
        ..DumpReport::default()
    };
    info!(recordings = report.discovered, "loading dump recordings");

    let mut builder = FactStoreBuilder::new();
    for (i, recording) in recordings.iter().enumerate() {
        match load_song_from_dump(&recording.mbid, &recording.files) {
            Some(record) => {
                builder.add(&record);
                report.loaded += 1;
            }
            None => report.empty += 1,
        }
        if (i + 1) % PROGRESS_INTERVAL == 0 {
            info!(processed = i + 1, total = report.discovered, "dump progress");
        }
    }

    Ok((builder.finish(), report))
}

fn read_document(path: &Path) -> Option<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable dump file");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping invalid dump file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "0a1b2c3d-1111-2222-3333-444455556666";

    fn write(path: &Path, value: &Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
    }

    #[test]
    fn test_discover_classifies_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let low = dir.path().join("lowlevel").join("0a").join(format!("{}-0.json", ID));
        let high = dir.path().join("highlevel").join("0a").join(format!("{}-0.json", ID));
        write(&low, &json!({}));
        write(&high, &json!({}));
        write(&dir.path().join("notes.json"), &json!({}));
        write(&dir.path().join(format!("{}.txt", ID)), &json!({}));

        let found = discover_dump_files(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mbid, ID);
        assert_eq!(found[0].files.low_level.as_deref(), Some(low.as_path()));
        assert_eq!(found[0].files.high_level.as_deref(), Some(high.as_path()));
    }

    #[test]
    fn test_discover_lowercases_ids_and_accepts_hex_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("ff{}_high_level.json", ID.to_uppercase());
        write(&dir.path().join(name), &json!({}));

        let found = discover_dump_files(dir.path()).unwrap();
        assert_eq!(found[0].mbid, ID);
        assert!(found[0].files.high_level.is_some());
        assert!(found[0].files.low_level.is_none());
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_dump_files(dir.path().join("nope"));
        assert!(matches!(result, Err(KbError::NotFound { .. })));
    }

    #[test]
    fn test_load_song_fills_from_high_level_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let low = dir.path().join("low.json");
        let high = dir.path().join("high.json");
        write(&low, &json!({"rhythm": {"bpm": 128.0}}));
        write(
            &high,
            &json!({
                "highlevel": {"genre_dortmund": {"value": "electronic", "probability": 0.9}},
                "metadata": {
                    "tags": {"artist": ["DJ"], "title": ["Loop"]},
                    "audio_properties": {"length": 180.0, "replay_gain": -6.0}
                }
            }),
        );

        let files = DumpFiles {
            low_level: Some(low),
            high_level: Some(high),
        };
        let record = load_song_from_dump(ID, &files).unwrap();
        assert_eq!(record.track, "Loop");
        assert_eq!(record.genres, vec!["electronic"]);
        assert_eq!(record.audio_features.tempo, Some(128.0));
        assert_eq!(record.audio_features.duration, Some(180.0));
        assert_eq!(record.audio_features.loudness, Some(-6.0));
    }

    #[test]
    fn test_load_song_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();

        let files = DumpFiles {
            low_level: Some(broken),
            high_level: Some(dir.path().join("missing.json")),
        };
        assert!(load_song_from_dump(ID, &files).is_none());
    }

    #[test]
    fn test_build_from_dump_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let ids = [
            "00000000-0000-0000-0000-000000000001",
            "00000000-0000-0000-0000-000000000002",
        ];
        for id in ids {
            write(
                &dir.path().join(format!("{}.json", id)),
                &json!({"rhythm": {"bpm": 100.0}}),
            );
        }

        let (store, report) = build_from_dump(dir.path(), Some(1)).unwrap();
        assert_eq!(report, DumpReport { discovered: 1, loaded: 1, empty: 0 });
        assert_eq!(store.songs().keys().collect::<Vec<_>>(), vec![ids[0]]);

        let (store, report) = build_from_dump(dir.path(), None).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(store.songs().len(), 2);
    }
}
