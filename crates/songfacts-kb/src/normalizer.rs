//! Feature extraction from raw AcousticBrainz analysis JSON.
//!
//! Every function here is total: missing, null or wrong-typed input
//! degrades to an absent value instead of an error. Upstream documents are
//! routinely partial, so absence is the common case.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{AudioFeatures, SongRecord};
use crate::shape::{AnalysisDocument, get_nested};

/// Genre classifiers consulted, in output order.
pub const GENRE_CLASSIFIERS: [&str; 4] = [
    "genre_rosamerica",
    "genre_electronic",
    "genre_dortmund",
    "genre_tzanetakis",
];

/// A genre is accepted only above this probability (exclusive).
pub const GENRE_MIN_PROBABILITY: f64 = 0.3;

/// Default threshold for [`confident_label`] (inclusive).
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.5;

/// Mood classifiers and the label each one contributes when it fires.
pub const MOOD_CLASSIFIERS: [(&str, &str); 6] = [
    ("mood_relaxed", "relaxed"),
    ("mood_sad", "sad"),
    ("mood_happy", "happy"),
    ("mood_party", "party"),
    ("mood_acoustic", "acoustic"),
    ("mood_electronic", "electronic"),
];

/// Artist, title and album taken from a dump document's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub artist: String,
    pub track: String,
    pub album: String,
}

/// Confidence-filtered single-label classifier outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighLevelLabels {
    pub danceable: Option<String>,
    pub voice_instrumental: Option<String>,
    pub timbre: Option<String>,
    pub moods: Vec<String>,
}

/// Extract tempo, key, mode, time signature, loudness and duration.
pub fn extract_low_level(raw: &Value) -> AudioFeatures {
    let key_letter = get_nested(raw, &["tonal", "key_key"])
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty());
    let scale = get_nested(raw, &["tonal", "key_scale"])
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_lowercase());

    let key = key_letter.as_ref().map(|letter| {
        format!("{} {}", letter, scale.as_deref().unwrap_or("major"))
    });
    let mode = key_letter.and(scale);

    let loudness = get_nested(raw, &["lowlevel", "average_loudness"])
        .or_else(|| get_nested(raw, &["metadata", "audio_properties", "replay_gain"]))
        .and_then(as_float);

    let time_signature = get_nested(raw, &["rhythm", "beats_count"])
        .or_else(|| get_nested(raw, &["rhythm", "time_signature"]))
        .and_then(as_float)
        .map(|n| n.trunc() as i64);

    AudioFeatures {
        tempo: get_nested(raw, &["rhythm", "bpm"]).and_then(as_float),
        key,
        mode,
        time_signature,
        loudness,
        duration: get_nested(raw, &["metadata", "audio_properties", "length"]).and_then(as_float),
    }
}

/// Extract lowercase genres from the genre classifiers, first-seen order,
/// without duplicates.
pub fn extract_genres(classifiers: &Value) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for field in GENRE_CLASSIFIERS {
        let Some(obj) = classifiers.get(field).filter(|v| v.is_object()) else {
            continue;
        };
        let Some(value) = obj.get("value").and_then(scalar_string) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let accepted = obj
            .get("probability")
            .and_then(as_float)
            .is_some_and(|p| p > GENRE_MIN_PROBABILITY);
        if accepted {
            let genre = value.to_lowercase();
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }
    }
    genres
}

/// Return a classifier's trimmed, lowercased label when its probability is
/// at least `min_probability`.
///
/// A missing probability counts as 0. A probability that cannot be read as
/// a number rejects the label.
pub fn confident_label(obj: &Value, min_probability: f64) -> Option<String> {
    obj.as_object()?;
    let value = obj.get("value").and_then(scalar_string)?;
    let probability = match obj.get("probability") {
        None => 0.0,
        Some(p) => as_float(p)?,
    };
    if probability < min_probability {
        return None;
    }
    let label = value.trim().to_lowercase();
    (!label.is_empty()).then_some(label)
}

/// `danceable` / `not_danceable` from the danceability classifier.
pub fn extract_danceable(classifiers: &Value, min_probability: f64) -> Option<String> {
    classifiers
        .get("danceability")
        .and_then(|obj| confident_label(obj, min_probability))
}

/// `voice` / `instrumental`, if confident.
pub fn extract_voice_instrumental(classifiers: &Value, min_probability: f64) -> Option<String> {
    classifiers
        .get("voice_instrumental")
        .and_then(|obj| confident_label(obj, min_probability))
}

/// `bright` / `dark`, if confident.
pub fn extract_timbre(classifiers: &Value, min_probability: f64) -> Option<String> {
    classifiers
        .get("timbre")
        .and_then(|obj| confident_label(obj, min_probability))
}

/// Moods whose classifier confidently picked its positive class, in
/// [`MOOD_CLASSIFIERS`] order.
pub fn extract_moods(classifiers: &Value) -> Vec<String> {
    MOOD_CLASSIFIERS
        .iter()
        .filter(|(field, label)| {
            classifiers
                .get(*field)
                .and_then(|obj| confident_label(obj, DEFAULT_MIN_PROBABILITY))
                .is_some_and(|value| value == *label)
        })
        .map(|(_, label)| label.to_string())
        .collect()
}

/// All single-label outputs plus moods, at the default threshold.
pub fn extract_high_level_labels(classifiers: &Value) -> HighLevelLabels {
    HighLevelLabels {
        danceable: extract_danceable(classifiers, DEFAULT_MIN_PROBABILITY),
        voice_instrumental: extract_voice_instrumental(classifiers, DEFAULT_MIN_PROBABILITY),
        timbre: extract_timbre(classifiers, DEFAULT_MIN_PROBABILITY),
        moods: extract_moods(classifiers),
    }
}

/// Read artist/title/album from `metadata.tags`.
///
/// Dump tags are usually single-element lists; the first element is used.
pub fn extract_dump_metadata(raw: &Value) -> TrackMetadata {
    let tag = |name: &str| -> String {
        let value = match get_nested(raw, &["metadata", "tags", name]) {
            Some(Value::Array(items)) => items.first(),
            other => other,
        };
        value
            .and_then(scalar_string)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    TrackMetadata {
        artist: tag("artist"),
        track: tag("title"),
        album: tag("album"),
    }
}

/// Duration and replay-gain loudness from `metadata.audio_properties`.
pub fn extract_audio_properties(raw: &Value) -> (Option<f64>, Option<f64>) {
    let duration = get_nested(raw, &["metadata", "audio_properties", "length"]).and_then(as_float);
    let loudness =
        get_nested(raw, &["metadata", "audio_properties", "replay_gain"]).and_then(as_float);
    (duration, loudness)
}

/// 10 BPM wide bucket label for the tempo index, e.g. `125.9` -> `"120-130"`.
///
/// The tempo is truncated toward zero before floor division, so `-5.5`
/// lands in `"-10-0"`. Non-finite tempos, and tempos whose bucket bounds
/// do not fit in an `i64`, have no bucket.
pub fn tempo_bucket(tempo: Option<f64>) -> Option<String> {
    let tempo = tempo.filter(|t| t.is_finite())?;
    // Out-of-range casts saturate; the checked arithmetic rejects them.
    let base = (tempo.trunc() as i64).div_euclid(10).checked_mul(10)?;
    let upper = base.checked_add(10)?;
    Some(format!("{}-{}", base, upper))
}

/// Assemble a song record from a recording's low-level and high-level
/// documents, either of which may be missing.
///
/// Duration and loudness fall back to the high-level document's audio
/// properties when the low-level document did not provide them. Returns
/// `None` when nothing usable was found.
pub fn normalize_recording(
    mbid: &str,
    low_level: Option<AnalysisDocument<'_>>,
    high_level: Option<AnalysisDocument<'_>>,
) -> Option<SongRecord> {
    let mut audio_features = low_level
        .map(|doc| extract_low_level(doc.root()))
        .unwrap_or_default();

    let mut record = SongRecord {
        mbid: Some(mbid.to_string()),
        ..SongRecord::default()
    };

    if let Some(doc) = high_level {
        let classifiers = doc.classifiers();
        record.genres = extract_genres(classifiers);

        let metadata = extract_dump_metadata(doc.root());
        record.artist = metadata.artist;
        record.track = metadata.track;
        record.album = metadata.album;

        let labels = extract_high_level_labels(classifiers);
        record.danceable = labels.danceable;
        record.voice_instrumental = labels.voice_instrumental;
        record.timbre = labels.timbre;
        record.moods = labels.moods;

        let (duration, loudness) = extract_audio_properties(doc.root());
        audio_features.duration = audio_features.duration.or(duration);
        audio_features.loudness = audio_features.loudness.or(loudness);
    }

    if low_level.is_none() && audio_features.is_empty() && record.genres.is_empty() {
        return None;
    }
    record.audio_features = audio_features;
    Some(record)
}

/// Read a JSON scalar as a finite float. Numeric strings are accepted;
/// `"NaN"` and `"inf"` are not.
fn as_float(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Render a JSON scalar as a string; containers and null have no string form.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::AnalysisShape;
    use serde_json::json;

    fn lowlevel_doc() -> Value {
        json!({
            "rhythm": {"bpm": 120.5, "beats_count": 4},
            "tonal": {"key_key": "C", "key_scale": "major"},
            "lowlevel": {"average_loudness": -8.5},
            "metadata": {"audio_properties": {"length": 240.0}}
        })
    }

    #[test]
    fn test_low_level_complete() {
        let features = extract_low_level(&lowlevel_doc());
        assert_eq!(features.tempo, Some(120.5));
        assert_eq!(features.key.as_deref(), Some("C major"));
        assert_eq!(features.mode.as_deref(), Some("major"));
        assert_eq!(features.time_signature, Some(4));
        assert_eq!(features.loudness, Some(-8.5));
        assert_eq!(features.duration, Some(240.0));
    }

    #[test]
    fn test_low_level_missing_everything() {
        let features = extract_low_level(&json!({"rhythm": {}, "tonal": {}}));
        assert!(features.is_empty());
        assert!(extract_low_level(&Value::Null).is_empty());
    }

    #[test]
    fn test_low_level_key_without_scale_defaults_to_major() {
        let features = extract_low_level(&json!({"tonal": {"key_key": "F#"}}));
        assert_eq!(features.key.as_deref(), Some("F# major"));
        assert_eq!(features.mode, None);
    }

    #[test]
    fn test_low_level_scale_is_lowercased_and_needs_key() {
        let features = extract_low_level(&json!({"tonal": {"key_key": "A", "key_scale": "Minor"}}));
        assert_eq!(features.key.as_deref(), Some("A minor"));
        assert_eq!(features.mode.as_deref(), Some("minor"));

        let features = extract_low_level(&json!({"tonal": {"key_scale": "minor"}}));
        assert_eq!(features.key, None);
        assert_eq!(features.mode, None);
    }

    #[test]
    fn test_low_level_blank_key_parts_count_as_missing() {
        let features = extract_low_level(&json!({"tonal": {"key_key": "", "key_scale": "minor"}}));
        assert_eq!(features.key, None);
        assert_eq!(features.mode, None);

        let features = extract_low_level(&json!({"tonal": {"key_key": "C", "key_scale": " "}}));
        assert_eq!(features.key.as_deref(), Some("C major"));
        assert_eq!(features.mode, None);
    }

    #[test]
    fn test_low_level_fallbacks() {
        let raw = json!({
            "rhythm": {"time_signature": 3},
            "metadata": {"audio_properties": {"replay_gain": -10.0}}
        });
        let features = extract_low_level(&raw);
        assert_eq!(features.loudness, Some(-10.0));
        assert_eq!(features.time_signature, Some(3));
    }

    #[test]
    fn test_low_level_zero_loudness_is_kept() {
        let raw = json!({
            "lowlevel": {"average_loudness": 0.0},
            "metadata": {"audio_properties": {"replay_gain": -10.0}}
        });
        assert_eq!(extract_low_level(&raw).loudness, Some(0.0));
    }

    #[test]
    fn test_low_level_uncastable_numbers_are_absent() {
        let raw = json!({"rhythm": {"bpm": "fast", "beats_count": {"n": 4}}});
        let features = extract_low_level(&raw);
        assert_eq!(features.tempo, None);
        assert_eq!(features.time_signature, None);

        let raw = json!({"rhythm": {"bpm": "98.5"}});
        assert_eq!(extract_low_level(&raw).tempo, Some(98.5));
    }

    #[test]
    fn test_low_level_non_finite_strings_are_absent() {
        let raw = json!({
            "rhythm": {"bpm": "NaN", "beats_count": "infinity"},
            "lowlevel": {"average_loudness": "inf"},
            "metadata": {"audio_properties": {"length": "-inf"}}
        });
        let features = extract_low_level(&raw);
        assert_eq!(features.tempo, None);
        assert_eq!(features.time_signature, None);
        assert_eq!(features.loudness, None);
        assert_eq!(features.duration, None);
        let raw = json!({"metadata": {"audio_properties": {"replay_gain": "nan"}}});
        assert_eq!(extract_audio_properties(&raw), (None, None));
    }

    #[test]
    fn test_genres_valid() {
        let classifiers = json!({
            "genre_rosamerica": {"value": "Rock", "probability": 0.8},
            "genre_electronic": {"value": "electronic", "probability": 0.6},
            "genre_dortmund": {"value": "pop", "probability": 0.5}
        });
        assert_eq!(extract_genres(&classifiers), vec!["rock", "electronic", "pop"]);
    }

    #[test]
    fn test_genres_threshold_is_strict() {
        let at = json!({"genre_rosamerica": {"value": "rock", "probability": 0.3}});
        assert!(extract_genres(&at).is_empty());

        let above = json!({"genre_rosamerica": {"value": "rock", "probability": 0.31}});
        assert_eq!(extract_genres(&above), vec!["rock"]);
    }

    #[test]
    fn test_genres_no_duplicates() {
        let classifiers = json!({
            "genre_rosamerica": {"value": "rock", "probability": 0.8},
            "genre_dortmund": {"value": "ROCK", "probability": 0.9},
            "genre_tzanetakis": {"value": "jazz", "probability": 0.9}
        });
        assert_eq!(extract_genres(&classifiers), vec!["rock", "jazz"]);
    }

    #[test]
    fn test_genres_reject_malformed_entries() {
        let classifiers = json!({
            "genre_rosamerica": {"value": "", "probability": 0.9},
            "genre_electronic": {"value": "house", "probability": "high"},
            "genre_dortmund": {"value": "blues"},
            "genre_tzanetakis": "jazz"
        });
        assert!(extract_genres(&classifiers).is_empty());
    }

    #[test]
    fn test_confident_label_thresholds() {
        let obj = json!({"value": " Test ", "probability": 0.7});
        assert_eq!(confident_label(&obj, 0.5).as_deref(), Some("test"));

        let low = json!({"value": "test", "probability": 0.3});
        assert_eq!(confident_label(&low, 0.5), None);
        assert_eq!(confident_label(&low, 0.2).as_deref(), Some("test"));

        let boundary = json!({"value": "x", "probability": 0.5});
        assert_eq!(confident_label(&boundary, 0.5).as_deref(), Some("x"));
    }

    #[test]
    fn test_confident_label_invalid_objects() {
        assert_eq!(confident_label(&Value::Null, 0.5), None);
        assert_eq!(confident_label(&json!("not_a_dict"), 0.5), None);
        assert_eq!(confident_label(&json!({"probability": 0.9}), 0.5), None);
        assert_eq!(confident_label(&json!({"value": "x", "probability": null}), 0.5), None);
        assert_eq!(confident_label(&json!({"value": "x", "probability": "abc"}), 0.5), None);
        // Missing probability counts as zero.
        assert_eq!(confident_label(&json!({"value": "x"}), 0.5), None);
        assert_eq!(confident_label(&json!({"value": "x"}), 0.0).as_deref(), Some("x"));
    }

    #[test]
    fn test_high_level_labels_complete() {
        let classifiers = json!({
            "danceability": {"value": "danceable", "probability": 0.8},
            "voice_instrumental": {"value": "voice", "probability": 0.9},
            "timbre": {"value": "bright", "probability": 0.7},
            "mood_happy": {"value": "happy", "probability": 0.8},
            "mood_relaxed": {"value": "relaxed", "probability": 0.6},
            "mood_sad": {"value": "not_sad", "probability": 0.9},
            "mood_party": {"value": "party", "probability": 0.4}
        });

        let labels = extract_high_level_labels(&classifiers);
        assert_eq!(labels.danceable.as_deref(), Some("danceable"));
        assert_eq!(labels.voice_instrumental.as_deref(), Some("voice"));
        assert_eq!(labels.timbre.as_deref(), Some("bright"));
        // Declaration order, not input order.
        assert_eq!(labels.moods, vec!["relaxed", "happy"]);
    }

    #[test]
    fn test_high_level_labels_below_threshold() {
        let classifiers = json!({"danceability": {"value": "danceable", "probability": 0.3}});
        assert_eq!(extract_high_level_labels(&classifiers), HighLevelLabels::default());
    }

    #[test]
    fn test_dump_metadata_list_tags() {
        let raw = json!({"metadata": {"tags": {
            "artist": ["  Test Artist "], "title": ["Test Track", "Alt"], "album": ["Test Album"]
        }}});
        let metadata = extract_dump_metadata(&raw);
        assert_eq!(metadata.artist, "Test Artist");
        assert_eq!(metadata.track, "Test Track");
        assert_eq!(metadata.album, "Test Album");
    }

    #[test]
    fn test_dump_metadata_string_tags() {
        let raw = json!({"metadata": {"tags": {
            "artist": "Test Artist", "title": "Test Track", "album": "Test Album"
        }}});
        let metadata = extract_dump_metadata(&raw);
        assert_eq!(metadata.track, "Test Track");
        assert_eq!(metadata.album, "Test Album");
    }

    #[test]
    fn test_dump_metadata_missing_tags() {
        assert_eq!(extract_dump_metadata(&json!({"metadata": {}})), TrackMetadata::default());
        assert_eq!(extract_dump_metadata(&json!({"metadata": {"tags": "x"}})), TrackMetadata::default());
        assert_eq!(
            extract_dump_metadata(&json!({"metadata": {"tags": {"artist": []}}})),
            TrackMetadata::default()
        );
    }

    #[test]
    fn test_tempo_bucket() {
        assert_eq!(tempo_bucket(Some(120.5)).as_deref(), Some("120-130"));
        assert_eq!(tempo_bucket(Some(125.0)).as_deref(), Some("120-130"));
        assert_eq!(tempo_bucket(Some(125.9)).as_deref(), Some("120-130"));
        assert_eq!(tempo_bucket(Some(130.0)).as_deref(), Some("130-140"));
        assert_eq!(tempo_bucket(None), None);
    }

    #[test]
    fn test_tempo_bucket_edge_cases() {
        assert_eq!(tempo_bucket(Some(0.0)).as_deref(), Some("0-10"));
        assert_eq!(tempo_bucket(Some(9.9)).as_deref(), Some("0-10"));
        assert_eq!(tempo_bucket(Some(10.0)).as_deref(), Some("10-20"));
        assert_eq!(tempo_bucket(Some(-5.5)).as_deref(), Some("-10-0"));
        assert_eq!(tempo_bucket(Some(-15.0)).as_deref(), Some("-20--10"));
        assert_eq!(tempo_bucket(Some(f64::NAN)), None);
    }

    #[test]
    fn test_tempo_bucket_out_of_range_has_no_bucket() {
        assert_eq!(tempo_bucket(Some(1e300)), None);
        assert_eq!(tempo_bucket(Some(-1e300)), None);
        assert_eq!(tempo_bucket(Some(f64::MAX)), None);
        assert_eq!(tempo_bucket(Some(f64::MIN)), None);
        assert_eq!(tempo_bucket(Some(1e15)).as_deref(), Some("1000000000000000-1000000000000010"));
    }

    #[test]
    fn test_normalize_recording_fills_from_high_level() {
        let high = json!({
            "highlevel": {
                "genre_rosamerica": {"value": "rock", "probability": 0.9},
                "danceability": {"value": "danceable", "probability": 0.9}
            },
            "metadata": {
                "tags": {"artist": ["A"], "title": ["T"]},
                "audio_properties": {"length": 200.0, "replay_gain": -7.0}
            }
        });
        let record = normalize_recording(
            "abc",
            None,
            AnalysisShape::DumpFile(&high).resolve(),
        )
        .unwrap();

        assert_eq!(record.mbid.as_deref(), Some("abc"));
        assert_eq!(record.artist, "A");
        assert_eq!(record.track, "T");
        assert_eq!(record.genres, vec!["rock"]);
        assert_eq!(record.danceable.as_deref(), Some("danceable"));
        assert_eq!(record.audio_features.duration, Some(200.0));
        assert_eq!(record.audio_features.loudness, Some(-7.0));
        assert_eq!(record.audio_features.tempo, None);
    }

    #[test]
    fn test_normalize_recording_low_level_wins_over_fallback() {
        let low = lowlevel_doc();
        let high = json!({"metadata": {"audio_properties": {"length": 1.0, "replay_gain": -1.0}}});
        let record = normalize_recording(
            "abc",
            AnalysisShape::DumpFile(&low).resolve(),
            AnalysisShape::DumpFile(&high).resolve(),
        )
        .unwrap();
        assert_eq!(record.audio_features.duration, Some(240.0));
        assert_eq!(record.audio_features.loudness, Some(-8.5));
    }

    #[test]
    fn test_normalize_recording_nothing_usable() {
        assert!(normalize_recording("abc", None, None).is_none());

        let empty_high = json!({"highlevel": {}});
        let doc = AnalysisShape::DumpFile(&empty_high).resolve();
        assert!(normalize_recording("abc", None, doc).is_none());

        // An empty low-level document still yields a (sparse) record.
        let empty_low = json!({});
        let doc = AnalysisShape::DumpFile(&empty_low).resolve();
        assert!(normalize_recording("abc", doc, None).is_some());
    }
}
