//! Per-song records consumed by the fact store builder.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KbError;

/// Low-level signal features of one recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Beats per minute.
    pub tempo: Option<f64>,
    /// Key with scale, e.g. `"C major"`.
    pub key: Option<String>,
    /// Lowercase scale name.
    pub mode: Option<String>,
    pub time_signature: Option<i64>,
    /// Average loudness (or replay gain) in dB.
    pub loudness: Option<f64>,
    /// Length in seconds.
    pub duration: Option<f64>,
}

impl AudioFeatures {
    pub fn is_empty(&self) -> bool {
        *self == AudioFeatures::default()
    }

    fn from_json(value: &Value) -> Self {
        Self {
            tempo: value.get("tempo").and_then(number),
            key: value.get("key").and_then(text),
            mode: value.get("mode").and_then(text),
            time_signature: value.get("time_signature").and_then(number).map(|n| n as i64),
            loudness: value.get("loudness").and_then(number),
            duration: value.get("duration").and_then(number),
        }
    }
}

/// One song's normalized facts, as produced by the normalizer or the API
/// collection pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Recording identifier. Records without one are skipped by the builder.
    pub mbid: Option<String>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub track: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub audio_features: AudioFeatures,
    #[serde(default)]
    pub genres: Vec<String>,
    pub danceable: Option<String>,
    pub voice_instrumental: Option<String>,
    pub timbre: Option<String>,
    #[serde(default)]
    pub moods: Vec<String>,
}

impl SongRecord {
    /// Convert an arbitrary JSON value into a record.
    ///
    /// Wrong-typed fields are treated as absent. Returns `None` only when the
    /// value is not an object at all.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            mbid: value.get("mbid").and_then(text),
            artist: value.get("artist").and_then(text).unwrap_or_default(),
            track: value.get("track").and_then(text).unwrap_or_default(),
            album: value.get("album").and_then(text).unwrap_or_default(),
            audio_features: value
                .get("audio_features")
                .map(AudioFeatures::from_json)
                .unwrap_or_default(),
            genres: string_list(value.get("genres")),
            danceable: value.get("danceable").and_then(text),
            voice_instrumental: value.get("voice_instrumental").and_then(text),
            timbre: value.get("timbre").and_then(text),
            moods: string_list(value.get("moods")),
        })
    }

    /// Read a JSON array of song records from disk.
    ///
    /// Elements that are not objects are dropped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Self>, KbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| KbError::from_read(path, e))?;
        let values: Vec<Value> =
            serde_json::from_str(&text).map_err(|source| KbError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(values.iter().filter_map(Self::from_json).collect())
    }
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(text).collect())
        .unwrap_or_default()
}
