//! Fact store data model and its JSON snapshot.
//!
//! The persisted document is a single object:
//!
//! ```json
//! {
//!   "songs":   {"<mbid>": {"mbid": "...", "artist": "...", "track": "...", "album": "..."}},
//!   "facts":   {"has_tempo": {"<mbid>": 120.5}, "has_genre": {"<mbid>": ["rock"]}},
//!   "indexes": {"by_genre": {"rock": ["<mbid>"]}}
//! }
//! ```
//!
//! All three levels keep document order.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::KbError;
use crate::ordered::OrderedMap;

/// A registered song.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub mbid: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub artist: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub track: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub album: String,
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One fact entry's value.
///
/// An explicit JSON `null` is a present entry, distinct from a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Number(f64),
    Text(String),
    List(Vec<String>),
    /// Anything else found in a hand-edited or foreign document.
    Other(Value),
}

impl FactValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FactValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FactValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for FactValue {
    fn from(n: f64) -> Self {
        FactValue::Number(n)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Text(s.to_string())
    }
}

/// Predicates recorded per song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactType {
    Tempo,
    Key,
    Mode,
    Loudness,
    Duration,
    Genre,
    Danceable,
    VoiceInstrumental,
    Timbre,
    Mood,
}

impl FactType {
    pub const ALL: [FactType; 10] = [
        FactType::Tempo,
        FactType::Key,
        FactType::Mode,
        FactType::Loudness,
        FactType::Duration,
        FactType::Genre,
        FactType::Danceable,
        FactType::VoiceInstrumental,
        FactType::Timbre,
        FactType::Mood,
    ];

    /// Name used in the persisted document, e.g. `has_tempo`.
    pub fn as_str(self) -> &'static str {
        match self {
            FactType::Tempo => "has_tempo",
            FactType::Key => "has_key",
            FactType::Mode => "has_mode",
            FactType::Loudness => "has_loudness",
            FactType::Duration => "has_duration",
            FactType::Genre => "has_genre",
            FactType::Danceable => "has_danceable",
            FactType::VoiceInstrumental => "has_voice_instrumental",
            FactType::Timbre => "has_timbre",
            FactType::Mood => "has_mood",
        }
    }
}

impl AsRef<str> for FactType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactType {
    type Err = KbError;

    /// Accepts either the persisted name (`has_tempo`) or the bare one (`tempo`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        FactType::ALL
            .into_iter()
            .find(|t| t.as_str() == name || t.as_str().strip_prefix("has_") == Some(name.as_str()))
            .ok_or_else(|| KbError::InvalidInput(format!("unknown fact type: {}", s)))
    }
}

/// Inverted indexes from a category label to song ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    TempoRange,
    Genre,
    Danceable,
    VoiceInstrumental,
    Timbre,
    Mood,
}

impl IndexName {
    pub const ALL: [IndexName; 6] = [
        IndexName::TempoRange,
        IndexName::Genre,
        IndexName::Danceable,
        IndexName::VoiceInstrumental,
        IndexName::Timbre,
        IndexName::Mood,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexName::TempoRange => "by_tempo_range",
            IndexName::Genre => "by_genre",
            IndexName::Danceable => "by_danceable",
            IndexName::VoiceInstrumental => "by_voice_instrumental",
            IndexName::Timbre => "by_timbre",
            IndexName::Mood => "by_mood",
        }
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type FactTable = OrderedMap<FactValue>;
pub type Index = OrderedMap<Vec<String>>;

/// The root aggregate: song registry, fact tables and inverted indexes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactStore {
    #[serde(default)]
    pub(crate) songs: OrderedMap<Song>,
    #[serde(default)]
    pub(crate) facts: OrderedMap<FactTable>,
    #[serde(default)]
    pub(crate) indexes: OrderedMap<Index>,
}

impl FactStore {
    /// An empty store with every known fact table and index present.
    pub fn with_schema() -> Self {
        Self {
            songs: OrderedMap::new(),
            facts: FactType::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), OrderedMap::new()))
                .collect(),
            indexes: IndexName::ALL
                .iter()
                .map(|i| (i.as_str().to_string(), OrderedMap::new()))
                .collect(),
        }
    }

    pub fn songs(&self) -> &OrderedMap<Song> {
        &self.songs
    }

    pub fn facts(&self) -> &OrderedMap<FactTable> {
        &self.facts
    }

    pub fn indexes(&self) -> &OrderedMap<Index> {
        &self.indexes
    }

    pub fn song(&self, id: &str) -> Option<&Song> {
        self.songs.get(id)
    }

    /// The table for `fact_type`, if the document has one.
    pub fn fact_table(&self, fact_type: &str) -> Option<&FactTable> {
        self.facts.get(fact_type)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub(crate) fn fact_table_mut(&mut self, fact_type: FactType) -> &mut FactTable {
        self.facts.get_or_insert_with(fact_type.as_str(), OrderedMap::new)
    }

    pub(crate) fn index_mut(&mut self, name: IndexName) -> &mut Index {
        self.indexes.get_or_insert_with(name.as_str(), OrderedMap::new)
    }

    /// Ids referenced by a fact or index entry that are not registered songs.
    pub fn dangling_ids(&self) -> BTreeSet<String> {
        let from_facts = self.facts.values().flat_map(|table| table.keys());
        let from_indexes = self
            .indexes
            .values()
            .flat_map(|index| index.values())
            .flat_map(|ids| ids.iter().map(String::as_str));

        from_facts
            .chain(from_indexes)
            .filter(|id| !self.songs.contains_key(id))
            .map(str::to_string)
            .collect()
    }

    pub fn from_json_str(json: &str) -> Result<Self, KbError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| KbError::from_read(path, e))?;
        serde_json::from_str(&text).map_err(|source| KbError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the snapshot as pretty JSON.
    ///
    /// The document is written to a temporary file next to `path` and
    /// renamed into place, so readers never observe a partial file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KbError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| KbError::io(dir, e))?;

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| KbError::io(dir, e))?;
        if let Err(e) = tmp.write_all(json.as_bytes()).and_then(|_| tmp.flush()) {
            return Err(KbError::io(tmp.path(), e));
        }
        tmp.persist(path).map_err(|e| KbError::io(path, e.error))?;

        debug!(path = %path.display(), songs = self.songs.len(), "saved fact store");
        Ok(())
    }
}
