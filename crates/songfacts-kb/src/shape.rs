//! Source-shape normalization for raw analysis documents.
//!
//! AcousticBrainz documents arrive in two layouts:
//!
//! - the bulk API response, keyed by recording id and usually nested one
//!   more level under a `"0"` submission offset:
//!   `{"<mbid>": {"0": {...}}}`
//! - a single document read from a dump file: `{...}`
//!
//! High-level documents may additionally wrap their classifiers in a
//! `"highlevel"` object next to `"metadata"`. [`AnalysisShape::resolve`]
//! collapses all of these into one [`AnalysisDocument`] so that feature
//! extraction never has to care where the JSON came from.

use serde_json::Value;

/// Traverse nested objects by key.
///
/// Returns `None` at the first missing key, non-object intermediate, or
/// JSON `null`.
pub fn get_nested<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Where a raw analysis document came from.
#[derive(Debug, Clone, Copy)]
pub enum AnalysisShape<'a> {
    /// Body of an AcousticBrainz API response for `mbid`.
    ApiResponse { mbid: &'a str, body: &'a Value },
    /// Contents of one dump file.
    DumpFile(&'a Value),
}

impl<'a> AnalysisShape<'a> {
    /// Collapse the source shape into a canonical document.
    ///
    /// Returns `None` when the document for the recording is missing or is
    /// not a JSON object.
    pub fn resolve(self) -> Option<AnalysisDocument<'a>> {
        let root = match self {
            AnalysisShape::DumpFile(value) => value,
            AnalysisShape::ApiResponse { mbid, body } => {
                let by_id = body.as_object()?;
                // The API normalizes ids to lowercase.
                let entry = by_id
                    .get(mbid)
                    .or_else(|| by_id.get(&mbid.to_lowercase()))?;
                match entry.as_object() {
                    Some(offsets) if offsets.len() == 1 && offsets.contains_key("0") => {
                        &offsets["0"]
                    }
                    _ => entry,
                }
            }
        };
        root.is_object().then_some(AnalysisDocument { root })
    }
}

/// A recording's analysis document with its source shape removed.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisDocument<'a> {
    root: &'a Value,
}

impl<'a> AnalysisDocument<'a> {
    /// The whole document (rhythm, tonal, lowlevel and metadata sections).
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// The object holding high-level classifier outputs.
    pub fn classifiers(&self) -> &'a Value {
        match self.root.get("highlevel") {
            Some(inner) if inner.is_object() => inner,
            _ => self.root,
        }
    }
}
