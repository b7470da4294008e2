//! MusicBrainz client: recording search and credits lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::BrainzError;
use crate::http::HttpCore;

const RECORDING_ENDPOINT: &str = "/ws/2/recording";
const SEARCH_LIMIT: &str = "5";
const DETAIL_INCLUDES: &str = "artist-credits+releases+artist-rels+work-rels";

/// Credits and language for one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingDetails {
    pub mbid: String,
    pub title: String,
    /// First credited artist.
    pub artist: String,
    pub featured_artists: Vec<String>,
    pub writers: Vec<String>,
    pub producers: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordingResponse {
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: Option<String>,
    artist: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    kind: Option<String>,
    artist: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(rename = "text-representation")]
    text_representation: Option<TextRepresentation>,
}

#[derive(Debug, Deserialize)]
struct TextRepresentation {
    language: Option<String>,
}

/// Client for the MusicBrainz web service (JSON).
pub struct MusicBrainzClient {
    core: HttpCore,
}

impl MusicBrainzClient {
    pub fn new(config: ClientConfig) -> Result<Self, BrainzError> {
        Ok(Self {
            core: HttpCore::new(config)?,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.core.config()
    }

    /// Best-matching recording id for an artist/title pair.
    pub async fn search_recording(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Option<String>, BrainzError> {
        let query = search_query(artist, track);
        let Some(body) = self
            .core
            .get_json(
                RECORDING_ENDPOINT,
                &[
                    ("query", query.as_str()),
                    ("limit", SEARCH_LIMIT),
                    ("fmt", "json"),
                ],
            )
            .await?
        else {
            return Ok(None);
        };

        let response: SearchResponse = serde_json::from_value(body)?;
        let mbid = response
            .recordings
            .into_iter()
            .next()
            .and_then(|hit| hit.id)
            .filter(|id| !id.is_empty());
        debug!(artist, track, found = mbid.is_some(), "musicbrainz search");
        Ok(mbid)
    }

    /// Credits, relations and language for a recording.
    pub async fn recording_details(
        &self,
        mbid: &str,
    ) -> Result<Option<RecordingDetails>, BrainzError> {
        let endpoint = format!("{}/{}", RECORDING_ENDPOINT, mbid);
        let body = self
            .core
            .get_json(&endpoint, &[("inc", DETAIL_INCLUDES), ("fmt", "json")])
            .await?;
        body.map(|body| parse_details(mbid, body)).transpose()
    }
}

/// Lucene query matching the title and, when given, the artist.
fn search_query(artist: &str, track: &str) -> String {
    let quote = |s: &str| s.trim().replace('\\', "\\\\").replace('"', "\\\"");
    if artist.trim().is_empty() {
        format!("recording:\"{}\"", quote(track))
    } else {
        format!("recording:\"{}\" AND artist:\"{}\"", quote(track), quote(artist))
    }
}

fn parse_details(mbid: &str, body: Value) -> Result<RecordingDetails, BrainzError> {
    if !body.is_object() {
        return Err(BrainzError::InvalidResponse(format!(
            "recording {} is not a JSON object",
            mbid
        )));
    }
    let recording: RecordingResponse = serde_json::from_value(body)?;

    let mut credited = recording.artist_credit.into_iter().filter_map(|credit| {
        credit
            .artist
            .and_then(|a| a.name)
            .or(credit.name)
            .filter(|name| !name.is_empty())
    });
    let artist = credited.next().unwrap_or_default();
    let featured_artists = credited.collect();

    let mut writers = Vec::new();
    let mut producers = Vec::new();
    for relation in recording.relations {
        let Some(name) = relation.artist.and_then(|a| a.name).filter(|n| !n.is_empty()) else {
            continue;
        };
        let kind = relation.kind.unwrap_or_default().to_lowercase();
        if kind.contains("producer") {
            push_unique(&mut producers, name);
        } else if ["writer", "composer", "lyricist"].iter().any(|k| kind.contains(k)) {
            push_unique(&mut writers, name);
        }
    }

    let language = recording.releases.into_iter().find_map(|release| {
        release
            .text_representation
            .and_then(|t| t.language)
            .filter(|l| !l.is_empty())
    });

    Ok(RecordingDetails {
        mbid: mbid.to_string(),
        title: recording.title.unwrap_or_default(),
        artist,
        featured_artists,
        writers,
        producers,
        language,
    })
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_search_query_escapes_quotes() {
        assert_eq!(
            search_query("The \"Band\"", " Hey Jude "),
            r#"recording:"Hey Jude" AND artist:"The \"Band\"""#
        );
        assert_eq!(search_query("", "Intro"), r#"recording:"Intro""#);
    }

    #[test]
    fn test_parse_details_credits_and_relations() {
        let body = json!({
            "title": "Hey Jude",
            "artist-credit": [
                {"name": "The Beatles", "artist": {"name": "The Beatles"}},
                {"name": "Guest"}
            ],
            "relations": [
                {"type": "producer", "artist": {"name": "George Martin"}},
                {"type": "composer", "artist": {"name": "Paul McCartney"}},
                {"type": "lyricist", "artist": {"name": "Paul McCartney"}},
                {"type": "performer", "artist": {"name": "Ringo Starr"}},
                {"type": "writer", "work": {"title": "Hey Jude"}}
            ],
            "releases": [
                {"text-representation": {"language": null}},
                {"text-representation": {"language": "eng"}}
            ]
        });

        let details = parse_details("m-1", body).unwrap();
        assert_eq!(
            details,
            RecordingDetails {
                mbid: "m-1".to_string(),
                title: "Hey Jude".to_string(),
                artist: "The Beatles".to_string(),
                featured_artists: vec!["Guest".to_string()],
                writers: vec!["Paul McCartney".to_string()],
                producers: vec!["George Martin".to_string()],
                language: Some("eng".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_details_sparse_recording() {
        let details = parse_details("m-2", json!({})).unwrap();
        assert_eq!(details.artist, "");
        assert!(details.featured_artists.is_empty());
        assert_eq!(details.language, None);

        assert!(parse_details("m-3", json!([])).is_err());
    }
}
