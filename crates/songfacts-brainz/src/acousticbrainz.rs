//! AcousticBrainz client for low-level and high-level analysis documents.

use serde_json::Value;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::BrainzError;
use crate::http::HttpCore;

const LOW_LEVEL_ENDPOINT: &str = "/api/v1/low-level";
const HIGH_LEVEL_ENDPOINT: &str = "/api/v1/high-level";

/// Both analysis responses for one recording, as returned by the API.
///
/// Each body is keyed by recording id: `{"<mbid>": {"0": {...}}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticFeatures {
    pub mbid: String,
    pub low_level: Option<Value>,
    pub high_level: Option<Value>,
}

/// Client for the AcousticBrainz bulk API.
pub struct AcousticBrainzClient {
    core: HttpCore,
}

impl AcousticBrainzClient {
    pub fn new(config: ClientConfig) -> Result<Self, BrainzError> {
        Ok(Self {
            core: HttpCore::new(config)?,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.core.config()
    }

    /// Fetch the low-level response body for a recording.
    ///
    /// Returns `None` when the service has no document for it.
    pub async fn low_level(&self, mbid: &str) -> Result<Option<Value>, BrainzError> {
        let body = self
            .core
            .get_json(LOW_LEVEL_ENDPOINT, &[("recording_ids", mbid)])
            .await?;
        Ok(body.filter(|b| contains_recording(b, mbid)))
    }

    /// Fetch the high-level response body, with class names mapped to labels.
    pub async fn high_level(&self, mbid: &str) -> Result<Option<Value>, BrainzError> {
        let body = self
            .core
            .get_json(
                HIGH_LEVEL_ENDPOINT,
                &[("recording_ids", mbid), ("map_classes", "true")],
            )
            .await?;
        Ok(body.filter(|b| contains_recording(b, mbid)))
    }

    /// Fetch both documents. Failures of either endpoint are logged and
    /// treated as missing; `None` means neither was available.
    pub async fn features(&self, mbid: &str) -> Option<AcousticFeatures> {
        let low_level = self.low_level(mbid).await.unwrap_or_else(|e| {
            warn!(mbid = %mbid, error = %e, "acousticbrainz low-level request failed");
            None
        });
        let high_level = self.high_level(mbid).await.unwrap_or_else(|e| {
            warn!(mbid = %mbid, error = %e, "acousticbrainz high-level request failed");
            None
        });

        if low_level.is_none() && high_level.is_none() {
            return None;
        }
        Some(AcousticFeatures {
            mbid: mbid.to_string(),
            low_level,
            high_level,
        })
    }
}

/// The service lowercases ids in its response keys.
fn contains_recording(body: &Value, mbid: &str) -> bool {
    body.as_object()
        .is_some_and(|m| m.contains_key(mbid) || m.contains_key(&mbid.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains_recording() {
        assert!(contains_recording(&json!({"abc": {}}), "abc"));
        assert!(contains_recording(&json!({"abc": {}}), "ABC"));
        assert!(!contains_recording(&json!({}), "abc"));
        assert!(!contains_recording(&json!([]), "abc"));
    }
}
