//! MusicBrainz and AcousticBrainz clients for songfacts.
//!
//! Each client owns its own [`ClientConfig`], HTTP connection pool and
//! rate limiter, so independently configured clients can coexist.

mod acousticbrainz;
mod config;
mod error;
mod http;
mod musicbrainz;

pub use acousticbrainz::{AcousticBrainzClient, AcousticFeatures};
pub use config::{ACOUSTICBRAINZ_URL, ClientConfig, DEFAULT_USER_AGENT, MUSICBRAINZ_URL};
pub use error::BrainzError;
pub use http::RateLimiter;
pub use musicbrainz::{MusicBrainzClient, RecordingDetails};
