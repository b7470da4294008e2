//! Song fact store for songfacts.
//!
//! This crate provides functionality to:
//! - Normalize raw AcousticBrainz analysis documents into song records
//! - Fold song records into a fact store with inverted indexes
//! - Persist and load fact store snapshots
//! - Answer point, indexed, range and name queries over a snapshot
//! - Build a fact store straight from an on-disk dump

pub mod builder;
pub mod dump;
mod error;
pub mod normalizer;
mod ordered;
pub mod query;
pub mod record;
pub mod shape;
pub mod store;

pub use builder::{FactStoreBuilder, build_fact_store};
pub use dump::{DiscoveredRecording, DumpFiles, DumpReport, build_from_dump, discover_dump_files};
pub use error::KbError;
pub use normalizer::{TrackMetadata, normalize_recording, tempo_bucket};
pub use ordered::OrderedMap;
pub use query::QueryEngine;
pub use record::{AudioFeatures, SongRecord};
pub use shape::{AnalysisDocument, AnalysisShape};
pub use store::{FactStore, FactType, FactValue, IndexName, Song};
