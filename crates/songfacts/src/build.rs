//! Fact store build commands.

use std::path::Path;

use miette::Result;
use tracing::info;

use songfacts_kb::{SongRecord, build_fact_store, build_from_dump};

/// Build a fact store from a dump directory and save it.
pub fn run_dump(dump_root: &Path, output: &Path, limit: Option<usize>) -> Result<()> {
    info!(root = %dump_root.display(), "building fact store from dump");

    let (store, report) =
        build_from_dump(dump_root, limit).map_err(|e| miette::miette!("dump build failed: {}", e))?;
    store
        .save(output)
        .map_err(|e| miette::miette!("failed to save fact store: {}", e))?;

    info!(
        discovered = report.discovered,
        loaded = report.loaded,
        empty = report.empty,
        songs = store.songs().len(),
        output = %output.display(),
        "fact store written"
    );
    Ok(())
}

/// Build a fact store from a JSON array of song records and save it.
pub fn run_records(input: &Path, output: &Path) -> Result<()> {
    let records = SongRecord::read_all(input)
        .map_err(|e| miette::miette!("failed to read song records: {}", e))?;
    info!(records = records.len(), input = %input.display(), "building fact store");

    let store = build_fact_store(&records);
    store
        .save(output)
        .map_err(|e| miette::miette!("failed to save fact store: {}", e))?;

    info!(songs = store.songs().len(), output = %output.display(), "fact store written");
    Ok(())
}
