//! Warm-start snapshots: NDJSON files for cache entries and tab records.
//!
//! A missing snapshot file is not an error; the engine simply starts cold.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;
use velo_cache::PredictiveCache;
use velo_core::VeloResult;
use velo_tabs::TabResourceManager;

pub const CACHE_SNAPSHOT_FILE: &str = "cache.ndjson";
pub const TABS_SNAPSHOT_FILE: &str = "tabs.ndjson";

/// Persist the cache and tab table under `dir`.
pub fn save(dir: &Path, cache: &PredictiveCache, tabs: &TabResourceManager) -> VeloResult<()> {
    std::fs::create_dir_all(dir)?;

    let mut cache_writer = BufWriter::new(File::create(dir.join(CACHE_SNAPSHOT_FILE))?);
    velo_cache::snapshot::export(cache.entries(), &mut cache_writer)?;
    cache_writer.flush()?;

    let mut tabs_writer = BufWriter::new(File::create(dir.join(TABS_SNAPSHOT_FILE))?);
    velo_tabs::snapshot::export(tabs.records(), &mut tabs_writer)?;
    tabs_writer.flush()?;

    info!(dir = %dir.display(), entries = cache.len(), tabs = tabs.len(), "snapshot saved");
    Ok(())
}

/// Load a prior snapshot into the given stores. Returns how many cache
/// entries and tab records were restored.
pub fn load(
    dir: &Path,
    cache: &mut PredictiveCache,
    tabs: &mut TabResourceManager,
) -> VeloResult<(usize, usize)> {
    let mut restored = (0, 0);

    let cache_path = dir.join(CACHE_SNAPSHOT_FILE);
    if cache_path.exists() {
        let entries = velo_cache::snapshot::import(BufReader::new(File::open(&cache_path)?))?;
        restored.0 = entries.len();
        cache.restore(entries);
    }

    let tabs_path = dir.join(TABS_SNAPSHOT_FILE);
    if tabs_path.exists() {
        let records = velo_tabs::snapshot::import(BufReader::new(File::open(&tabs_path)?))?;
        restored.1 = records.len();
        tabs.restore(records);
    }

    if restored != (0, 0) {
        info!(
            dir = %dir.display(),
            entries = restored.0,
            tabs = restored.1,
            "warm start restored snapshot"
        );
    }
    Ok(restored)
}
