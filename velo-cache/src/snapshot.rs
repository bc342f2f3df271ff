//! Newline-delimited snapshot encoding for warm starts.
//!
//! One JSON record per line, each tagged with a schema version so newer
//! engines can skip records they no longer understand.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::warn;
use velo_core::constants::SNAPSHOT_SCHEMA_VERSION;
use velo_core::errors::VeloResult;

use crate::entry::CacheEntry;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    schema_version: u32,
    #[serde(flatten)]
    entry: CacheEntry,
}

/// Write one record per line.
pub fn export<'a, W: Write>(
    entries: impl Iterator<Item = &'a CacheEntry>,
    writer: &mut W,
) -> VeloResult<()> {
    for entry in entries {
        let record = SnapshotRecord {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            entry: entry.clone(),
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Read records back, skipping unreadable lines and unknown schema
/// versions with a warning.
pub fn import<R: BufRead>(reader: R) -> VeloResult<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SnapshotRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "skipping unreadable cache snapshot line");
                continue;
            }
        };
        if record.schema_version != SNAPSHOT_SCHEMA_VERSION {
            warn!(
                version = record.schema_version,
                "skipping cache snapshot record with unknown schema version"
            );
            continue;
        }
        entries.push(record.entry);
    }
    Ok(entries)
}
