//! Newline-delimited snapshot encoding for the tab table.
//!
//! Same shape as the cache snapshot: one versioned JSON record per line,
//! unknown versions skipped with a warning.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::warn;
use velo_core::constants::SNAPSHOT_SCHEMA_VERSION;
use velo_core::errors::VeloResult;

use crate::record::TabRecord;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    schema_version: u32,
    #[serde(flatten)]
    record: TabRecord,
}

/// Write one record per line.
pub fn export<'a, W: Write>(
    records: impl Iterator<Item = &'a TabRecord>,
    writer: &mut W,
) -> VeloResult<()> {
    for record in records {
        let line = SnapshotRecord {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            record: record.clone(),
        };
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Read records back, skipping unreadable lines and unknown schema
/// versions with a warning.
pub fn import<R: BufRead>(reader: R) -> VeloResult<Vec<TabRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: SnapshotRecord = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(%error, "skipping unreadable tab snapshot line");
                continue;
            }
        };
        if parsed.schema_version != SNAPSHOT_SCHEMA_VERSION {
            warn!(
                version = parsed.schema_version,
                "skipping tab snapshot record with unknown schema version"
            );
            continue;
        }
        records.push(parsed.record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TabState;
    use chrono::Utc;

    #[test]
    fn round_trips_records() {
        let records = vec![TabRecord {
            tab_id: "tab-1".into(),
            memory_usage_bytes: 4096,
            is_pinned: false,
            is_active: false,
            last_active_at: Utc::now(),
            state: TabState::Suspended,
            needs_reload: false,
        }];
        let mut buffer = Vec::new();
        export(records.iter(), &mut buffer).unwrap();
        let restored = import(buffer.as_slice()).unwrap();
        assert_eq!(restored, records);
    }
}
