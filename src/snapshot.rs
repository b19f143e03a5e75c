use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Granularity, PriceBar};

const HISTORY_SNAPSHOT_VERSION: u32 = 1;

/// On-disk capture of a fetched history series, so backtests can run
/// against a fixed data set without the terminal gateway.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistorySnapshot {
    version: u32,
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub granularity: Granularity,
    pub bars: Vec<PriceBar>,
}

impl HistorySnapshot {
    pub fn new(symbol: &str, granularity: Granularity, bars: Vec<PriceBar>) -> Self {
        Self {
            version: HISTORY_SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            symbol: symbol.to_string(),
            granularity,
            bars,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create snapshot file {}", path.display()))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open snapshot file {}", path.display()))?;
        let reader = BufReader::new(file);
        let snapshot: Self = bincode::deserialize_from(reader)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        if snapshot.version != HISTORY_SNAPSHOT_VERSION {
            bail!(
                "snapshot {} has version {}, expected {}",
                path.display(),
                snapshot.version,
                HISTORY_SNAPSHOT_VERSION
            );
        }
        Ok(snapshot)
    }
}
