use std::path::Path;

use anyhow::Result;
use log::info;
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::models::Granularity;
use crate::snapshot::HistorySnapshot;

pub async fn run(
    app: &AppContext,
    symbol: &str,
    granularity: Granularity,
    count: usize,
    output: &Path,
) -> Result<Value> {
    let mut bridge = app.bridge()?;
    let bars = bridge.fetch_history(symbol, granularity, count).await?;
    bridge.shutdown();

    let snapshot = HistorySnapshot::new(symbol, granularity, bars);
    snapshot.save_to_file(output)?;

    info!(
        "Exported {} bars for {} to {}",
        snapshot.bars.len(),
        symbol,
        output.display()
    );
    Ok(json!({
        "symbol": symbol,
        "granularity": granularity.as_str(),
        "bars": snapshot.bars.len(),
        "path": output.display().to_string(),
    }))
}
