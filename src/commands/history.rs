use anyhow::Result;
use log::info;
use serde_json::Value;

use crate::context::AppContext;
use crate::models::Granularity;

pub async fn run(
    app: &AppContext,
    symbol: &str,
    granularity: Granularity,
    count: usize,
) -> Result<Value> {
    let mut bridge = app.bridge()?;
    let bars = bridge.fetch_history(symbol, granularity, count).await?;
    bridge.shutdown();

    info!("Fetched {} {} bars for {}", bars.len(), granularity, symbol);
    Ok(serde_json::to_value(&bars)?)
}
