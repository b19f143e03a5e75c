use anyhow::Result;
use log::info;
use serde_json::Value;

use crate::context::AppContext;

pub async fn run(app: &AppContext, symbol: &str) -> Result<Value> {
    let mut bridge = app.bridge()?;
    let quote = bridge.latest_tick(symbol).await?;
    bridge.shutdown();

    info!("Tick for {}: bid {} ask {}", symbol, quote.bid, quote.ask);
    Ok(serde_json::to_value(&quote)?)
}
