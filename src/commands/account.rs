use anyhow::Result;
use log::info;
use serde_json::Value;

use crate::context::AppContext;

pub async fn run(app: &AppContext) -> Result<Value> {
    let mut bridge = app.bridge()?;
    let summary = bridge.account_info().await?;
    bridge.shutdown();

    info!(
        "Account {}: balance {:.2} equity {:.2}",
        summary.login, summary.balance, summary.equity
    );
    Ok(serde_json::to_value(&summary)?)
}
