use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::Value;

use crate::context::AppContext;
use crate::evaluator::{evaluate_with_options, EvalOptions};
use crate::models::{error_json, Granularity, PriceBar};
use crate::rule::ScriptRule;
use crate::snapshot::HistorySnapshot;

/// Runs a scripted strategy over history and reports the outcome as a
/// JSON document. Rule faults (contract violations, script errors,
/// timeouts) are part of the reported outcome, not process failures;
/// only missing inputs and gateway problems surface as errors.
pub async fn run(
    app: &AppContext,
    symbol: &str,
    granularity: Granularity,
    count: usize,
    script_path: &Path,
    data_file: Option<&Path>,
) -> Result<Value> {
    let source = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;

    let bars = load_series(app, symbol, granularity, count, data_file).await?;

    let rule = match ScriptRule::compile(&source, app.config().script_limits) {
        Ok(rule) => rule,
        Err(err) => {
            warn!("Strategy script rejected: {}", err);
            return Ok(error_json(&err.to_string()));
        }
    };

    let options = EvalOptions {
        strict_signals: app.config().strict_signals,
    };
    match evaluate_with_options(&bars, &rule, options) {
        Ok(result) => {
            if result.is_non_finite() {
                warn!(
                    "Backtest for {} produced non-finite values; check the input series",
                    symbol
                );
            }
            info!(
                "Backtest for {}: total return {:.4} over {} trades",
                symbol, result.total_return, result.trade_count
            );
            Ok(result.to_json())
        }
        Err(err) => {
            warn!("Backtest for {} failed: {}", symbol, err);
            Ok(error_json(&err.to_string()))
        }
    }
}

async fn load_series(
    app: &AppContext,
    symbol: &str,
    granularity: Granularity,
    count: usize,
    data_file: Option<&Path>,
) -> Result<Vec<PriceBar>> {
    match data_file {
        Some(path) => {
            let snapshot = HistorySnapshot::load_from_file(path)?;
            if snapshot.symbol != symbol {
                warn!(
                    "Snapshot {} holds {} data, requested {}",
                    path.display(),
                    snapshot.symbol,
                    symbol
                );
            }
            info!(
                "Loaded {} bars from snapshot {}",
                snapshot.bars.len(),
                path.display()
            );
            Ok(snapshot.bars)
        }
        None => {
            let mut bridge = app.bridge()?;
            let bars = bridge.fetch_history(symbol, granularity, count).await?;
            bridge.shutdown();
            Ok(bars)
        }
    }
}
