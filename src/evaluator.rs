use crate::error::EvalError;
use crate::models::{BacktestResult, PriceBar, SignalEvent};
use crate::rule::SignalRule;

/// Evaluation policy knobs. The default mirrors the dashboard's lenient
/// behavior: raw numeric signals are applied as-is and only compared
/// against the canonical values for markers and trade counting.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalOptions {
    /// Reject signal values outside {-1, 0, 1} as a contract violation
    /// instead of accepting them by sign convention.
    pub strict_signals: bool,
}

/// Runs one user rule against one price series and derives the full
/// backtest: lagged strategy returns, equity curve, markers and trade
/// count. Single-shot pure computation, stateless between calls; the
/// input series is never mutated.
pub fn evaluate(series: &[PriceBar], rule: &dyn SignalRule) -> Result<BacktestResult, EvalError> {
    evaluate_with_options(series, rule, EvalOptions::default())
}

pub fn evaluate_with_options(
    series: &[PriceBar],
    rule: &dyn SignalRule,
    options: EvalOptions,
) -> Result<BacktestResult, EvalError> {
    if series.is_empty() {
        return Err(EvalError::EmptySeries);
    }

    let signals = rule.generate_signals(series)?;
    if signals.len() != series.len() {
        return Err(EvalError::StrategyContractViolation(format!(
            "signal sequence length {} does not match series length {}",
            signals.len(),
            series.len()
        )));
    }

    if options.strict_signals {
        if let Some(bad) = signals
            .iter()
            .find(|v| **v != -1.0 && **v != 0.0 && **v != 1.0)
        {
            return Err(EvalError::StrategyContractViolation(format!(
                "signal value {} is outside {{-1, 0, 1}}",
                bad
            )));
        }
    }

    let n = series.len();

    // Simple per-bar return; index 0 has no prior close and contributes
    // nothing. A zero prior close yields a non-finite return that is
    // allowed to propagate (reported downstream, not a crash).
    let mut bar_returns = vec![0.0f64; n];
    for i in 1..n {
        bar_returns[i] = (series[i].close - series[i - 1].close) / series[i - 1].close;
    }

    // Lag by one: a signal observed at bar i-1's close earns bar i's
    // return, which keeps look-ahead bias out of the curve.
    let mut equity = Vec::with_capacity(n);
    equity.push(1.0f64);
    for i in 1..n {
        let strategy_return = signals[i - 1] * bar_returns[i];
        let previous = equity[i - 1];
        equity.push(previous * (1.0 + strategy_return));
    }

    let total_return = equity[n - 1] - 1.0;

    // Trade count is the literal count of non-zero-signal bars, not
    // position transitions. Overstates trade frequency on purpose to
    // stay compatible with what the dashboard already shows.
    let trade_count = signals.iter().filter(|v| **v != 0.0).count();

    let mut buy_events = Vec::new();
    let mut sell_events = Vec::new();
    for (bar, signal) in series.iter().zip(signals.iter()) {
        let event = SignalEvent {
            time: bar.time,
            price: bar.close,
        };
        if *signal == 1.0 {
            buy_events.push(event);
        } else if *signal == -1.0 {
            sell_events.push(event);
        }
    }

    Ok(BacktestResult {
        total_return,
        trade_count,
        equity_curve: equity,
        buy_events,
        sell_events,
    })
}
