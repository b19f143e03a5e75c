use std::time::{Duration, Instant};

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope};

use crate::error::EvalError;
use crate::indicators;
use crate::models::PriceBar;

pub const ENTRY_POINT: &str = "generate_signals";

/// The evaluator's seam: anything that maps a price series to one
/// signal value per bar.
pub trait SignalRule {
    fn generate_signals(&self, series: &[PriceBar]) -> Result<Vec<f64>, EvalError>;
}

/// Resource bounds for user scripts. The wall-clock budget is enforced
/// through the interpreter's progress hook, so a runaway script is
/// terminated at the boundary instead of hanging the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    pub timeout_ms: u64,
    pub max_operations: u64,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_operations: 5_000_000,
        }
    }
}

/// A user-supplied strategy rule, compiled from a rhai script that must
/// define `fn generate_signals(bars)` and return one numeric signal per
/// bar. The script runs inside a capability-restricted interpreter: no
/// module imports, bounded depth/size, operation budget and wall-clock
/// timeout. The only host functions visible are the pure indicator
/// helpers.
#[derive(Debug)]
pub struct ScriptRule {
    source: String,
    limits: ScriptLimits,
}

impl ScriptRule {
    pub fn compile(source: &str, limits: ScriptLimits) -> Result<Self, EvalError> {
        let engine = build_engine(&limits);
        let ast = engine
            .compile(source)
            .map_err(|err| EvalError::StrategyExecutionError(err.to_string()))?;

        let defines_entry_point = ast
            .iter_functions()
            .any(|function| function.name == ENTRY_POINT);
        if !defines_entry_point {
            return Err(EvalError::StrategyContractViolation(format!(
                "script must define a '{}(bars)' function",
                ENTRY_POINT
            )));
        }

        Ok(Self {
            source: source.to_string(),
            limits,
        })
    }
}

impl SignalRule for ScriptRule {
    fn generate_signals(&self, series: &[PriceBar]) -> Result<Vec<f64>, EvalError> {
        let mut engine = build_engine(&self.limits);

        let deadline = Duration::from_millis(self.limits.timeout_ms);
        let started = Instant::now();
        engine.on_progress(move |_| {
            if started.elapsed() > deadline {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        // Compiled in `compile` already; recompiling per run keeps the
        // rule Send + Sync without sharing interpreter state between
        // invocations.
        let ast = engine
            .compile(&self.source)
            .map_err(|err| EvalError::StrategyExecutionError(err.to_string()))?;

        let mut scope = Scope::new();
        let output = engine
            .call_fn::<Dynamic>(&mut scope, &ast, ENTRY_POINT, (series_map(series),))
            .map_err(|err| map_script_error(*err, self.limits.timeout_ms))?;

        if output.is_unit() {
            return Err(EvalError::StrategyContractViolation(
                "strategy returned no signal sequence".to_string(),
            ));
        }

        let array = output.try_cast::<Array>().ok_or_else(|| {
            EvalError::StrategyContractViolation(
                "strategy must return an array of signals".to_string(),
            )
        })?;

        let mut signals = Vec::with_capacity(array.len());
        for (index, value) in array.iter().enumerate() {
            let signal = numeric_value(value).ok_or_else(|| {
                EvalError::StrategyContractViolation(format!(
                    "signal at index {} is not numeric",
                    index
                ))
            })?;
            signals.push(signal);
        }

        Ok(signals)
    }
}

fn map_script_error(err: EvalAltResult, limit_ms: u64) -> EvalError {
    match err {
        EvalAltResult::ErrorTerminated(..) => EvalError::StrategyTimeout { limit_ms },
        EvalAltResult::ErrorFunctionNotFound(ref name, ..) if name.starts_with(ENTRY_POINT) => {
            EvalError::StrategyContractViolation(format!(
                "script must define a '{}(bars)' function",
                ENTRY_POINT
            ))
        }
        other => EvalError::StrategyExecutionError(other.to_string()),
    }
}

fn numeric_value(value: &Dynamic) -> Option<f64> {
    if let Ok(float) = value.as_float() {
        Some(float)
    } else if let Ok(int) = value.as_int() {
        Some(int as f64)
    } else {
        None
    }
}

/// The script sees the series as a map of parallel arrays, mirroring
/// the columns the dashboard plots.
fn series_map(series: &[PriceBar]) -> Map {
    let mut bars = Map::new();
    bars.insert(
        "time".into(),
        collect_array(series, |b| Dynamic::from(b.time.timestamp())),
    );
    bars.insert(
        "open".into(),
        collect_array(series, |b| Dynamic::from(b.open)),
    );
    bars.insert(
        "high".into(),
        collect_array(series, |b| Dynamic::from(b.high)),
    );
    bars.insert("low".into(), collect_array(series, |b| Dynamic::from(b.low)));
    bars.insert(
        "close".into(),
        collect_array(series, |b| Dynamic::from(b.close)),
    );
    bars.insert(
        "volume".into(),
        collect_array(series, |b| Dynamic::from(b.volume)),
    );
    bars
}

fn collect_array<F>(series: &[PriceBar], field: F) -> Dynamic
where
    F: Fn(&PriceBar) -> Dynamic,
{
    let array: Array = series.iter().map(field).collect();
    array.into()
}

fn build_engine(limits: &ScriptLimits) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_array_size(1_000_000);
    engine.set_max_string_size(1_000_000);
    engine.set_max_modules(0);
    register_indicators(&mut engine);
    engine
}

fn register_indicators(engine: &mut Engine) {
    engine.register_fn("sma", |values: Array, period: i64| -> Array {
        to_dynamic_array(indicators::sma(&to_prices(&values), clamp_period(period)))
    });
    engine.register_fn("ema", |values: Array, period: i64| -> Array {
        to_dynamic_array(indicators::ema(&to_prices(&values), clamp_period(period)))
    });
    engine.register_fn("rsi", |values: Array, period: i64| -> Array {
        to_dynamic_array(indicators::rsi(&to_prices(&values), clamp_period(period)))
    });
    engine.register_fn(
        "macd_line",
        |values: Array, fast: i64, slow: i64, signal: i64| -> Array {
            let (line, _, _) = indicators::macd(
                &to_prices(&values),
                clamp_period(fast),
                clamp_period(slow),
                clamp_period(signal),
            );
            to_dynamic_array(line)
        },
    );
    engine.register_fn(
        "macd_signal",
        |values: Array, fast: i64, slow: i64, signal: i64| -> Array {
            let (_, signal_line, _) = indicators::macd(
                &to_prices(&values),
                clamp_period(fast),
                clamp_period(slow),
                clamp_period(signal),
            );
            to_dynamic_array(signal_line)
        },
    );
    engine.register_fn(
        "bb_upper",
        |values: Array, period: i64, std_dev: f64| -> Array {
            let (upper, _, _) =
                indicators::bollinger_bands(&to_prices(&values), clamp_period(period), std_dev);
            to_dynamic_array(upper)
        },
    );
    engine.register_fn(
        "bb_lower",
        |values: Array, period: i64, std_dev: f64| -> Array {
            let (_, _, lower) =
                indicators::bollinger_bands(&to_prices(&values), clamp_period(period), std_dev);
            to_dynamic_array(lower)
        },
    );
}

fn clamp_period(period: i64) -> usize {
    period.max(0) as usize
}

fn to_prices(values: &Array) -> Vec<f64> {
    values
        .iter()
        .map(|v| numeric_value(v).unwrap_or(f64::NAN))
        .collect()
}

fn to_dynamic_array(values: Vec<f64>) -> Array {
    values.into_iter().map(Dynamic::from).collect()
}
