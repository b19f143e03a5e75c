use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One OHLC observation from the terminal, ordered ascending by `time`
/// within a series. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Canonical per-bar signal values. The evaluator itself works on raw
/// `f64` signals (lenient sign convention); this enum names the values
/// scripts are expected to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl Signal {
    pub fn value(self) -> f64 {
        match self {
            Signal::Buy => 1.0,
            Signal::Hold => 0.0,
            Signal::Sell => -1.0,
        }
    }
}

/// Bar granularity with the terminal gateway's integer wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Granularity {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Granularity {
    pub fn wire_code(self) -> u32 {
        match self {
            Granularity::M1 => 1,
            Granularity::M5 => 5,
            Granularity::M15 => 15,
            Granularity::M30 => 30,
            Granularity::H1 => 16385,
            Granularity::H4 => 16388,
            Granularity::D1 => 16408,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::M1 => "m1",
            Granularity::M5 => "m5",
            Granularity::M15 => "m15",
            Granularity::M30 => "m30",
            Granularity::H1 => "h1",
            Granularity::H4 => "h4",
            Granularity::D1 => "d1",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tick quote from the terminal (one poll, no streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickQuote {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub login: i64,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub margin_free: f64,
    pub currency: String,
}

/// A buy/sell marker for the chart overlay: the bar's timestamp and
/// close price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalEvent {
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// Outcome of one backtest evaluation. Created once per call and never
/// mutated afterwards; `equity_curve` is aligned 1:1 with the input
/// series and starts at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub total_return: f64,
    pub trade_count: usize,
    pub equity_curve: Vec<f64>,
    pub buy_events: Vec<SignalEvent>,
    pub sell_events: Vec<SignalEvent>,
}

impl BacktestResult {
    /// A zero-close bar upstream produces an infinite or NaN return that
    /// compounds through the curve. That is reported, not fatal; callers
    /// check this flag and log the anomaly.
    pub fn is_non_finite(&self) -> bool {
        !self.total_return.is_finite() || self.equity_curve.iter().any(|v| !v.is_finite())
    }

    /// Wire format consumed by the dashboard: markers as parallel
    /// time/price arrays, timestamps in ISO-8601 UTC.
    pub fn to_json(&self) -> Value {
        json!({
            "total_return": self.total_return,
            "trades": self.trade_count,
            "equity_curve": self.equity_curve,
            "buy_signals": marker_arrays(&self.buy_events),
            "sell_signals": marker_arrays(&self.sell_events),
        })
    }
}

/// Error payload, mutually exclusive with the success fields above.
pub fn error_json(message: &str) -> Value {
    json!({ "error": message })
}

fn marker_arrays(events: &[SignalEvent]) -> Value {
    let times: Vec<String> = events.iter().map(|e| format_event_time(e.time)).collect();
    let prices: Vec<f64> = events.iter().map(|e| e.price).collect();
    json!({ "time": times, "price": prices })
}

pub fn format_event_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Sorts bars ascending by timestamp and drops duplicate timestamps,
/// keeping the last occurrence. The gateway promises oldest-to-newest
/// but the engine normalizes anyway before evaluation.
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by(|a, b| a.time.cmp(&b.time));
    let mut normalized: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        if let Some(previous) = normalized.last_mut() {
            if previous.time == bar.time {
                *previous = bar;
                continue;
            }
        }
        normalized.push(bar);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(hour: u32, close: f64) -> PriceBar {
        PriceBar {
            time: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn normalize_sorts_and_dedups_keeping_last() {
        let bars = vec![bar(2, 103.0), bar(1, 101.0), bar(2, 104.0), bar(0, 100.0)];
        let normalized = normalize_bars(bars);
        assert_eq!(normalized.len(), 3);
        assert!(normalized.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(normalized[2].close, 104.0);
    }

    #[test]
    fn result_json_matches_wire_shape() {
        let result = BacktestResult {
            total_return: 0.05,
            trade_count: 2,
            equity_curve: vec![1.0, 1.02, 1.05],
            buy_events: vec![SignalEvent {
                time: Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap(),
                price: 101.0,
            }],
            sell_events: Vec::new(),
        };

        let value = result.to_json();
        assert_eq!(value["trades"], 2);
        assert_eq!(value["equity_curve"].as_array().unwrap().len(), 3);
        assert_eq!(value["buy_signals"]["time"][0], "2024-03-01T01:00:00Z");
        assert_eq!(value["buy_signals"]["price"][0], 101.0);
        assert_eq!(value["sell_signals"]["time"].as_array().unwrap().len(), 0);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn non_finite_detection() {
        let mut result = BacktestResult {
            total_return: 0.0,
            trade_count: 0,
            equity_curve: vec![1.0, 1.0],
            buy_events: Vec::new(),
            sell_events: Vec::new(),
        };
        assert!(!result.is_non_finite());
        result.equity_curve.push(f64::INFINITY);
        assert!(result.is_non_finite());
    }
}
