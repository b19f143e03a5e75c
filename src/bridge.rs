use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::BridgeError;
use crate::models::{normalize_bars, AccountSummary, Granularity, PriceBar, TickQuote};

/// Connection handle to the locally running trading terminal's HTTP
/// gateway. The lifecycle is explicit and owned by the caller:
/// `connect` moves the handle to Connected, failed requests drop it
/// back to Disconnected, `ensure_connected` re-establishes on demand
/// and `shutdown` ends the session. No global state.
pub struct TerminalBridge {
    http: Client,
    base_url: String,
    state: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

#[derive(Deserialize)]
struct GatewayStatus {
    status: String,
    #[serde(default)]
    terminal_connected: bool,
}

#[derive(Deserialize)]
struct BarRecord {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

#[derive(Deserialize)]
struct TickRecord {
    time: i64,
    bid: f64,
    ask: f64,
    #[serde(default)]
    last: Option<f64>,
    #[serde(default)]
    volume: Option<i64>,
}

impl TerminalBridge {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to create terminal gateway HTTP client")?;

        Ok(Self {
            http,
            base_url: config.terminal_api_url.trim_end_matches('/').to_string(),
            state: ConnectionState::Disconnected,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub async fn connect(&mut self) -> Result<(), BridgeError> {
        let status: GatewayStatus = self.get("/status").await?;
        if !status.terminal_connected {
            self.state = ConnectionState::Disconnected;
            return Err(BridgeError::Unavailable(format!(
                "gateway is {} but the terminal session is down",
                status.status
            )));
        }
        self.state = ConnectionState::Connected;
        info!("Connected to terminal gateway at {}", self.base_url);
        Ok(())
    }

    pub async fn ensure_connected(&mut self) -> Result<(), BridgeError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        self.connect().await
    }

    pub fn shutdown(&mut self) {
        if self.state == ConnectionState::Connected {
            info!("Terminal gateway session closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Fetches `count` bars of history, oldest to newest. A 404 from
    /// the gateway means the symbol or feed is unavailable and maps to
    /// `SymbolNotFound` (an input precondition failure for callers, not
    /// an evaluator fault).
    pub async fn fetch_history(
        &mut self,
        symbol: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<PriceBar>, BridgeError> {
        self.ensure_connected().await?;

        let path = format!(
            "/history/{}?timeframe={}&num_candles={}",
            symbol,
            granularity.wire_code(),
            count.max(1)
        );
        let records: Vec<BarRecord> = match self.get(&path).await {
            Ok(records) => records,
            Err(BridgeError::Http { status: 404, .. }) => {
                return Err(BridgeError::SymbolNotFound(symbol.to_string()));
            }
            Err(err) => return Err(self.drop_on_unavailable(err)),
        };

        let bars: Vec<PriceBar> = records
            .into_iter()
            .map(|r| PriceBar {
                time: epoch_to_utc(r.time),
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            })
            .collect();

        // Gateway promises ascending order; normalize anyway so the
        // evaluator's ordering precondition always holds.
        Ok(normalize_bars(bars))
    }

    /// One tick quote, single poll. Streaming transports live elsewhere.
    pub async fn latest_tick(&mut self, symbol: &str) -> Result<TickQuote, BridgeError> {
        self.ensure_connected().await?;

        let path = format!("/tick/{}", symbol);
        let record: TickRecord = match self.get(&path).await {
            Ok(record) => record,
            Err(BridgeError::Http { status: 404, .. }) => {
                return Err(BridgeError::SymbolNotFound(symbol.to_string()));
            }
            Err(err) => return Err(self.drop_on_unavailable(err)),
        };

        Ok(TickQuote {
            symbol: symbol.to_string(),
            time: epoch_to_utc(record.time),
            bid: record.bid,
            ask: record.ask,
            last: record.last,
            volume: record.volume,
        })
    }

    pub async fn account_info(&mut self) -> Result<AccountSummary, BridgeError> {
        self.ensure_connected().await?;
        match self.get("/account").await {
            Ok(summary) => Ok(summary),
            Err(err) => Err(self.drop_on_unavailable(err)),
        }
    }

    fn drop_on_unavailable(&mut self, err: BridgeError) -> BridgeError {
        if matches!(err, BridgeError::Unavailable(_)) {
            warn!("Terminal gateway became unavailable; handle disconnected");
            self.state = ConnectionState::Disconnected;
        }
        err
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| BridgeError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Http {
                status: 404,
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| BridgeError::Unavailable(format!("invalid gateway response: {}", err)))
    }
}

fn epoch_to_utc(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}
