use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::rule::ScriptLimits;

pub const DEFAULT_TERMINAL_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the terminal's local HTTP gateway.
    pub terminal_api_url: String,
    pub http_timeout: Duration,
    pub script_limits: ScriptLimits,
    /// When set, rule output values outside {-1, 0, 1} are rejected
    /// instead of being used as raw position weights.
    pub strict_signals: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let terminal_api_url = vars
            .get("TERMINAL_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TERMINAL_API_URL.to_string());

        let timeout_secs = parse_u64_in_range(
            vars,
            "TERMINAL_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
            1,
            300,
        )?;

        let defaults = ScriptLimits::default();
        let timeout_ms = parse_u64_in_range(
            vars,
            "SCRIPT_TIMEOUT_MS",
            defaults.timeout_ms,
            1,
            600_000,
        )?;
        let max_operations = parse_u64_in_range(
            vars,
            "SCRIPT_MAX_OPERATIONS",
            defaults.max_operations,
            1,
            u64::MAX,
        )?;

        let strict_signals = parse_bool(vars, "STRICT_SIGNALS", false)?;

        Ok(Self {
            terminal_api_url,
            http_timeout: Duration::from_secs(timeout_secs),
            script_limits: ScriptLimits {
                timeout_ms,
                max_operations,
            },
            strict_signals,
        })
    }
}

fn parse_u64_in_range(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64> {
    let raw = match vars.get(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => return Ok(default),
    };
    let value: u64 = match raw.parse() {
        Ok(value) => value,
        Err(_) => bail!("{} must be an integer, got {:?}", key, raw),
    };
    if value < min || value > max {
        bail!("{} must be between {} and {}, got {}", key, min, max, value);
    }
    Ok(value)
}

fn parse_bool(vars: &HashMap<String, String>, key: &str, default: bool) -> Result<bool> {
    let raw = match vars.get(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => return Ok(default),
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("{} must be a boolean, got {:?}", key, other),
    }
}
