use anyhow::Result;

use crate::bridge::TerminalBridge;
use crate::config::AppConfig;

/// Shared command context. Holds the settings and hands out terminal
/// bridge handles; each command owns its handle's connect/shutdown
/// lifecycle.
pub struct AppContext {
    config: AppConfig,
}

impl AppContext {
    pub fn initialize(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bridge(&self) -> Result<TerminalBridge> {
        TerminalBridge::new(&self.config)
    }
}
