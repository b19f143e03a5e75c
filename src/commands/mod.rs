pub mod account;
pub mod backtest;
pub mod export_history;
pub mod history;
pub mod tick;
