pub mod bridge;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod indicators;
pub mod models;
pub mod rule;
pub mod snapshot;
