use thiserror::Error;

/// Faults the evaluator can produce. Everything raised inside a user
/// rule is caught at the invocation boundary and converted into one of
/// these; a rule fault never escapes to the caller uncaught.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("price series is empty")]
    EmptySeries,

    /// The rule broke its output contract: missing entry point, wrong
    /// sequence length, or (in strict mode) an out-of-range value.
    #[error("strategy contract violation: {0}")]
    StrategyContractViolation(String),

    /// A runtime fault inside the user rule, carrying the underlying
    /// interpreter message.
    #[error("strategy execution failed: {0}")]
    StrategyExecutionError(String),

    /// The rule hit the wall-clock budget and was terminated.
    #[error("strategy timed out after {limit_ms} ms")]
    StrategyTimeout { limit_ms: u64 },
}

/// Upstream data-provider failures. These are input precondition
/// failures from the evaluator's point of view, never its own fault.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("symbol {0} not found or data unavailable on the terminal")]
    SymbolNotFound(String),

    #[error("terminal gateway unavailable: {0}")]
    Unavailable(String),

    #[error("terminal request failed with status {status}: {body}")]
    Http { status: u16, body: String },
}
