//! Errors surfaced by `Scheduler::execute` and `Scheduler::execute_request`.

/// Failure reported to the caller. Engine faults during a run are handled
/// internally and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// Engine unavailable, or a window size rejected by the strict check.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A completion callback returned an error; the run was aborted.
    #[error("completion callback for {url} failed")]
    Callback {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<crate::engine::EngineError> for ExecuteError {
    fn from(e: crate::engine::EngineError) -> Self {
        ExecuteError::Configuration(e.to_string())
    }
}
