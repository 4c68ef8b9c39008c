use thiserror::Error;

/// Errors that can terminate the process at startup.
///
/// Anything reaching `main` as an `AppError` is logged and the process exits
/// with status 1; no component past startup is allowed to propagate an error
/// this far (see the per-request containment discipline in `pipeline`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("network 'local' requires LLM_SERVICE_CONTRACT to be set")]
    MissingLocalContract,

    #[error("failed to load or generate wallet: {0}")]
    Wallet(String),

    #[error("failed to construct chain client: {0}")]
    Chain(#[from] crate::chain::ChainError),

    #[error("log ingestion failed during startup catch-up: {0}")]
    Ingest(#[from] crate::ingester::IngestError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
