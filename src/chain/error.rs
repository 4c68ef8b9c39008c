use alloy::primitives::U256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("failed to connect to rpc endpoint {0}: {1}")]
    Connect(String, String),

    #[error("rpc call {0} failed: {1}")]
    Rpc(&'static str, String),

    #[error("failed to decode log at block {0} index {1}: {2}")]
    Decode(u64, u64, String),

    #[error("gas estimation failed for sendResult({0}): {1}")]
    GasEstimate(U256, String),

    #[error("submission of sendResult({0}) reverted or failed: {1}")]
    Submission(U256, String),

    #[error("unrecognized submission status string: {0:?}")]
    UnknownSubmissionStatus(String),
}
