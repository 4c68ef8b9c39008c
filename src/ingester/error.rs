use std::path::PathBuf;

use thiserror::Error;

use crate::chain::ChainError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read cursor file {0:?}: {1}")]
    CursorRead(PathBuf, std::io::Error),

    #[error("failed to write cursor file {0:?}: {1}")]
    CursorWrite(PathBuf, std::io::Error),

    #[error("cursor file {0:?} is neither a legacy block number nor valid JSON: {1}")]
    CursorParse(PathBuf, serde_json::Error),

    #[error("chain query failed: {0}")]
    Chain(#[from] ChainError),

    #[error("event channel closed; downstream pipeline dispatcher has gone away")]
    ChannelClosed,
}
