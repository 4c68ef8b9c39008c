use alloy::primitives::U256;
use thiserror::Error;

use crate::chain::{ChainError, SubmissionStatus};
use crate::providers::ProviderError;
use crate::resolver::ResolverError;
use crate::store::StoreError;

/// Per-request error taxonomy (`spec.md` §7). Every variant is logged and
/// discarded by the caller; none of these are ever rethrown past the task
/// boundary — the task is the unit of failure containment.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("node not in the authorized set")]
    Unauthorized,

    #[error("stale request: checkSubmission returned {0:?}")]
    StaleRequest(SubmissionStatus),

    #[error("request {0} is absent on-chain (caller is the zero address)")]
    RequestAbsent(U256),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
