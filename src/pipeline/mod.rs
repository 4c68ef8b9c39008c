//! Per-request orchestration (`spec.md` §4.G): one task per `NewRequest`
//! event, walking authorize → wait → re-check → fetch → resolve → invoke →
//! extract/store → re-check → submit. No step's failure ever escapes the
//! task — see [`run`].

mod error;
mod extract;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, SubmissionStatus};
use crate::nodeset::NodeSetTracker;
use crate::providers;
use crate::resolver::resolve_prompt;
use crate::scheduler::{compute_delay, Scheduler, WaitOutcome};
use crate::store::ContentStore;

pub use error::PipelineError;
pub use extract::extract_result;

/// `Received → Waiting → Ready → Fetching → Computing → Submitting → Done | Aborted`
/// (`spec.md` §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Waiting,
    Ready,
    Fetching,
    Computing,
    Submitting,
    Done,
    Aborted,
}

/// Shared, cloneable handles every pipeline task needs. One instance is
/// constructed at startup and an `Arc` clone is handed to each spawned task.
pub struct PipelineContext {
    pub chain: Arc<ChainClient>,
    pub store: Arc<ContentStore>,
    pub nodeset: Arc<NodeSetTracker>,
    pub scheduler: Arc<dyn Scheduler>,
    pub http: reqwest::Client,
}

/// Why a task stopped short of `Submitting` succeeding. Cancellation (no
/// underlying error) is distinguished from every other discard reason so it
/// is never mistaken for a fault.
enum Discard {
    Cancelled,
    Error(PipelineError),
}

impl<E: Into<PipelineError>> From<E> for Discard {
    fn from(e: E) -> Self {
        Discard::Error(e.into())
    }
}

/// Drive one request end to end. Never panics and never returns an error —
/// every failure is logged here and folded into [`PipelineState::Aborted`],
/// per the per-task containment discipline in `spec.md` §7.
pub async fn run(ctx: Arc<PipelineContext>, request_id: U256, redundancy: u8) -> PipelineState {
    match run_inner(&ctx, request_id, redundancy).await {
        Ok(()) => PipelineState::Done,
        Err(Discard::Cancelled) => {
            info!(%request_id, "wait cancelled, aborting");
            PipelineState::Aborted
        }
        Err(Discard::Error(e)) => {
            warn!(%request_id, error = %e, "pipeline task discarded");
            PipelineState::Aborted
        }
    }
}

async fn run_inner(ctx: &PipelineContext, request_id: U256, redundancy: u8) -> Result<(), Discard> {
    let mut state = PipelineState::Received;
    debug!(%request_id, ?state, "pipeline task started");

    // Step 1 — authorization gate.
    let membership = ctx.nodeset.current().await;
    if !membership.is_authorized() {
        return Err(PipelineError::Unauthorized.into());
    }

    // Steps 2-3 — compute delay, cancellable sleep.
    state = PipelineState::Waiting;
    let delay = compute_delay(request_id, redundancy, membership.my_index, membership.node_count);
    debug!(%request_id, ?delay, my_index = membership.my_index, node_count = membership.node_count, ?state);
    if ctx.scheduler.wait(delay).join().await == WaitOutcome::Cancelled {
        return Err(Discard::Cancelled);
    }

    // Step 4 — pre-work re-check (only meaningful if we actually slept).
    state = PipelineState::Ready;
    debug!(%request_id, ?state);
    if delay > Duration::ZERO {
        check_submission_is_ok(ctx, request_id).await?;
    }

    // Step 5 — fetch request.
    state = PipelineState::Fetching;
    debug!(%request_id, ?state);
    let request = ctx
        .chain
        .get_request_info(request_id)
        .await?
        .ok_or(PipelineError::RequestAbsent(request_id))?;

    // Step 6 — resolve config/prompt.
    let (platform, model, prompt) = resolve_prompt(
        &ctx.store,
        &request.prompt_hash,
        &request.input,
        &request.platform,
        &request.model,
    )?;

    // Step 7 — invoke provider.
    state = PipelineState::Computing;
    debug!(%request_id, platform = %platform, model = %model, ?state);
    let raw = providers::invoke(&ctx.http, &platform, &model, &prompt).await?;

    // Step 8 — extract <result> if requested.
    let extracted = if request.return_content_within_result_tag {
        let (text, found) = extract_result(&raw);
        if !found {
            warn!(%request_id, "returnContentWithinResultTag set but no <result> tag found; using raw response");
        }
        text
    } else {
        raw
    };

    // Step 9 — off-chain storage if requested.
    let result = if request.store_result_offchain {
        ctx.store.put(extracted.as_bytes())?
    } else {
        extracted
    };

    // Step 10 — post-work re-check.
    state = PipelineState::Submitting;
    debug!(%request_id, ?state);
    check_submission_is_ok(ctx, request_id).await?;

    // Step 11 — submit.
    ctx.chain.send_result(request_id, result).await?;
    info!(%request_id, "result submitted");
    Ok(())
}

async fn check_submission_is_ok(ctx: &PipelineContext, request_id: U256) -> Result<(), Discard> {
    match ctx.chain.check_submission(request_id).await? {
        SubmissionStatus::Ok => Ok(()),
        other => Err(PipelineError::StaleRequest(other).into()),
    }
}
