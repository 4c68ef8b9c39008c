//! Deterministic round-robin scheduler (`spec.md` §4.F).
//!
//! The delay formula is pure and synchronous ([`compute_delay`]); the
//! cancellable sleep itself is its own small trait so the pipeline doesn't
//! depend on `tokio::time` directly, mirroring the trait/impl split the
//! teacher uses to keep orchestration testable without a real clock.

mod error;

use std::time::Duration;

use alloy::primitives::U256;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use error::SchedulerError;

/// `r mod n`, `position = (m - start + n) mod n`, delay per §4.F.
///
/// `node_count == 0` or `my_index < 0` means the node is unauthorized; the
/// pipeline should already have short-circuited on that (step 1), but
/// returning zero here rather than panicking keeps this function total.
pub fn compute_delay(request_id: U256, redundancy: u8, my_index: i64, node_count: u64) -> Duration {
    if node_count == 0 || my_index < 0 {
        return Duration::ZERO;
    }

    let n = node_count;
    let start = (request_id % U256::from(n)).to::<u64>();
    let m = my_index as u64;
    let position = (m + n - start) % n;
    let k = u64::from(redundancy);

    if position < k {
        Duration::ZERO
    } else {
        Duration::from_secs((position - k + 1) * 60)
    }
}

/// Outcome of a [`CancellableWait`]: whether the sleep ran to completion or
/// was cut short by [`CancellableWait::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled,
}

/// A handle to an in-flight sleep. Dropping it without cancelling lets the
/// sleep run to completion in the background; the pipeline task holds it
/// across its own await point instead.
pub struct CancellableWait {
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<WaitOutcome>,
}

impl CancellableWait {
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    pub async fn join(self) -> WaitOutcome {
        self.handle.await.unwrap_or(WaitOutcome::Cancelled)
    }
}

pub trait Scheduler: Send + Sync {
    fn wait(&self, delay: Duration) -> CancellableWait;
}

/// `Scheduler` backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn wait(&self, delay: Duration) -> CancellableWait {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if delay.is_zero() {
                return WaitOutcome::Completed;
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => WaitOutcome::Completed,
                _ = cancel_rx => WaitOutcome::Cancelled,
            }
        });
        CancellableWait { cancel_tx: Some(cancel_tx), handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_round_robin_k1_n3_r7() {
        let r = U256::from(7u64);
        let delays: Vec<u64> = (0..3)
            .map(|m| compute_delay(r, 1, m, 3).as_secs())
            .collect();
        assert_eq!(delays, vec![60, 0, 60]);
    }

    #[test]
    fn invariant_scheduler_locality() {
        for n in 1u64..=8 {
            for k in 1u8..=(n as u8) {
                let r = U256::from(12345u64);
                let mut zero_delay_count = 0;
                let mut positive_delays = Vec::new();
                for m in 0..n as i64 {
                    let delay = compute_delay(r, k, m, n);
                    if delay.is_zero() {
                        zero_delay_count += 1;
                    } else {
                        positive_delays.push(delay.as_secs());
                    }
                }
                assert_eq!(zero_delay_count, k as usize, "n={n} k={k}");
                positive_delays.sort_unstable();
                positive_delays.dedup();
                assert_eq!(positive_delays.len(), (n - u64::from(k)) as usize, "n={n} k={k}");
                for d in &positive_delays {
                    assert_eq!(d % 60, 0);
                }
            }
        }
    }

    #[test]
    fn unauthorized_node_or_empty_set_has_zero_delay() {
        let r = U256::from(7u64);
        assert_eq!(compute_delay(r, 1, -1, 3), Duration::ZERO);
        assert_eq!(compute_delay(r, 1, 0, 0), Duration::ZERO);
    }

    #[tokio::test]
    async fn cancellation_completes_wait_early() {
        let scheduler = TokioScheduler;
        let mut wait = scheduler.wait(Duration::from_secs(600));
        wait.cancel();
        assert_eq!(wait.join().await, WaitOutcome::Cancelled);
    }

    #[tokio::test]
    async fn zero_delay_completes_immediately() {
        let scheduler = TokioScheduler;
        let wait = scheduler.wait(Duration::ZERO);
        assert_eq!(wait.join().await, WaitOutcome::Completed);
    }
}
