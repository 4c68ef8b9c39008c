use thiserror::Error;

/// The scheduler itself has no failure mode today; this exists so callers
/// can match on a stable type if that changes, and so `wait` composes with
/// the rest of the `Result`-based pipeline without a bare `Infallible`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler wait task panicked: {0}")]
    Join(String),
}
