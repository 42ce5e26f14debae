//! Deadline enforcement.
//!
//! # Responsibilities
//! - Wrap downstream calls with the caller's deadline
//! - Drop the in-flight future when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout is reported distinctly from other failures

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// The deadline elapsed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub waited: Duration,
}

/// Run `fut` until it completes or `deadline` passes.
pub async fn run_until<F>(deadline: Instant, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    let started = Instant::now();
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded {
            waited: started.elapsed(),
        })
}
