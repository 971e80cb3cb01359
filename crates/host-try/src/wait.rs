//! Cancellation-aware waiting between attempts.

use std::time::Duration;

use log::debug;
use tokio_util::sync::CancellationToken;

/// How an [`interruptible_wait`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    /// The full delay elapsed.
    Elapsed,
    /// The token fired before the delay elapsed.
    Cancelled,
}

/// Sleep for `delay` unless `token` fires first.
///
/// A token that is already cancelled returns immediately, as does a zero
/// delay.
pub async fn interruptible_wait(delay: Duration, token: &CancellationToken) -> WaitOutcome {
    if token.is_cancelled() {
        return WaitOutcome::Cancelled;
    }
    if delay.is_zero() {
        return WaitOutcome::Elapsed;
    }

    tokio::select! {
        _ = tokio::time::sleep(delay) => WaitOutcome::Elapsed,
        _ = token.cancelled() => {
            debug!("Wait of {:?} interrupted by cancellation", delay);
            WaitOutcome::Cancelled
        }
    }
}
