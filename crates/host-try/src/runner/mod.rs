//! Retry orchestration.
//!
//! This module drives a [`HostCheck`] across the configured hosts:
//! - Scheme selection (Direct, Staggered, Until)
//! - Backoff between failed attempts
//! - Cancellation-aware waits
//! - Outcome reporting

mod check;
mod host_try;
mod outcome;

pub use check::{check_fn, FnCheck, HostCheck};
pub use host_try::{do_try, HostTry};
pub use outcome::{HostAttempt, TryOutcome};
