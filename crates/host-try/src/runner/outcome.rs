//! Terminal result of a retry run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::Scheme;

/// Record of a single invocation of the check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostAttempt {
    pub host: String,
    /// Per-host try number (Direct) or round number (Staggered, Until), 1-based.
    pub attempt: u32,
    /// Failure reason, `None` when the check succeeded.
    pub error: Option<String>,
    /// Delay waited after this attempt, if any.
    pub delay: Option<Duration>,
    /// True when the wait after this attempt was cut short by cancellation.
    pub interrupted: bool,
}

/// Immutable outcome returned by [`HostTry::run`](crate::HostTry::run).
#[derive(Clone, Debug, Serialize)]
pub struct TryOutcome {
    scheme: Scheme,
    success: bool,
    success_host: Option<String>,
    failures: BTreeMap<String, String>,
    attempts: u64,
    cancelled: bool,
    history: Vec<HostAttempt>,
}

impl TryOutcome {
    pub(crate) fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            success: false,
            success_host: None,
            failures: BTreeMap::new(),
            attempts: 0,
            cancelled: false,
            history: Vec::new(),
        }
    }

    pub(crate) fn record_failure(&mut self, host: &str, attempt: u32, reason: String) {
        self.attempts += 1;
        self.failures.insert(host.to_string(), reason.clone());
        self.history.push(HostAttempt {
            host: host.to_string(),
            attempt,
            error: Some(reason),
            delay: None,
            interrupted: false,
        });
    }

    pub(crate) fn record_success(&mut self, host: &str, attempt: u32) {
        self.attempts += 1;
        self.success = true;
        self.success_host = Some(host.to_string());
        // A host that eventually succeeded is not a failed host.
        self.failures.remove(host);
        self.history.push(HostAttempt {
            host: host.to_string(),
            attempt,
            error: None,
            delay: None,
            interrupted: false,
        });
    }

    pub(crate) fn record_delay(&mut self, delay: Duration, interrupted: bool) {
        if let Some(last) = self.history.last_mut() {
            last.delay = Some(delay);
            last.interrupted = interrupted;
        }
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Scheme that actually ran.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Host whose check succeeded. `None` unless the run succeeded.
    pub fn success_host(&self) -> Option<&str> {
        self.success_host.as_deref()
    }

    /// Last failure reason per host, for hosts that were tried and never
    /// succeeded.
    pub fn error_hosts(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    /// Number of times the check was invoked.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// True when the run was ended by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Every invocation in call order.
    pub fn history(&self) -> &[HostAttempt] {
        &self.history
    }

    /// All failure reasons recorded for `host`, oldest first.
    pub fn reasons_for(&self, host: &str) -> Vec<&str> {
        self.history
            .iter()
            .filter(|a| a.host == host)
            .filter_map(|a| a.error.as_deref())
            .collect()
    }
}
