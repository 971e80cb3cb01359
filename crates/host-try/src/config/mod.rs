//! Retry run configuration.
//!
//! A [`TryConfig`] is built once and then handed to a
//! [`HostTry`](crate::HostTry) runner. Every field has a documented default:
//!
//! | Option | Effect | Default |
//! |--------|--------|---------|
//! | `AttemptLimit(n)` | tries per host (Direct) or rounds (Staggered); 0 forces Until | 5 |
//! | `SchemeSelect(s)` | Direct / Staggered / Until | Staggered |
//! | `BaseDelay(d)` | base unit of the exponential and fixed components | 10 minutes |
//! | `MaxDelay(d)` | upper bound on any computed delay, 0 disables it | 100 minutes |
//! | `MaxJitter(d)` | exclusive upper bound of the random component | 100 minutes |
//! | `BackoffComponents(v)` | components summed into the delay | `[Exponential]` |
//! | `CancellationSource(t)` | token raced against every wait | never fires |
//! | `CancelOnSignal(m)` | what a fired token does to the run | `ShortenWait` |

mod scheme;

pub use scheme::{CancelMode, Scheme};

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backoff::{BackoffComponent, BackoffPolicy};
use crate::errors::HostTryError;

/// Default attempt limit.
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 5;

/// A single override applied on top of the defaults.
#[derive(Clone, Debug)]
pub enum TryOption {
    AttemptLimit(u32),
    SchemeSelect(Scheme),
    BaseDelay(Duration),
    MaxDelay(Duration),
    MaxJitter(Duration),
    BackoffComponents(Vec<BackoffComponent>),
    CancellationSource(CancellationToken),
    CancelOnSignal(CancelMode),
}

/// Immutable parameters of one retry run.
#[derive(Clone, Debug)]
pub struct TryConfig {
    hosts: Vec<String>,
    attempt_limit: u32,
    scheme: Scheme,
    backoff: BackoffPolicy,
    cancel: CancellationToken,
    cancel_mode: CancelMode,
}

impl TryConfig {
    /// Create a configuration with default settings.
    ///
    /// Fails if `hosts` is empty or contains a blank identifier.
    pub fn new<I, S>(hosts: I) -> Result<Self, HostTryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();

        if hosts.is_empty() {
            return Err(HostTryError::EmptyHosts);
        }
        if let Some(index) = hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(HostTryError::BlankHost { index });
        }

        Ok(Self {
            hosts,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            scheme: Scheme::default(),
            backoff: BackoffPolicy::default(),
            cancel: CancellationToken::new(),
            cancel_mode: CancelMode::default(),
        })
    }

    /// Create a configuration and apply `options` in order.
    ///
    /// A later option overrides an earlier one for the same field.
    pub fn with_options<I, S, O>(hosts: I, options: O) -> Result<Self, HostTryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = TryOption>,
    {
        let mut config = Self::new(hosts)?;
        for option in options {
            config.apply(option);
        }
        Ok(config)
    }

    fn apply(&mut self, option: TryOption) {
        match option {
            TryOption::AttemptLimit(n) => self.attempt_limit = n,
            TryOption::SchemeSelect(scheme) => self.scheme = scheme,
            TryOption::BaseDelay(d) => self.backoff.base_delay = d,
            TryOption::MaxDelay(d) => self.backoff.max_delay = d,
            TryOption::MaxJitter(d) => self.backoff.max_jitter = d,
            TryOption::BackoffComponents(components) => self.backoff.components = components,
            TryOption::CancellationSource(token) => self.cancel = token,
            TryOption::CancelOnSignal(mode) => self.cancel_mode = mode,
        }
    }

    pub fn with_attempt_limit(mut self, n: u32) -> Self {
        self.attempt_limit = n;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.backoff.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.backoff.max_jitter = jitter;
        self
    }

    pub fn with_components(mut self, components: Vec<BackoffComponent>) -> Self {
        self.backoff.components = components;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_cancel_mode(mut self, mode: CancelMode) -> Self {
        self.cancel_mode = mode;
        self
    }

    /// Hosts in the order they are tried.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn attempt_limit(&self) -> u32 {
        self.attempt_limit
    }

    /// The scheme as selected, before the zero-limit override.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The scheme a run will actually use.
    ///
    /// A zero attempt limit means "unbounded" and always selects
    /// [`Scheme::Until`].
    pub fn effective_scheme(&self) -> Scheme {
        if self.attempt_limit == 0 {
            Scheme::Until
        } else {
            self.scheme
        }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel_mode(&self) -> CancelMode {
        self.cancel_mode
    }
}
