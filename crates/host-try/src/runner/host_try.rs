//! Retry scheme executor.
//!
//! Runs a [`HostCheck`] against the configured hosts until one succeeds, the
//! attempt budget is spent, or (with [`CancelMode::Abort`]) the cancellation
//! token fires. Checks are strictly sequential.

use log::{debug, info, warn};

use super::{HostCheck, TryOutcome};
use crate::config::{CancelMode, Scheme, TryConfig};
use crate::errors::HostTryError;
use crate::wait::{interruptible_wait, WaitOutcome};

/// Result of one invocation of the check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Step {
    Succeeded,
    Failed,
    Aborted,
}

/// Retry runner bound to one configuration.
pub struct HostTry {
    config: TryConfig,
}

impl HostTry {
    pub fn new(config: TryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TryConfig {
        &self.config
    }

    /// Run `check` until a terminal state and return the outcome.
    ///
    /// The scheme is [`Scheme::Until`] whenever the attempt limit is zero,
    /// otherwise the configured one. Until only ends on success, or on
    /// cancellation when the cancel mode is [`CancelMode::Abort`].
    pub async fn run<C>(&self, check: &C) -> TryOutcome
    where
        C: HostCheck + ?Sized,
    {
        let scheme = self.config.effective_scheme();
        let mut outcome = TryOutcome::new(scheme);

        info!(
            "Starting {} retry over {} host(s), attempt limit {}",
            scheme,
            self.config.hosts().len(),
            self.config.attempt_limit()
        );

        match scheme {
            Scheme::Direct => self.run_direct(check, &mut outcome).await,
            Scheme::Staggered => self.run_staggered(check, &mut outcome).await,
            Scheme::Until => self.run_until(check, &mut outcome).await,
        }

        if let Some(host) = outcome.success_host() {
            info!(
                "Host '{}' succeeded after {} attempt(s)",
                host,
                outcome.attempts()
            );
        } else if outcome.is_cancelled() {
            info!("Retry cancelled after {} attempt(s)", outcome.attempts());
        } else {
            warn!(
                "All {} host(s) failed after {} attempt(s)",
                outcome.error_hosts().len(),
                outcome.attempts()
            );
        }

        outcome
    }

    /// Blocking variant of [`run`](Self::run).
    ///
    /// Builds a current-thread runtime with the time and I/O drivers enabled
    /// and blocks the calling thread until the run ends. Must not be called
    /// from within an async context.
    pub fn run_blocking<C>(&self, check: &C) -> Result<TryOutcome, HostTryError>
    where
        C: HostCheck + ?Sized,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(check)))
    }

    /// Exhaust the attempt limit on each host, in list order.
    async fn run_direct<C>(&self, check: &C, outcome: &mut TryOutcome)
    where
        C: HostCheck + ?Sized,
    {
        let limit = self.config.attempt_limit();

        for host in self.config.hosts() {
            for attempt in 1..=limit {
                match self.attempt(check, host, attempt, outcome).await {
                    Step::Succeeded | Step::Aborted => return,
                    Step::Failed => {}
                }

                // No wait after the host's last permitted attempt
                if attempt == limit {
                    break;
                }
                if !self.pause(attempt - 1, outcome).await {
                    return;
                }
            }
            debug!("Host '{}' exhausted {} attempt(s)", host, limit);
        }
    }

    /// One try per host per round, for `attempt_limit` rounds.
    async fn run_staggered<C>(&self, check: &C, outcome: &mut TryOutcome)
    where
        C: HostCheck + ?Sized,
    {
        let hosts = self.config.hosts();
        let limit = self.config.attempt_limit();

        for round in 1..=limit {
            for (index, host) in hosts.iter().enumerate() {
                match self.attempt(check, host, round, outcome).await {
                    Step::Succeeded | Step::Aborted => return,
                    Step::Failed => {}
                }

                // The last host of a round has no trailing wait
                if index + 1 == hosts.len() {
                    break;
                }
                if !self.pause(round - 1, outcome).await {
                    return;
                }
            }
            debug!("Round {}/{} failed on every host", round, limit);
        }
    }

    /// Cycle over the hosts until one succeeds.
    async fn run_until<C>(&self, check: &C, outcome: &mut TryOutcome)
    where
        C: HostCheck + ?Sized,
    {
        let mut round: u32 = 0;

        loop {
            round = round.saturating_add(1);

            for host in self.config.hosts() {
                match self.attempt(check, host, round, outcome).await {
                    Step::Succeeded | Step::Aborted => return,
                    Step::Failed => {}
                }

                if !self.pause(round - 1, outcome).await {
                    return;
                }
            }
        }
    }

    async fn attempt<C>(
        &self,
        check: &C,
        host: &str,
        attempt: u32,
        outcome: &mut TryOutcome,
    ) -> Step
    where
        C: HostCheck + ?Sized,
    {
        if self.aborts_on_cancel() && self.config.cancellation().is_cancelled() {
            outcome.mark_cancelled();
            return Step::Aborted;
        }

        debug!("Checking host '{}' (attempt {})", host, attempt);

        match check.check(host).await {
            Ok(()) => {
                outcome.record_success(host, attempt);
                Step::Succeeded
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    "Host '{}' failed on attempt {}: {}",
                    host, attempt, reason
                );
                outcome.record_failure(host, attempt, reason);
                Step::Failed
            }
        }
    }

    /// Wait out the backoff for attempt index `n`.
    ///
    /// Returns false when the run must stop because the wait was cancelled
    /// and the cancel mode is [`CancelMode::Abort`].
    async fn pause(&self, n: u32, outcome: &mut TryOutcome) -> bool {
        let delay = self.config.backoff().combine(n);
        debug!("Waiting {:?} before next attempt", delay);

        match interruptible_wait(delay, self.config.cancellation()).await {
            WaitOutcome::Elapsed => {
                outcome.record_delay(delay, false);
                true
            }
            WaitOutcome::Cancelled => {
                outcome.record_delay(delay, true);
                if self.aborts_on_cancel() {
                    outcome.mark_cancelled();
                    false
                } else {
                    debug!("Wait cancelled, continuing with next attempt");
                    true
                }
            }
        }
    }

    fn aborts_on_cancel(&self) -> bool {
        self.config.cancel_mode() == CancelMode::Abort
    }
}

/// Run `check` with `config` and return the outcome.
pub async fn do_try<C>(config: &TryConfig, check: &C) -> TryOutcome
where
    C: HostCheck + ?Sized,
{
    HostTry::new(config.clone()).run(check).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffComponent;
    use crate::runner::check_fn;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Fails every call except the n-th call on hosts listed in `succeed_on`.
    struct ScriptedCheck {
        succeed_on: HashMap<&'static str, usize>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCheck {
        fn new(succeed_on: &[(&'static str, usize)]) -> Self {
            Self {
                succeed_on: succeed_on.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HostCheck for ScriptedCheck {
        type Error = String;

        async fn check(&self, host: &str) -> Result<(), String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(host.to_string());
            let nth = calls.iter().filter(|h| h.as_str() == host).count();

            match self.succeed_on.get(host) {
                Some(n) if *n == nth => Ok(()),
                _ => Err(format!("{} unreachable (call {})", host, nth)),
            }
        }
    }

    fn config(hosts: &[&str]) -> TryConfig {
        TryConfig::new(hosts.iter().copied()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_succeeding_check_picks_first_host() {
        for scheme in [Scheme::Direct, Scheme::Staggered, Scheme::Until] {
            let check = ScriptedCheck::new(&[("a", 1), ("b", 1)]);
            let runner = HostTry::new(config(&["a", "b"]).with_scheme(scheme));

            let outcome = runner.run(&check).await;

            assert!(outcome.is_success());
            assert_eq!(outcome.success_host(), Some("a"));
            assert_eq!(outcome.attempts(), 1);
            assert!(outcome.error_hosts().is_empty());
            assert_eq!(outcome.scheme(), scheme);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_exhausts_each_host_in_order() {
        let check = ScriptedCheck::new(&[]);
        let runner = HostTry::new(
            config(&["a", "b", "c"])
                .with_scheme(Scheme::Direct)
                .with_attempt_limit(3),
        );

        let outcome = runner.run(&check).await;

        assert!(!outcome.is_success());
        assert!(outcome.success_host().is_none());
        assert_eq!(
            check.calls(),
            vec!["a", "a", "a", "b", "b", "b", "c", "c", "c"]
        );
        assert_eq!(outcome.error_hosts().len(), 3);
        assert_eq!(
            outcome.error_hosts().get("b").unwrap(),
            "b unreachable (call 3)"
        );
        assert_eq!(outcome.reasons_for("b").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_does_not_wait_after_last_attempt_of_host() {
        let check = ScriptedCheck::new(&[]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_scheme(Scheme::Direct)
                .with_attempt_limit(2),
        );

        let outcome = runner.run(&check).await;
        let delays: Vec<_> = outcome.history().iter().map(|a| a.delay.is_some()).collect();

        assert_eq!(delays, vec![true, false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_backoff_grows_per_host() {
        let check = ScriptedCheck::new(&[("b", 3)]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_scheme(Scheme::Direct)
                .with_attempt_limit(3)
                .with_base_delay(Duration::from_secs(1))
                .with_max_delay(Duration::ZERO),
        );

        let outcome = runner.run(&check).await;
        let delays: Vec<_> = outcome.history().iter().map(|a| a.delay).collect();

        assert_eq!(outcome.success_host(), Some("b"));
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                None,
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                None,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_round_robin() {
        let check = ScriptedCheck::new(&[("c", 2)]);
        let runner = HostTry::new(config(&["a", "b", "c"]).with_attempt_limit(3));

        let outcome = runner.run(&check).await;

        assert_eq!(check.calls(), vec!["a", "b", "c", "a", "b", "c"]);
        assert_eq!(outcome.success_host(), Some("c"));
        assert_eq!(outcome.attempts(), 6);
        let failed: Vec<_> = outcome.error_hosts().keys().cloned().collect();
        assert_eq!(failed, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_last_host_of_round_has_no_wait() {
        let check = ScriptedCheck::new(&[]);
        let runner = HostTry::new(config(&["a", "b"]).with_attempt_limit(2));

        let outcome = runner.run(&check).await;
        let delays: Vec<_> = outcome.history().iter().map(|a| a.delay.is_some()).collect();

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts(), 4);
        assert_eq!(delays, vec![true, false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_runs_past_attempt_limit() {
        let check = ScriptedCheck::new(&[("b", 4)]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_scheme(Scheme::Until)
                .with_attempt_limit(1),
        );

        let outcome = runner.run(&check).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.success_host(), Some("b"));
        assert_eq!(outcome.attempts(), 8);
        assert!(!outcome.error_hosts().contains_key("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_runs_until() {
        let check = ScriptedCheck::new(&[("a", 2)]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_scheme(Scheme::Direct)
                .with_attempt_limit(0),
        );

        let outcome = runner.run(&check).await;

        assert_eq!(outcome.scheme(), Scheme::Until);
        assert_eq!(check.calls(), vec!["a", "b", "a"]);
        assert_eq!(outcome.success_host(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_delays_respect_max_delay() {
        let check = ScriptedCheck::new(&[("c", 5)]);
        let max = Duration::from_secs(30);
        let runner = HostTry::new(
            config(&["a", "b", "c"])
                .with_attempt_limit(0)
                .with_base_delay(Duration::from_secs(7))
                .with_max_delay(max)
                .with_max_jitter(Duration::from_secs(20))
                .with_components(vec![
                    BackoffComponent::Exponential,
                    BackoffComponent::Random,
                ]),
        );

        let outcome = runner.run(&check).await;

        assert!(outcome.is_success());
        assert!(outcome
            .history()
            .iter()
            .filter_map(|a| a.delay)
            .all(|d| d <= max));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_shortens_wait_but_run_continues() {
        let token = CancellationToken::new();
        token.cancel();

        let check = ScriptedCheck::new(&[]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_scheme(Scheme::Direct)
                .with_attempt_limit(2)
                .with_cancellation(token),
        );

        let start = tokio::time::Instant::now();
        let outcome = runner.run(&check).await;

        assert_eq!(outcome.attempts(), 4);
        assert!(!outcome.is_cancelled());
        assert!(outcome.history()[0].interrupted);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_when_requested() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let check = ScriptedCheck::new(&[]);
        let runner = HostTry::new(
            config(&["a", "b"])
                .with_attempt_limit(0)
                .with_cancellation(token)
                .with_cancel_mode(CancelMode::Abort),
        );

        let outcome = runner.run(&check).await;

        assert!(!outcome.is_success());
        assert!(outcome.is_cancelled());
        assert!(outcome.success_host().is_none());
        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.history()[0].interrupted);
    }

    #[tokio::test]
    async fn test_pre_cancelled_abort_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();

        let check = ScriptedCheck::new(&[("a", 1)]);
        let runner = HostTry::new(
            config(&["a"])
                .with_cancellation(token)
                .with_cancel_mode(CancelMode::Abort),
        );

        let outcome = runner.run(&check).await;

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.attempts(), 0);
        assert!(check.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_do_try_with_closure() {
        let cfg = config(&["primary", "backup"]).with_scheme(Scheme::Direct);
        let check = check_fn(|host: String| async move {
            if host == "backup" {
                Ok(())
            } else {
                Err("connection refused")
            }
        });

        let outcome = do_try(&cfg, &check).await;

        assert_eq!(outcome.success_host(), Some("backup"));
        assert_eq!(outcome.attempts(), 6);
        assert_eq!(
            outcome.error_hosts().get("primary").map(String::as_str),
            Some("connection refused")
        );
    }

    #[test]
    fn test_run_blocking() {
        let check = ScriptedCheck::new(&[("a", 1)]);
        let runner = HostTry::new(config(&["a"]));

        let outcome = runner.run_blocking(&check).unwrap();

        assert_eq!(outcome.success_host(), Some("a"));
    }
}
