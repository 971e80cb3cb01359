use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use host_try::{BackoffComponent, CancelMode, HostTryError, Scheme, TryConfig, TryOption};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_HOSTS: &str = "pool.ntp.org,time.cloudflare.com,time.google.com";

pub struct Config {
    pub hosts: Vec<String>,
    pub attempt_limit: u32,
    pub scheme: Scheme,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    pub components: Vec<BackoffComponent>,
    pub cancel_mode: CancelMode,
    pub ntp_port: u16,
    pub ntp_timeout: Duration,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let hosts = split_list(&env_string("HT_HOSTS", DEFAULT_HOSTS));
        let components = split_list(&env_string("HT_BACKOFF", "exponential"))
            .iter()
            .map(|name| name.parse::<BackoffComponent>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid HT_BACKOFF")?;

        Ok(Self {
            hosts,
            attempt_limit: env_parse("HT_ATTEMPTS", 5)?,
            scheme: Scheme::from_name(&env_string("HT_SCHEME", "staggered")),
            base_delay: Duration::from_millis(env_parse("HT_BASE_DELAY_MS", 600_000)?),
            max_delay: Duration::from_millis(env_parse("HT_MAX_DELAY_MS", 6_000_000)?),
            max_jitter: Duration::from_millis(env_parse("HT_MAX_JITTER_MS", 6_000_000)?),
            components,
            cancel_mode: CancelMode::from_name(&env_string("HT_CANCEL_MODE", "abort")),
            ntp_port: env_parse("HT_NTP_PORT", 123)?,
            ntp_timeout: Duration::from_millis(env_parse("HT_NTP_TIMEOUT_MS", 5_000)?),
            json_logs: env_string("HT_LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }

    /// Build the retry configuration, wiring in `token` as the cancellation
    /// source.
    pub fn try_config(&self, token: CancellationToken) -> Result<TryConfig, HostTryError> {
        TryConfig::with_options(
            self.hosts.iter().cloned(),
            [
                TryOption::AttemptLimit(self.attempt_limit),
                TryOption::SchemeSelect(self.scheme),
                TryOption::BaseDelay(self.base_delay),
                TryOption::MaxDelay(self.max_delay),
                TryOption::MaxJitter(self.max_jitter),
                TryOption::BackoffComponents(self.components.clone()),
                TryOption::CancellationSource(token),
                TryOption::CancelOnSignal(self.cancel_mode),
            ],
        )
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}={:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
