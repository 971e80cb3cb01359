use host_try::{HostTry, TryOutcome};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::ntp::NtpCheck;

/// Install the global subscriber. Retry-core `log` records are bridged in
/// through `tracing-subscriber`'s default `tracing-log` integration.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("host_try=info,host_try_probe=info"));
    let layer = if json {
        fmt::layer().json().flatten_event(true).boxed()
    } else {
        fmt::layer().compact().with_target(false).boxed()
    };
    tracing_subscriber::registry().with(filter).with(layer).init();
}

/// Cancel `token` on the first Ctrl-C and exit with status 130 on the second.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        let mut interrupts = 0u32;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            interrupts += 1;
            if interrupts > 1 {
                tracing::warn!("Second interrupt, exiting");
                std::process::exit(130);
            }
            tracing::info!("Interrupt received, cancelling the probe (Ctrl-C again exits)");
            token.cancel();
        }
    });
}

/// Probe the configured NTP hosts and return the retry outcome.
pub async fn run_probe(config: &Config, token: CancellationToken) -> anyhow::Result<TryOutcome> {
    let try_config = config.try_config(token)?;
    tracing::info!(
        hosts = ?try_config.hosts(),
        scheme = %try_config.effective_scheme(),
        "Probing NTP servers"
    );

    let check = NtpCheck::new(config.ntp_port, config.ntp_timeout);
    Ok(HostTry::new(try_config).run(&check).await)
}
