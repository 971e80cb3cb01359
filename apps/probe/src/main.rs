use host_try_probe::config::Config;
use host_try_probe::{cancel_on_ctrl_c, init_tracing, run_probe};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    let outcome = run_probe(&config, token).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome.success_host() {
        Some(host) => {
            tracing::info!("Reachable NTP server: {}", host);
            Ok(())
        }
        None if outcome.is_cancelled() => anyhow::bail!("Probe cancelled"),
        None => anyhow::bail!("No NTP server responded"),
    }
}
