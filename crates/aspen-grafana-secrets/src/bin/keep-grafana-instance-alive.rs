//! Keep a Grafana instance from being paused for inactivity.
//!
//! Free-tier Grafana Cloud stacks are paused when unused. Running this on a
//! schedule makes one authenticated request (the home dashboard) so the stack
//! used by integration tests stays awake.
//!
//! # Usage
//!
//! ```bash
//! export GRAFANA_SERVICE_ACCOUNT_TOKEN="glsa_..."
//! export GRAFANA_INSTANCE_URL="https://example.grafana.net"
//! keep-grafana-instance-alive
//! ```

use anyhow::Context;
use anyhow::Result;
use aspen_grafana_secrets::GrafanaApi;
use aspen_grafana_secrets::GrafanaClient;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ping a Grafana instance with an authenticated request.
#[derive(Debug, Parser)]
#[command(name = "keep-grafana-instance-alive", version)]
struct Args {
    /// Service account token used to authenticate.
    #[arg(long, env = "GRAFANA_SERVICE_ACCOUNT_TOKEN", hide_env_values = true)]
    token: String,

    /// Base URL of the Grafana instance.
    #[arg(long, env = "GRAFANA_INSTANCE_URL")]
    url: String,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.token.is_empty() {
        anyhow::bail!("GRAFANA_SERVICE_ACCOUNT_TOKEN not set");
    }
    if args.url.is_empty() {
        anyhow::bail!("GRAFANA_INSTANCE_URL not set");
    }

    let client = GrafanaClient::new(&args.url, args.token).context("failed to create grafana client")?;
    client.home_dashboard().await.context("failed to fetch home dashboard")?;

    info!(url = %args.url, "grafana instance is alive");
    Ok(())
}
