//! # Docgen Gateway
//!
//! Composition root for the resilient multi-provider AI request gateway.
//!
//! Loads provider configuration from the environment, builds one shared
//! [`Gateway`], sends a single system + user prompt through it and prints the
//! generated text followed by the per-provider metrics in Prometheus format.
//!
//! ## Usage
//!
//! ```bash
//! GATEWAY_PRIMARY_PROVIDER=azure-openai \
//! AZURE_OPENAI_ENDPOINT=https://contoso.openai.azure.com \
//! AZURE_OPENAI_API_KEY=... \
//! AZURE_OPENAI_DEPLOYMENT=gpt-4o \
//! GATEWAY_FALLBACK_PROVIDERS=self-hosted \
//! SELF_HOSTED_MODEL=llama3 \
//! docgen-gateway "You are a project manager" "Draft a project charter for a CRM rollout"
//! ```
//!
//! Set `GATEWAY_LOG_FORMAT=json` for JSON log lines; `RUST_LOG` overrides the level.

use anyhow::{bail, Context};
use gateway_config::GatewayConfig;
use gateway_core::{extract_content, message_pair, RequestOptions};
use gateway_orchestrator::{CancellationToken, Gateway};
use gateway_telemetry::{init_logging, render_prometheus, LoggingConfig};
use std::env;
use std::time::Duration;
use tracing::{error, info};

/// Overall budget for the request, in milliseconds
const DEADLINE_MS_VAR: &str = "GATEWAY_REQUEST_DEADLINE_MS";
const LOG_FORMAT_VAR: &str = "GATEWAY_LOG_FORMAT";

#[tokio::main]
async fn main() {
    let json = env::var(LOG_FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if let Err(e) = init_logging(&LoggingConfig::new("info").with_json(json)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting docgen gateway"
    );

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Request failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let (Some(system), Some(user)) = (args.next(), args.next()) else {
        bail!("usage: docgen-gateway <system-prompt> <user-prompt> [operation]");
    };
    let operation = args.next().unwrap_or_else(|| "cli".to_string());

    let config = GatewayConfig::from_env().context("failed to load gateway configuration")?;
    let gateway = Gateway::from_config(&config).context("failed to build gateway")?;

    let mut options = RequestOptions::new().with_operation(operation);
    if let Ok(raw) = env::var(DEADLINE_MS_VAR) {
        let ms: u64 = raw
            .parse()
            .with_context(|| format!("{DEADLINE_MS_VAR} must be a number of milliseconds"))?;
        options = options.with_deadline(Duration::from_millis(ms));
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling request");
            on_ctrl_c.cancel();
        }
    });

    let result = gateway
        .submit_with_cancellation(message_pair(system, user), options, cancel)
        .await;

    for (provider, metrics) in gateway.snapshot_all() {
        info!(
            provider = %provider,
            total_calls = metrics.total_calls,
            failed_calls = metrics.failed_calls,
            rate_limit_hits = metrics.rate_limit_hits,
            average_response_ms = metrics.average_response_time().as_millis() as u64,
            "Provider metrics"
        );
    }

    let response = result?;
    info!(
        provider = %response.metadata.provider,
        attempts = response.metadata.attempts,
        tokens_used = response.metadata.tokens_used,
        "Document generated"
    );

    println!("{}", extract_content(&response));
    println!();
    print!("{}", render_prometheus(gateway.metrics())?);

    Ok(())
}
