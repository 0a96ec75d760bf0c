mod config;

use std::fmt::Display;
use std::time::Duration;

use series_batcher::{ClientBuilder, Metric};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

const LOG_LEVEL_VAR: &str = "SERIES_DEMO_LOG_LEVEL";

/// The demo cannot start; log why and exit non-zero.
fn fatal(stage: &str, error: impl Display) -> ! {
    error!(stage, %error, "series demo aborted");
    std::process::exit(1);
}

/// JSON logs on stderr.
/// An unparsable level falls back to WARN and is reported once logging is up.
fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let requested = std::env::var(LOG_LEVEL_VAR).ok();
    let parsed = requested.as_deref().map(str::parse::<LevelFilter>);
    let level = match &parsed {
        Some(Ok(level)) => *level,
        _ => LevelFilter::WARN,
    };

    tracing_subscriber::registry()
        .with(level)
        .with(tracing_microjson::JsonLayer::new(std::io::stderr).with_target(true))
        .init();

    if let (Some(value), Some(Err(_))) = (requested, parsed) {
        warn!(var = LOG_LEVEL_VAR, value = %value, "unrecognized log level, using WARN");
    }
}

/// reqwest is built without a bundled crypto backend; pick ring for the process.
fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        fatal("tls", "a different rustls crypto provider is already installed");
    }
}

fn sample(value: f32) -> Metric {
    Metric::new("sampler.metric")
        .point(chrono::Utc::now(), value)
        .tag("environment:local")
}

#[tokio::main]
async fn main() {
    init_tracing();
    install_crypto_provider();

    let config = config::from_env().unwrap_or_else(|e| fatal("config", e));
    info!(?config, "starting series demo");

    let client = ClientBuilder::from_config(config)
        .output(tokio::io::stderr())
        .error_output(tokio::io::stderr())
        .build()
        .unwrap_or_else(|e| fatal("client", e));

    for value in [12.34, 56.78] {
        client.publish(sample(value)).await;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.flush().await;
    client.close().await;
}
