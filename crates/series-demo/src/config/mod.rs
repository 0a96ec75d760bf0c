use std::collections::HashMap;
use std::env;
use std::time::Duration;

use series_batcher::{Compression, Config};
use thiserror::Error;

const API_KEY_VAR: &str = "DATADOG_API_KEY";
const PREFIX: &str = "SERIES_DEMO_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATADOG_API_KEY is required but not set")]
    ApiKeyMissing,

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),

    #[error("SERIES_DEMO_COMPRESSION has invalid value: {0} (expected \"gzip\" or \"none\")")]
    InvalidCompression(String),
}

pub fn from_env() -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = env::vars()
        .filter(|(k, _)| k.starts_with(PREFIX) || k == API_KEY_VAR)
        .collect();
    parse(&vars)
}

fn parse(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
    let api_key = vars
        .get(API_KEY_VAR)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::ApiKeyMissing)?;

    let mut config = Config::new(api_key.clone());
    if let Some(endpoint) = vars.get("SERIES_DEMO_ENDPOINT").filter(|s| !s.is_empty()) {
        config.endpoint = endpoint.clone();
    }
    config.flush_interval =
        parse_duration_ms(vars, "SERIES_DEMO_FLUSH_INTERVAL_MS", config.flush_interval)?;
    config.buffer_size = parse_count(vars, "SERIES_DEMO_BUFFER_SIZE", config.buffer_size)?;
    config.queue_capacity =
        parse_count(vars, "SERIES_DEMO_QUEUE_CAPACITY", config.queue_capacity)?;
    config.request_timeout =
        parse_duration_ms(vars, "SERIES_DEMO_REQUEST_TIMEOUT_MS", config.request_timeout)?;
    config.compression = parse_compression(vars)?;
    Ok(config)
}

fn parse_count(
    vars: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match vars.get(name) {
        Some(val) => val
            .parse()
            .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone())),
        None => Ok(default),
    }
}

fn parse_duration_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match vars.get(name) {
        Some(val) => {
            let ms: u64 = val
                .parse()
                .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone()))?;
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}

fn parse_compression(vars: &HashMap<String, String>) -> Result<Compression, ConfigError> {
    match vars.get("SERIES_DEMO_COMPRESSION").map(|s| s.as_str()) {
        Some("none") | None => Ok(Compression::None),
        Some("gzip") => Ok(Compression::Gzip),
        Some(other) => Err(ConfigError::InvalidCompression(other.to_owned())),
    }
}
