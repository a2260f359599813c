pub mod control;
pub mod export_gnuplot;
pub mod monitor;
pub mod sim;
pub mod upload;

use crate::exit_codes;
use enose_rs::backend::BackendClient;
use enose_rs::config::ClientConfig;
use enose_rs::types::CollaboratorResult;
use std::future::Future;
use std::time::Duration;

/// Environment configuration with the `--api-url` override applied
pub fn load_config(api_url: Option<&str>) -> Result<ClientConfig, i32> {
    let config = ClientConfig::from_env().map_err(|e| {
        eprintln!("Error: {}", e);
        exit_codes::CONFIG_ERROR
    })?;

    match api_url {
        Some(url) => config.with_api_url(url).map_err(|e| {
            eprintln!("Error: {}", e);
            exit_codes::INPUT_ERROR
        }),
        None => Ok(config),
    }
}

pub fn backend_client(config: &ClientConfig) -> Result<BackendClient, i32> {
    BackendClient::new(&config.api_url, config.request_timeout).map_err(|e| {
        eprintln!("Error: {}", e);
        exit_codes::EXECUTION_ERROR
    })
}

/// Parse a `--duration` flag, rejecting values a `Duration` cannot hold
pub fn parse_duration(secs: f64) -> Result<Duration, i32> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        eprintln!("Error: --duration must be a non-negative number of seconds, got {}", secs);
        exit_codes::INPUT_ERROR
    })
}

/// Print a one-line failure and return the matching exit code
pub fn fail(e: impl std::fmt::Display) -> i32 {
    eprintln!("Error: {}", e);
    exit_codes::EXECUTION_ERROR
}

/// Run one backend call and print its message
pub async fn with_backend<F, Fut>(api_url: Option<&str>, call: F) -> i32
where
    F: FnOnce(BackendClient) -> Fut,
    Fut: Future<Output = CollaboratorResult<String>>,
{
    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    match call(backend).await {
        Ok(message) => {
            println!("{}", message);
            exit_codes::SUCCESS
        }
        Err(e) => fail(e),
    }
}
