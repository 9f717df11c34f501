use anyhow::anyhow;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::config::{HOST_ENV, REQUEST_TIMEOUT_ENV};

fn error_chain_matches(err: &(dyn StdError + 'static), kind: ErrorKind, needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Turns a transport failure into a message that names the setting to check.
pub(crate) fn ollama_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> anyhow::Error {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return anyhow!(
            "Ollama request timed out after {}s while calling '{}'. \
             Increase {} or check server responsiveness.",
            timeout_secs,
            api_url,
            REQUEST_TIMEOUT_ENV
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return anyhow!(
                "Connection refused by Ollama at '{}'. \
                 Ensure the server is running and {} is correct.",
                api_url,
                HOST_ENV
            );
        }

        return anyhow!(
            "Failed to connect to Ollama at '{}'. Check {} and network connectivity.",
            api_url,
            HOST_ENV
        );
    }

    anyhow!("Failed to call Ollama at '{}': {}", api_url, err)
}
