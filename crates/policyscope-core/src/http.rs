use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{Result, RetrieverError};

const USER_AGENT: &str = concat!("policyscope/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by the token exchange and both fetches.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RetrieverError::TransportError(format!("Failed to build HTTP client: {}", e)))
}

/// Describe a request-level failure without echoing request bodies.
pub(crate) fn transport_error(context: &str, err: &reqwest::Error) -> RetrieverError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let target = err
        .url()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "remote host".to_string());

    RetrieverError::TransportError(format!("{}: {} ({})", context, kind, target))
}
