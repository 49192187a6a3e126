//! HTTP client construction for gateway implementations.

use std::time::Duration;

use reqwest::Client;

use crate::bitbucket::error::ExportError;

/// Per-request timeout applied to every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared reqwest client used by the gateways.
///
/// # Errors
///
/// Returns `ExportError::Network` when the TLS backend cannot be
/// initialised.
pub(super) fn build_http_client() -> Result<Client, ExportError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("bbexport/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| ExportError::Network {
            message: format!("build client failed: {error}"),
        })
}
