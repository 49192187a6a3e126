//! Reqwest implementation of the media gateway.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::Credentials;

use super::MediaGateway;
use super::client::build_http_client;
use super::http::get_with_auth;

/// Reqwest-backed downloader for embedded attachments.
pub struct HttpMediaGateway {
    client: Client,
    credentials: Credentials,
}

impl HttpMediaGateway {
    /// Builds a media gateway authenticating with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Network` when the HTTP client cannot be
    /// constructed.
    pub fn for_credentials(credentials: Credentials) -> Result<Self, ExportError> {
        let client = build_http_client()?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl MediaGateway for HttpMediaGateway {
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, ExportError> {
        let response =
            get_with_auth(&self.client, url.clone(), &self.credentials, "fetch image").await?;
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|error| ExportError::Network {
                message: format!("read image body failed: {error}"),
            })
    }
}
