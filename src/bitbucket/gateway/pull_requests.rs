//! Reqwest implementation of the pull request gateway.

use async_trait::async_trait;
use reqwest::Client;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::{Credentials, PullRequestId, RepositoryCoordinates, ServerLocator};
use crate::bitbucket::models::{
    ApiActivity, ApiPage, ApiPullRequest, PullRequestComment, PullRequestPage, PullRequestRecord,
};
use crate::bitbucket::pagination::PageCursor;

use super::PullRequestGateway;
use super::client::build_http_client;
use super::http::get_with_auth;

/// Reqwest-backed gateway talking to one Bitbucket server.
pub struct HttpPullRequestGateway {
    client: Client,
    server: ServerLocator,
    credentials: Credentials,
}

impl HttpPullRequestGateway {
    /// Builds a gateway for the given server and credentials.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Network` when the HTTP client cannot be
    /// constructed.
    pub fn for_credentials(
        credentials: Credentials,
        server: ServerLocator,
    ) -> Result<Self, ExportError> {
        let client = build_http_client()?;
        Ok(Self {
            client,
            server,
            credentials,
        })
    }

    async fn activities_page(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
        cursor: PageCursor,
    ) -> Result<ApiPage<ApiActivity>, ExportError> {
        let mut url = self.server.activities_url(repository, id)?;
        for (key, value) in cursor.query() {
            url.query_pairs_mut().append_pair(&key, &value);
        }

        let response =
            get_with_auth(&self.client, url, &self.credentials, "list activities").await?;
        response
            .json::<ApiPage<ApiActivity>>()
            .await
            .map_err(|error| ExportError::Api {
                message: format!("decode activities failed: {error}"),
            })
    }
}

#[async_trait]
impl PullRequestGateway for HttpPullRequestGateway {
    async fn list_pull_requests(
        &self,
        repository: &RepositoryCoordinates,
        cursor: PageCursor,
    ) -> Result<PullRequestPage, ExportError> {
        let mut url = self.server.pull_requests_url(repository)?;
        url.query_pairs_mut().append_pair("state", "ALL");
        for (key, value) in cursor.query() {
            url.query_pairs_mut().append_pair(&key, &value);
        }

        let response =
            get_with_auth(&self.client, url, &self.credentials, "list pull requests").await?;
        let page = response
            .json::<ApiPage<ApiPullRequest>>()
            .await
            .map_err(|error| ExportError::Api {
                message: format!("decode pull requests failed: {error}"),
            })?;

        let next = page.next_cursor(cursor);
        let values = page
            .values
            .into_iter()
            .map(PullRequestRecord::from)
            .collect();

        Ok(PullRequestPage { values, next })
    }

    async fn pull_request_comments(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<Vec<PullRequestComment>, ExportError> {
        let mut comments = Vec::new();
        let mut cursor = Some(PageCursor::default());

        while let Some(current) = cursor {
            let page = self.activities_page(repository, id, current).await?;
            cursor = page.next_cursor(current);
            comments.extend(
                page.values
                    .into_iter()
                    .filter_map(ApiActivity::into_comment)
                    .map(PullRequestComment::from),
            );
        }

        Ok(comments)
    }

    async fn pull_request_diff(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<String, ExportError> {
        let url = self.server.diff_url(repository, id)?;
        let response = get_with_auth(&self.client, url, &self.credentials, "fetch diff").await?;
        response.text().await.map_err(|error| ExportError::Api {
            message: format!("read diff body failed: {error}"),
        })
    }
}
