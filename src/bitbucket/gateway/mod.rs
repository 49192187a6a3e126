//! Gateways for fetching export data over the Bitbucket REST API.
//!
//! This module provides trait-based gateways for communicating with the
//! Bitbucket API. The trait-based design enables mocking in tests while the
//! reqwest-backed implementations handle real HTTP requests.

mod client;
mod http;
mod media;
mod pull_requests;

pub use media::HttpMediaGateway;
pub use pull_requests::HttpPullRequestGateway;

use async_trait::async_trait;
use url::Url;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::{PullRequestId, RepositoryCoordinates};
use crate::bitbucket::models::{PullRequestComment, PullRequestPage};
use crate::bitbucket::pagination::PageCursor;

/// Gateway that can load pull request data for a repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestGateway: Send + Sync {
    /// Fetch one page of pull requests in all states.
    async fn list_pull_requests(
        &self,
        repository: &RepositoryCoordinates,
        cursor: PageCursor,
    ) -> Result<PullRequestPage, ExportError>;

    /// Fetch all comments from the pull request activity stream.
    async fn pull_request_comments(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<Vec<PullRequestComment>, ExportError>;

    /// Fetch the raw unified diff for the pull request.
    async fn pull_request_diff(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<String, ExportError>;
}

/// Gateway for downloading attachment bytes such as embedded images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Download the resource at `url` as raw bytes.
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, ExportError>;
}
