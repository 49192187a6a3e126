//! Bitbucket REST API access: locators, wire models, and gateways.
//!
//! This module parses server URLs and repository coordinates, detects the
//! REST API version from the host, and retrieves pull request metadata,
//! comments, and diffs. Errors are mapped into user-friendly variants so
//! that callers can surface precise failures without exposing HTTP client
//! internals.

pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;

pub use error::ExportError;
pub use gateway::{HttpMediaGateway, HttpPullRequestGateway, MediaGateway, PullRequestGateway};
pub use locator::{
    ApiVersion, Credentials, ProjectKey, PullRequestId, RepositoryCoordinates, RepositorySlug,
    ServerLocator,
};
pub use models::{PullRequestComment, PullRequestPage, PullRequestRecord};
pub use pagination::PageCursor;
pub use rate_limit::RequestBudget;

#[cfg(test)]
pub use gateway::{MockMediaGateway, MockPullRequestGateway};
