//! Data models representing pull request metadata, comments, and pages.
//!
//! This module contains domain models for pull request data returned by the
//! Bitbucket REST API. Types prefixed with `Api` are internal
//! deserialisation targets that convert into public domain types. Domain
//! types also implement `Serialize`/`Deserialize` because the export store
//! writes them back out as JSON records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locator::PullRequestId;
use super::pagination::PageCursor;

/// Pull request record persisted by the export store.
///
/// Fields mirror what the server reports; the store does not invent data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Server-assigned pull request identifier.
    pub id: u64,
    /// Title of the pull request.
    pub title: Option<String>,
    /// Long-form description, if any.
    pub description: Option<String>,
    /// State (e.g. OPEN, MERGED, DECLINED).
    pub state: Option<String>,
    /// Whether the pull request is closed.
    pub closed: Option<bool>,
    /// Creation timestamp, serialised as epoch milliseconds.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_date: Option<DateTime<Utc>>,
    /// Last update timestamp, serialised as epoch milliseconds.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated_date: Option<DateTime<Utc>>,
    /// Author username if present.
    pub author: Option<String>,
    /// Source branch display name.
    pub source_branch: Option<String>,
    /// Latest commit on the source branch.
    pub source_commit: Option<String>,
    /// Target branch display name.
    pub target_branch: Option<String>,
    /// Latest commit on the target branch.
    pub target_commit: Option<String>,
}

impl PullRequestRecord {
    /// Typed identifier for this record.
    #[must_use]
    pub const fn pull_request_id(&self) -> PullRequestId {
        PullRequestId::new(self.id)
    }
}

/// Pull request comment extracted from the activity stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestComment {
    /// Comment identifier.
    pub id: u64,
    /// Comment body.
    pub text: Option<String>,
    /// Author username.
    pub author: Option<String>,
    /// Creation timestamp, serialised as epoch milliseconds.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_date: Option<DateTime<Utc>>,
}

/// One page of pull request records plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestPage {
    /// Records on this page.
    pub values: Vec<PullRequestRecord>,
    /// Cursor for the next page, or `None` on the last page.
    pub next: Option<PageCursor>,
}

/// Paged response envelope shared by Bitbucket list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPage<T> {
    pub(crate) values: Vec<T>,
    pub(crate) is_last_page: bool,
    pub(crate) next_page_start: Option<u32>,
}

impl<T> ApiPage<T> {
    /// Cursor for the page after this one, if the server reports more.
    pub(crate) fn next_cursor(&self, current: PageCursor) -> Option<PageCursor> {
        if self.is_last_page {
            return None;
        }
        self.next_page_start
            .map(|start| current.advanced_to(start))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPullRequest {
    pub(crate) id: u64,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) closed: Option<bool>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub(crate) created_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub(crate) updated_date: Option<DateTime<Utc>>,
    pub(crate) author: Option<ApiParticipant>,
    pub(crate) from_ref: Option<ApiRef>,
    pub(crate) to_ref: Option<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiRef {
    pub(crate) display_id: Option<String>,
    pub(crate) latest_commit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiParticipant {
    pub(crate) user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) name: Option<String>,
}

/// Activity stream entry; only `COMMENTED` entries carry a comment.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiActivity {
    pub(crate) action: Option<String>,
    pub(crate) comment: Option<ApiComment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiComment {
    pub(crate) id: u64,
    pub(crate) text: Option<String>,
    pub(crate) author: Option<ApiUser>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub(crate) created_date: Option<DateTime<Utc>>,
}

impl From<ApiPullRequest> for PullRequestRecord {
    fn from(value: ApiPullRequest) -> Self {
        let (source_branch, source_commit) = split_ref(value.from_ref);
        let (target_branch, target_commit) = split_ref(value.to_ref);
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            state: value.state,
            closed: value.closed,
            created_date: value.created_date,
            updated_date: value.updated_date,
            author: value
                .author
                .and_then(|participant| participant.user)
                .and_then(|user| user.name),
            source_branch,
            source_commit,
            target_branch,
            target_commit,
        }
    }
}

impl From<ApiComment> for PullRequestComment {
    fn from(value: ApiComment) -> Self {
        Self {
            id: value.id,
            text: value.text,
            author: value.author.and_then(|user| user.name),
            created_date: value.created_date,
        }
    }
}

impl ApiActivity {
    /// Returns the comment when this activity is a `COMMENTED` entry.
    pub(crate) fn into_comment(self) -> Option<ApiComment> {
        if self.action.as_deref() == Some("COMMENTED") {
            self.comment
        } else {
            None
        }
    }
}

fn split_ref(reference: Option<ApiRef>) -> (Option<String>, Option<String>) {
    reference.map_or((None, None), |api_ref| {
        (api_ref.display_id, api_ref.latest_commit)
    })
}

#[cfg(test)]
mod tests {
    use super::{ApiActivity, ApiPage, ApiPullRequest, PullRequestRecord};
    use crate::bitbucket::pagination::PageCursor;

    #[test]
    fn pull_request_flattens_refs_and_author() {
        let api: ApiPullRequest = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Fix widget",
            "state": "MERGED",
            "closed": true,
            "createdDate": 1_660_000_000_000_i64,
            "updatedDate": 1_660_000_100_000_i64,
            "author": { "user": { "name": "alice" } },
            "fromRef": { "displayId": "feature/widget", "latestCommit": "abc123" },
            "toRef": { "displayId": "main", "latestCommit": "def456" }
        }))
        .expect("fixture should deserialise");

        let record = PullRequestRecord::from(api);
        assert_eq!(record.id, 7);
        assert_eq!(
            record.created_date.map(|stamp| stamp.timestamp_millis()),
            Some(1_660_000_000_000)
        );
        assert_eq!(record.author.as_deref(), Some("alice"));
        assert_eq!(record.source_branch.as_deref(), Some("feature/widget"));
        assert_eq!(record.target_commit.as_deref(), Some("def456"));
    }

    #[test]
    fn page_reports_next_cursor_until_last_page() {
        let page: ApiPage<ApiPullRequest> = serde_json::from_value(serde_json::json!({
            "values": [],
            "isLastPage": false,
            "nextPageStart": 25
        }))
        .expect("fixture should deserialise");

        let cursor = PageCursor::first(25);
        let next = page.next_cursor(cursor).expect("should have next page");
        assert_eq!(next.start(), 25);

        let last: ApiPage<ApiPullRequest> = serde_json::from_value(serde_json::json!({
            "values": [],
            "isLastPage": true
        }))
        .expect("fixture should deserialise");
        assert!(last.next_cursor(cursor).is_none());
    }

    #[test]
    fn only_commented_activities_yield_comments() {
        let commented: ApiActivity = serde_json::from_value(serde_json::json!({
            "action": "COMMENTED",
            "comment": { "id": 3, "text": "looks good", "author": { "name": "bob" } }
        }))
        .expect("fixture should deserialise");
        assert!(commented.into_comment().is_some());

        let merged: ApiActivity = serde_json::from_value(serde_json::json!({
            "action": "MERGED"
        }))
        .expect("fixture should deserialise");
        assert!(merged.into_comment().is_none());
    }
}
