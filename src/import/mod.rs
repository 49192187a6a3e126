//! Import orchestration: fetch pull request data and persist it.
//!
//! [`RepositoryImport`] walks one repository's pull requests page by page
//! and writes a record file per pull request, plus diffs and comments when
//! the corresponding flags are set. [`multi`] iterates a manifest of
//! repositories, [`backfill`] completes diffs for a previously imported
//! store.

pub mod backfill;
pub mod multi;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::gateway::PullRequestGateway;
use crate::bitbucket::locator::{PullRequestId, RepositoryCoordinates};
use crate::bitbucket::pagination::PageCursor;
use crate::store::ExportStore;

/// Granularity flags for a repository import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Also fetch and store the raw diff of every pull request.
    pub include_diffs: bool,
    /// Also fetch and store the comments of every pull request.
    pub include_comments: bool,
}

/// Counts reported after a repository import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Canonical `project/slug` of the imported repository.
    pub repository: String,
    /// Number of pull request records written.
    pub pull_requests: usize,
    /// Number of diffs written.
    pub diffs: usize,
    /// Number of comment files written.
    pub comment_files: usize,
    /// Diff or comment fetches that failed and were skipped.
    pub skipped: usize,
}

/// Imports all pull requests of a single repository using a gateway.
pub struct RepositoryImport<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    gateway: &'gateway Gateway,
}

impl<'gateway, Gateway> RepositoryImport<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    /// Creates an importer using the provided gateway.
    #[must_use]
    pub const fn new(gateway: &'gateway Gateway) -> Self {
        Self { gateway }
    }

    /// Fetches every pull request and writes it to the store.
    ///
    /// Writes exactly one record file per pull request reported by the
    /// server, with identifiers preserved unchanged. A repository with no
    /// pull requests writes nothing and succeeds.
    ///
    /// A failed diff or comment fetch for one pull request is logged and
    /// skipped so the remaining pull requests still import; only an
    /// authentication failure aborts, since retrying with the same
    /// credentials cannot succeed.
    ///
    /// # Errors
    ///
    /// Propagates listing failures, authentication failures, and store
    /// write failures.
    pub async fn run(
        &self,
        repository: &RepositoryCoordinates,
        store: &ExportStore,
        options: ImportOptions,
    ) -> Result<ImportSummary, ExportError> {
        let repo_store = store.repository(repository)?;
        let mut summary = ImportSummary {
            repository: repository.qualified_name(),
            pull_requests: 0,
            diffs: 0,
            comment_files: 0,
            skipped: 0,
        };

        let mut cursor = Some(PageCursor::default());
        while let Some(current) = cursor {
            let page = self.gateway.list_pull_requests(repository, current).await?;
            cursor = page.next;

            for record in page.values {
                let id = record.pull_request_id();
                repo_store.write_record(&record)?;
                summary.pull_requests += 1;

                if options.include_comments {
                    match self.gateway.pull_request_comments(repository, id).await {
                        Ok(comments) => {
                            repo_store.write_comments(id, &comments)?;
                            summary.comment_files += 1;
                        }
                        Err(error) => skip_fetch(&mut summary, id, "comments", error)?,
                    }
                }

                if options.include_diffs {
                    match self.gateway.pull_request_diff(repository, id).await {
                        Ok(diff) => {
                            repo_store.write_diff(id, &diff)?;
                            summary.diffs += 1;
                        }
                        Err(error) => skip_fetch(&mut summary, id, "diff", error)?,
                    }
                }
            }
        }

        tracing::debug!(
            repository = %summary.repository,
            pull_requests = summary.pull_requests,
            skipped = summary.skipped,
            "repository import finished"
        );
        Ok(summary)
    }
}

/// Records a failed per-pull-request fetch, aborting on authentication
/// failures.
fn skip_fetch(
    summary: &mut ImportSummary,
    id: PullRequestId,
    what: &str,
    error: ExportError,
) -> Result<(), ExportError> {
    if matches!(error, ExportError::Authentication { .. }) {
        return Err(error);
    }
    summary.skipped += 1;
    tracing::warn!(pull_request = id.get(), fetch = what, %error, "skipping failed fetch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use mockall::predicate::eq;

    use super::{ImportOptions, RepositoryImport};
    use crate::bitbucket::error::ExportError;
    use crate::bitbucket::gateway::MockPullRequestGateway;
    use crate::bitbucket::locator::{PullRequestId, RepositoryCoordinates};
    use crate::bitbucket::models::{PullRequestComment, PullRequestPage, PullRequestRecord};
    use crate::bitbucket::pagination::PageCursor;
    use crate::store::ExportStore;

    fn temp_store() -> (tempfile::TempDir, ExportStore) {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("temp path should be UTF-8");
        let store = ExportStore::open(root).expect("store should open");
        (dir, store)
    }

    fn repository() -> RepositoryCoordinates {
        RepositoryCoordinates::parse("prj/repo").expect("coordinates should parse")
    }

    fn record(id: u64) -> PullRequestRecord {
        PullRequestRecord {
            id,
            title: Some(format!("PR {id}")),
            ..Default::default()
        }
    }

    fn single_page_gateway(records: Vec<PullRequestRecord>) -> MockPullRequestGateway {
        let mut gateway = MockPullRequestGateway::new();
        gateway
            .expect_list_pull_requests()
            .times(1)
            .returning(move |_, _| {
                Ok(PullRequestPage {
                    values: records.clone(),
                    next: None,
                })
            });
        gateway
    }

    #[tokio::test]
    async fn writes_one_record_per_pull_request_with_ids_preserved() {
        let (_guard, store) = temp_store();
        let gateway = single_page_gateway(vec![record(1), record(7), record(19)]);

        let summary = RepositoryImport::new(&gateway)
            .run(&repository(), &store, ImportOptions::default())
            .await
            .expect("import should succeed");

        assert_eq!(summary.pull_requests, 3);
        let repo_store = store.repository(&repository()).expect("should open");
        let ids = repo_store.recorded_ids().expect("should list");
        assert_eq!(
            ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
            vec![1, 7, 19]
        );
    }

    #[tokio::test]
    async fn rerunning_against_unchanged_input_is_byte_identical() {
        let (_guard, store) = temp_store();
        let repo = repository();
        let record_path = store
            .repository(&repo)
            .expect("should open")
            .path()
            .join("pr-1.json");

        for _ in 0..2 {
            let gateway = single_page_gateway(vec![record(1)]);
            RepositoryImport::new(&gateway)
                .run(&repo, &store, ImportOptions::default())
                .await
                .expect("import should succeed");
        }

        let content = std::fs::read(record_path.as_std_path()).expect("record should exist");
        let gateway = single_page_gateway(vec![record(1)]);
        RepositoryImport::new(&gateway)
            .run(&repo, &store, ImportOptions::default())
            .await
            .expect("import should succeed");
        let rerun = std::fs::read(record_path.as_std_path()).expect("record should exist");

        assert_eq!(content, rerun);
    }

    #[tokio::test]
    async fn empty_repository_writes_nothing_and_succeeds() {
        let (_guard, store) = temp_store();
        let gateway = single_page_gateway(Vec::new());

        let summary = RepositoryImport::new(&gateway)
            .run(&repository(), &store, ImportOptions::default())
            .await
            .expect("import should succeed");

        assert_eq!(summary.pull_requests, 0);
        let repo_store = store.repository(&repository()).expect("should open");
        assert!(repo_store.recorded_ids().expect("should list").is_empty());
    }

    #[tokio::test]
    async fn follows_pagination_across_pages() {
        let (_guard, store) = temp_store();
        let mut gateway = MockPullRequestGateway::new();

        gateway
            .expect_list_pull_requests()
            .with(eq(repository()), eq(PageCursor::default()))
            .times(1)
            .returning(|_, cursor| {
                Ok(PullRequestPage {
                    values: vec![record(1)],
                    next: Some(cursor.advanced_to(1)),
                })
            });
        gateway
            .expect_list_pull_requests()
            .with(eq(repository()), eq(PageCursor::default().advanced_to(1)))
            .times(1)
            .returning(|_, _| {
                Ok(PullRequestPage {
                    values: vec![record(2)],
                    next: None,
                })
            });

        let summary = RepositoryImport::new(&gateway)
            .run(&repository(), &store, ImportOptions::default())
            .await
            .expect("import should succeed");

        assert_eq!(summary.pull_requests, 2);
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped_and_later_pull_requests_still_import() {
        let (_guard, store) = temp_store();
        let mut gateway = MockPullRequestGateway::new();

        gateway
            .expect_list_pull_requests()
            .times(1)
            .returning(|_, _| {
                Ok(PullRequestPage {
                    values: vec![record(1), record(2)],
                    next: None,
                })
            });
        gateway
            .expect_pull_request_comments()
            .with(eq(repository()), eq(PullRequestId::new(1)))
            .times(1)
            .returning(|_, _| {
                Err(ExportError::Api {
                    message: "activities unavailable".to_owned(),
                })
            });
        gateway
            .expect_pull_request_comments()
            .with(eq(repository()), eq(PullRequestId::new(2)))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        gateway
            .expect_pull_request_diff()
            .with(eq(repository()), eq(PullRequestId::new(1)))
            .times(1)
            .returning(|_, _| {
                Err(ExportError::Network {
                    message: "connection reset".to_owned(),
                })
            });
        gateway
            .expect_pull_request_diff()
            .with(eq(repository()), eq(PullRequestId::new(2)))
            .times(1)
            .returning(|_, _| Ok("diff --git a b\n".to_owned()));

        let options = ImportOptions {
            include_diffs: true,
            include_comments: true,
        };
        let summary = RepositoryImport::new(&gateway)
            .run(&repository(), &store, options)
            .await
            .expect("import should continue past per-item failures");

        assert_eq!(summary.pull_requests, 2);
        assert_eq!(summary.diffs, 1);
        assert_eq!(summary.comment_files, 1);
        assert_eq!(summary.skipped, 2);

        let repo_store = store.repository(&repository()).expect("should open");
        let ids = repo_store.recorded_ids().expect("should list");
        assert_eq!(
            ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(!repo_store.has_diff(PullRequestId::new(1)));
        assert!(repo_store.has_diff(PullRequestId::new(2)));
    }

    #[tokio::test]
    async fn authentication_failure_during_a_fetch_aborts_the_import() {
        let (_guard, store) = temp_store();
        let mut gateway = MockPullRequestGateway::new();

        gateway
            .expect_list_pull_requests()
            .times(1)
            .returning(|_, _| {
                Ok(PullRequestPage {
                    values: vec![record(1), record(2)],
                    next: None,
                })
            });
        gateway
            .expect_pull_request_diff()
            .times(1)
            .returning(|_, _| {
                Err(ExportError::Authentication {
                    message: "bad credentials".to_owned(),
                })
            });

        let options = ImportOptions {
            include_diffs: true,
            include_comments: false,
        };
        let result = RepositoryImport::new(&gateway)
            .run(&repository(), &store, options)
            .await;

        assert!(matches!(result, Err(ExportError::Authentication { .. })));
    }

    #[tokio::test]
    async fn flags_drive_diff_and_comment_fetches() {
        let (_guard, store) = temp_store();
        let mut gateway = MockPullRequestGateway::new();

        gateway
            .expect_list_pull_requests()
            .times(1)
            .returning(|_, _| {
                Ok(PullRequestPage {
                    values: vec![record(5)],
                    next: None,
                })
            });
        gateway
            .expect_pull_request_comments()
            .with(eq(repository()), eq(PullRequestId::new(5)))
            .times(1)
            .returning(|_, _| {
                Ok(vec![PullRequestComment {
                    id: 99,
                    text: Some("ship it".to_owned()),
                    ..Default::default()
                }])
            });
        gateway
            .expect_pull_request_diff()
            .with(eq(repository()), eq(PullRequestId::new(5)))
            .times(1)
            .returning(|_, _| Ok("diff --git a b\n".to_owned()));

        let options = ImportOptions {
            include_diffs: true,
            include_comments: true,
        };
        let summary = RepositoryImport::new(&gateway)
            .run(&repository(), &store, options)
            .await
            .expect("import should succeed");

        assert_eq!(summary.diffs, 1);
        assert_eq!(summary.comment_files, 1);

        let repo_store = store.repository(&repository()).expect("should open");
        assert!(repo_store.has_diff(PullRequestId::new(5)));
    }
}
