//! Diff bulk loader for a previously imported store.

use crate::bitbucket::error::ExportError;
use crate::bitbucket::gateway::PullRequestGateway;
use crate::bitbucket::locator::RepositoryCoordinates;
use crate::store::ExportStore;

/// Counts reported after a diff backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Canonical `project/slug` of the repository.
    pub repository: String,
    /// Pull request records found in the store.
    pub examined: usize,
    /// Diffs fetched and written during this run.
    pub fetched: usize,
}

/// Fetches diffs missing from an already-populated store.
pub struct DiffBackfill<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    gateway: &'gateway Gateway,
}

impl<'gateway, Gateway> DiffBackfill<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    /// Creates a backfill runner using the provided gateway.
    #[must_use]
    pub const fn new(gateway: &'gateway Gateway) -> Self {
        Self { gateway }
    }

    /// Fetches and writes a diff for every recorded pull request that
    /// does not yet have one. Already-present diffs are left untouched.
    ///
    /// # Errors
    ///
    /// Propagates gateway and store failures.
    pub async fn run(
        &self,
        repository: &RepositoryCoordinates,
        store: &ExportStore,
    ) -> Result<BackfillSummary, ExportError> {
        let repo_store = store.repository(repository)?;
        let ids = repo_store.recorded_ids()?;

        let mut summary = BackfillSummary {
            repository: repository.qualified_name(),
            examined: ids.len(),
            fetched: 0,
        };

        for id in ids {
            if repo_store.has_diff(id) {
                continue;
            }
            let diff = self.gateway.pull_request_diff(repository, id).await?;
            repo_store.write_diff(id, &diff)?;
            summary.fetched += 1;
        }

        tracing::debug!(
            repository = %summary.repository,
            fetched = summary.fetched,
            "diff backfill finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use mockall::predicate::eq;

    use super::DiffBackfill;
    use crate::bitbucket::gateway::MockPullRequestGateway;
    use crate::bitbucket::locator::{PullRequestId, RepositoryCoordinates};
    use crate::bitbucket::models::PullRequestRecord;
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

    fn seed_record(store: &ExportStore, id: u64) {
        store
            .repository(&repository())
            .expect("should open")
            .write_record(&PullRequestRecord {
                id,
                ..Default::default()
            })
            .expect("record should write");
    }

    #[tokio::test]
    async fn fetches_only_missing_diffs() {
        let (_guard, store) = temp_store();
        seed_record(&store, 1);
        seed_record(&store, 2);
        store
            .repository(&repository())
            .expect("should open")
            .write_diff(PullRequestId::new(1), "already here\n")
            .expect("diff should write");

        let mut gateway = MockPullRequestGateway::new();
        gateway
            .expect_pull_request_diff()
            .with(eq(repository()), eq(PullRequestId::new(2)))
            .times(1)
            .returning(|_, _| Ok("diff --git a b\n".to_owned()));

        let summary = DiffBackfill::new(&gateway)
            .run(&repository(), &store)
            .await
            .expect("backfill should succeed");

        assert_eq!(summary.examined, 2);
        assert_eq!(summary.fetched, 1);
    }

    #[tokio::test]
    async fn empty_store_backfills_nothing() {
        let (_guard, store) = temp_store();
        let gateway = MockPullRequestGateway::new();

        let summary = DiffBackfill::new(&gateway)
            .run(&repository(), &store)
            .await
            .expect("backfill should succeed");

        assert_eq!(summary.examined, 0);
        assert_eq!(summary.fetched, 0);
    }
}
