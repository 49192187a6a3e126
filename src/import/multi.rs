//! Multi-repository import driven by a JSON manifest.
//!
//! The manifest lists repository coordinates to import in order. A failure
//! on one repository either stops the whole run or is recorded and
//! skipped, per [`FailurePolicy`].

use camino::Utf8Path;
use serde::Deserialize;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::gateway::PullRequestGateway;
use crate::bitbucket::locator::RepositoryCoordinates;
use crate::store::ExportStore;

use super::{ImportOptions, ImportSummary, RepositoryImport};

/// Manifest file content: the repositories to import.
///
/// ```json
/// { "repositories": ["TEAM/widget", "TEAM/gadget"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Repository coordinates in `PROJECT/repo` form, imported in order.
    pub repositories: Vec<String>,
}

impl Manifest {
    /// Loads and validates a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the file cannot be read,
    /// [`ExportError::Configuration`] when it is not valid JSON or lists
    /// no repositories.
    pub fn load(path: &Utf8Path) -> Result<Self, ExportError> {
        let content =
            std::fs::read_to_string(path.as_std_path()).map_err(|error| ExportError::Io {
                message: format!("failed to read manifest '{path}': {error}"),
            })?;
        let manifest: Self =
            serde_json::from_str(&content).map_err(|error| ExportError::Configuration {
                message: format!("manifest '{path}' is not valid JSON: {error}"),
            })?;
        if manifest.repositories.is_empty() {
            return Err(ExportError::Configuration {
                message: format!("manifest '{path}' lists no repositories"),
            });
        }
        Ok(manifest)
    }
}

/// What to do when one repository fails mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run on the first failing repository.
    #[default]
    Stop,
    /// Record the failure and continue with the next repository.
    Skip,
}

/// Result of importing one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOutcome {
    /// The manifest entry as written.
    pub repository: String,
    /// Import summary, or the error that stopped this repository.
    pub result: Result<ImportSummary, ExportError>,
}

/// Imports every repository listed in a manifest.
pub struct MultiRepositoryImport<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    gateway: &'gateway Gateway,
}

impl<'gateway, Gateway> MultiRepositoryImport<'gateway, Gateway>
where
    Gateway: PullRequestGateway,
{
    /// Creates a multi-repository importer using the provided gateway.
    #[must_use]
    pub const fn new(gateway: &'gateway Gateway) -> Self {
        Self { gateway }
    }

    /// Runs the single-repository import for each manifest entry.
    ///
    /// With [`FailurePolicy::Skip`], malformed coordinates and gateway
    /// failures are recorded in the returned outcomes and the run
    /// continues; with [`FailurePolicy::Stop`] the first failure
    /// propagates.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Stop`], returns the first repository's error.
    pub async fn run(
        &self,
        manifest: &Manifest,
        store: &ExportStore,
        options: ImportOptions,
        policy: FailurePolicy,
    ) -> Result<Vec<RepositoryOutcome>, ExportError> {
        let importer = RepositoryImport::new(self.gateway);
        let mut outcomes = Vec::with_capacity(manifest.repositories.len());

        for entry in &manifest.repositories {
            let result = match RepositoryCoordinates::parse(entry) {
                Ok(repository) => importer.run(&repository, store, options).await,
                Err(error) => Err(error),
            };

            if let Err(error) = &result {
                match policy {
                    FailurePolicy::Stop => return Err(error.clone()),
                    FailurePolicy::Skip => {
                        tracing::warn!(repository = %entry, %error, "skipping failed repository");
                    }
                }
            }

            outcomes.push(RepositoryOutcome {
                repository: entry.clone(),
                result,
            });
        }

        Ok(outcomes)
    }
}
