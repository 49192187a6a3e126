//! Bulk image dumping for previously exported data.
//!
//! Exported records and comments may embed attachment URLs served by the
//! Bitbucket instance. This module scans stored text for those URLs,
//! downloads them within a client-side request budget, and dumps the
//! collected bytes in batches. Each batch dump contains everything
//! collected so far, so a run interrupted mid-pause still leaves a usable
//! snapshot on disk.

use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use url::Url;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::gateway::MediaGateway;
use crate::bitbucket::locator::RepositoryCoordinates;
use crate::bitbucket::rate_limit::RequestBudget;
use crate::store::filename::image_file_name;
use crate::store::{ExportStore, open_dir_with_parents};

/// Placeholder in the destination pattern replaced per batch.
pub const BATCH_PLACEHOLDER: &str = "XXX";

/// Path segment that marks served attachment URLs.
const IMAGE_PATH_MARKER: &str = "/images/";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[expect(clippy::unwrap_used, reason = "pattern is a tested constant")]
        Regex::new(
            r"https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_+.~#?&/=]*)",
        )
        .unwrap()
    })
}

/// Extracts attachment URLs from free-form text.
///
/// Matches are filtered to URLs on the given server origin whose path
/// contains `/images/`. A trailing `)` is stripped because the general
/// URL pattern overshoots Markdown links. Duplicates are removed and the
/// result is sorted for deterministic processing order.
#[must_use]
pub fn extract_image_urls(texts: &[String], server_origin: &str) -> Vec<Url> {
    let mut unique = BTreeSet::new();
    for text in texts {
        for found in url_pattern().find_iter(text) {
            let candidate = found.as_str().trim_end_matches(')');
            if candidate.starts_with(server_origin) && candidate.contains(IMAGE_PATH_MARKER) {
                unique.insert(candidate.to_owned());
            }
        }
    }

    unique
        .into_iter()
        .filter_map(|candidate| Url::parse(&candidate).ok())
        .collect()
}

/// Scans the stored records of the given repositories for image URLs.
///
/// # Errors
///
/// Returns [`ExportError::Io`] when the store cannot be read.
pub fn scan_store(
    store: &ExportStore,
    repositories: &[RepositoryCoordinates],
    server_origin: &str,
) -> Result<Vec<Url>, ExportError> {
    let mut texts = Vec::new();
    for repository in repositories {
        let repo_store = store.repository(repository)?;
        texts.extend(repo_store.stored_text()?);
    }
    Ok(extract_image_urls(&texts, server_origin))
}

/// Counts reported after an image dump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    /// URLs selected for download.
    pub requested: usize,
    /// Images downloaded and present in the final dump.
    pub downloaded: usize,
    /// Failed downloads that were skipped.
    pub skipped: usize,
    /// Intermediate batch dumps written before the final one.
    pub batches: u32,
}

/// Downloads attachment URLs within a request budget and dumps batches.
pub struct ImageDump<'gateway, Gateway>
where
    Gateway: MediaGateway,
{
    gateway: &'gateway Gateway,
    budget: RequestBudget,
}

impl<'gateway, Gateway> ImageDump<'gateway, Gateway>
where
    Gateway: MediaGateway,
{
    /// Creates a dumper with the given gateway and request budget.
    #[must_use]
    pub const fn new(gateway: &'gateway Gateway, budget: RequestBudget) -> Self {
        Self { gateway, budget }
    }

    /// Downloads every URL and dumps the results.
    ///
    /// The destination pattern must contain [`BATCH_PLACEHOLDER`], which is
    /// replaced with the 1-based batch number for intermediate dumps and
    /// with `final` for the last one. When the request budget is spent the
    /// collected batch is flushed and the run pauses until the budget
    /// window resets.
    ///
    /// Individual download failures are skipped; an authentication failure
    /// aborts the run, since retrying with the same credentials cannot
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Authentication`] on a rejected download,
    /// [`ExportError::Io`] when a dump directory cannot be written, and
    /// [`ExportError::Configuration`] when the pattern lacks the
    /// placeholder.
    pub async fn run(
        &mut self,
        urls: &[Url],
        destination_pattern: &Utf8Path,
    ) -> Result<DumpSummary, ExportError> {
        if !destination_pattern.as_str().contains(BATCH_PLACEHOLDER) {
            return Err(ExportError::Configuration {
                message: format!(
                    "image dump destination '{destination_pattern}' must contain \
                     the {BATCH_PLACEHOLDER} batch placeholder"
                ),
            });
        }

        let mut collected: Vec<(String, Vec<u8>)> = Vec::new();
        let mut summary = DumpSummary {
            requested: urls.len(),
            downloaded: 0,
            skipped: 0,
            batches: 0,
        };

        for url in urls {
            self.budget.record(Instant::now());

            match self.gateway.fetch_bytes(url).await {
                Ok(bytes) => collected.push((image_file_name(url), bytes)),
                Err(error @ ExportError::Authentication { .. }) => return Err(error),
                Err(error) => {
                    summary.skipped += 1;
                    tracing::warn!(url = %url, %error, "skipping failed image download");
                }
            }

            if self.budget.is_exhausted() {
                summary.batches += 1;
                let batch_dir =
                    destination_for(destination_pattern, &summary.batches.to_string());
                dump_batch(&batch_dir, &collected)?;

                let pause = self.budget.pause_for(Instant::now());
                tracing::debug!(
                    batch = summary.batches,
                    pause_seconds = pause.as_secs(),
                    "request budget spent; pausing until the window resets"
                );
                tokio::time::sleep(pause).await;
                self.budget.reset();
            }
        }

        let final_dir = destination_for(destination_pattern, "final");
        dump_batch(&final_dir, &collected)?;
        summary.downloaded = collected.len();
        Ok(summary)
    }
}

fn destination_for(pattern: &Utf8Path, batch: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(pattern.as_str().replace(BATCH_PLACEHOLDER, batch))
}

fn dump_batch(directory: &Utf8Path, entries: &[(String, Vec<u8>)]) -> Result<(), ExportError> {
    let dir = open_dir_with_parents(directory)?;
    for (name, bytes) in entries {
        dir.write(name, bytes).map_err(|error| ExportError::Io {
            message: format!("failed to write '{directory}/{name}': {error}"),
        })?;
    }
    Ok(())
}
