//! bbexport library crate providing Bitbucket pull request export.
//!
//! The library parses server URLs and repository coordinates, retrieves
//! pull request metadata, comments, diffs, and embedded images over the
//! Bitbucket REST API, and persists everything to a local export store.
//! A companion exporter container can be built and run against the store.

pub mod bitbucket;
pub mod config;
pub mod exporter;
pub mod import;
pub mod media;
pub mod store;
pub mod telemetry;

pub use bitbucket::{
    Credentials, ExportError, HttpMediaGateway, HttpPullRequestGateway, MediaGateway, PageCursor,
    PullRequestComment, PullRequestGateway, PullRequestId, PullRequestRecord,
    RepositoryCoordinates, RequestBudget, ServerLocator,
};
pub use config::{BbexportConfig, OperationMode};
pub use exporter::{ContainerExporter, ExporterSpec};
pub use import::backfill::DiffBackfill;
pub use import::multi::{FailurePolicy, Manifest, MultiRepositoryImport, RepositoryOutcome};
pub use import::{ImportOptions, ImportSummary, RepositoryImport};
pub use media::{ImageDump, extract_image_urls, scan_store};
pub use store::ExportStore;
pub use telemetry::{StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
