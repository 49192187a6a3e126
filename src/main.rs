//! bbexport CLI entrypoint for Bitbucket pull request export.

use std::io::{self, Write};
use std::process::ExitCode;

use bbexport::{
    BbexportConfig, ContainerExporter, DiffBackfill, ExportError, ExportStore, FailurePolicy,
    HttpMediaGateway, HttpPullRequestGateway, ImageDump, ImportOptions, Manifest,
    MultiRepositoryImport, OperationMode, RepositoryCoordinates, RepositoryImport, RequestBudget,
    StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink, scan_store,
};
use ortho_config::OrthoConfig;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ExportError> {
    let config = load_config()?;
    let telemetry = StderrJsonlTelemetrySink;

    match config.operation_mode() {
        OperationMode::SingleRepository => run_single(&config, &telemetry).await,
        OperationMode::MultiRepository => run_multi(&config, &telemetry).await,
        OperationMode::DiffBackfill => run_backfill(&config, &telemetry).await,
        OperationMode::ImageDump => run_image_dump(&config, &telemetry).await,
        OperationMode::RunExporter => run_exporter(&config).await,
        OperationMode::Unspecified => Err(ExportError::Configuration {
            message: "nothing to do: set --repository, --manifest, --image-dump-dir, \
                      --backfill-diffs, or --run-exporter"
                .to_owned(),
        }),
    }
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`ExportError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<BbexportConfig, ExportError> {
    BbexportConfig::load().map_err(|error| ExportError::Configuration {
        message: error.to_string(),
    })
}

fn pull_request_gateway(config: &BbexportConfig) -> Result<HttpPullRequestGateway, ExportError> {
    let server = config.require_server()?;
    let credentials = config.resolve_credentials()?;
    HttpPullRequestGateway::for_credentials(credentials, server)
}

const fn import_options(config: &BbexportConfig) -> ImportOptions {
    ImportOptions {
        include_diffs: config.with_diffs,
        include_comments: config.with_comments,
    }
}

async fn run_single(
    config: &BbexportConfig,
    telemetry: &dyn TelemetrySink,
) -> Result<(), ExportError> {
    let repository = config.require_repository()?;
    let gateway = pull_request_gateway(config)?;
    let store = ExportStore::open(config.output_root())?;

    let summary = RepositoryImport::new(&gateway)
        .run(&repository, &store, import_options(config))
        .await?;

    telemetry.record(TelemetryEvent::RepositoryImported {
        repository: summary.repository.clone(),
        pull_requests: summary.pull_requests,
    });
    write_line(&format!(
        "Imported {} pull requests from {} into {}",
        summary.pull_requests,
        summary.repository,
        store.root()
    ))
}

async fn run_multi(
    config: &BbexportConfig,
    telemetry: &dyn TelemetrySink,
) -> Result<(), ExportError> {
    let manifest = Manifest::load(&config.require_manifest()?)?;
    let gateway = pull_request_gateway(config)?;
    let store = ExportStore::open(config.output_root())?;
    let policy = if config.skip_failures {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Stop
    };

    let outcomes = MultiRepositoryImport::new(&gateway)
        .run(&manifest, &store, import_options(config), policy)
        .await?;

    let mut imported = 0_usize;
    let mut failed = 0_usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(summary) => {
                imported += 1;
                telemetry.record(TelemetryEvent::RepositoryImported {
                    repository: summary.repository.clone(),
                    pull_requests: summary.pull_requests,
                });
            }
            Err(_) => failed += 1,
        }
    }

    write_line(&format!(
        "Imported {imported} repositories into {} ({failed} failed)",
        store.root()
    ))
}

async fn run_backfill(
    config: &BbexportConfig,
    telemetry: &dyn TelemetrySink,
) -> Result<(), ExportError> {
    let repository = config.require_repository()?;
    let gateway = pull_request_gateway(config)?;
    let store = ExportStore::open(config.output_root())?;

    let summary = DiffBackfill::new(&gateway).run(&repository, &store).await?;

    telemetry.record(TelemetryEvent::DiffsBackfilled {
        repository: summary.repository.clone(),
        fetched: summary.fetched,
    });
    write_line(&format!(
        "Backfilled {} of {} diffs for {}",
        summary.fetched, summary.examined, summary.repository
    ))
}

async fn run_image_dump(
    config: &BbexportConfig,
    telemetry: &dyn TelemetrySink,
) -> Result<(), ExportError> {
    let server = config.require_server()?;
    let repositories = dump_repositories(config)?;
    let store = ExportStore::open(config.output_root())?;
    let urls = scan_store(&store, &repositories, &server.origin())?;

    let credentials = config.resolve_credentials()?;
    let gateway = HttpMediaGateway::for_credentials(credentials)?;
    let destination = config.require_image_dump_dir()?;

    let summary = ImageDump::new(&gateway, RequestBudget::bitbucket_cloud())
        .run(&urls, &destination)
        .await?;

    telemetry.record(TelemetryEvent::ImagesDumped {
        requested: summary.requested,
        downloaded: summary.downloaded,
    });
    write_line(&format!(
        "Dumped {} of {} images ({} skipped, {} intermediate batches)",
        summary.downloaded, summary.requested, summary.skipped, summary.batches
    ))
}

/// Repositories whose stored data feeds the image dump.
fn dump_repositories(
    config: &BbexportConfig,
) -> Result<Vec<RepositoryCoordinates>, ExportError> {
    if let Some(path) = config.manifest.as_deref() {
        let manifest = Manifest::load(camino::Utf8Path::new(path))?;
        return manifest
            .repositories
            .iter()
            .map(|entry| RepositoryCoordinates::parse(entry))
            .collect();
    }
    Ok(vec![config.require_repository()?])
}

async fn run_exporter(config: &BbexportConfig) -> Result<(), ExportError> {
    let exporter = ContainerExporter::new(config.exporter_spec());
    exporter.run().await?;
    write_line("Exporter container finished")
}

fn write_line(message: &str) -> Result<(), ExportError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{message}").map_err(|error| ExportError::Io {
        message: error.to_string(),
    })
}
