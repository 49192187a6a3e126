//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.bbexport.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `BBEXPORT_SERVER_URL`, `BBEXPORT_TOKEN`,
//!    or legacy `BITBUCKET_TOKEN`
//! 4. **Command-line arguments** – `--server-url`/`-s`, `--token`/`-t`, …
//!
//! # Configuration File
//!
//! Place `.bbexport.toml` in the current directory, home directory, or
//! XDG config directory with:
//!
//! ```toml
//! server_url = "https://git.example.com"
//! token = "alice:secret"
//! repository = "TEAM/widget"
//! output_dir = "export"
//! with_diffs = true
//! ```

use std::env;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::{Credentials, RepositoryCoordinates, ServerLocator};
use crate::exporter::ExporterSpec;

/// Default export store root when none is configured.
const DEFAULT_OUTPUT_DIR: &str = "export";

/// Default container engine for the companion exporter.
const DEFAULT_ENGINE: &str = "docker";

/// Default image tag for the companion exporter.
const DEFAULT_EXPORTER_IMAGE: &str = "bbexport-exporter";

/// Default build context for the companion exporter.
const DEFAULT_EXPORTER_CONTEXT: &str = "exporter";

/// Operation mode determined by CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Import a single repository's pull requests.
    SingleRepository,
    /// Import every repository listed in a manifest.
    MultiRepository,
    /// Fetch diffs missing from a previously imported store.
    DiffBackfill,
    /// Download embedded images referenced by stored data.
    ImageDump,
    /// Build and run the companion exporter container.
    RunExporter,
    /// No operation could be derived from the configuration.
    Unspecified,
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `BBEXPORT_SERVER_URL` or `--server-url`: Bitbucket base URL
/// - `BBEXPORT_TOKEN`, `BITBUCKET_TOKEN`, or `--token`: `user:password` pair
/// - `BBEXPORT_REPOSITORY` or `--repository`: `PROJECT/repo` coordinates
/// - `BBEXPORT_MANIFEST` or `--manifest`: multi-repository manifest path
/// - `BBEXPORT_OUTPUT_DIR` or `--output-dir`: export store root
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "BBEXPORT",
    discovery(
        dotfile_name = ".bbexport.toml",
        config_file_name = "bbexport.toml",
        app_name = "bbexport"
    )
)]
pub struct BbexportConfig {
    /// Bitbucket base URL, e.g. `https://git.example.com`.
    ///
    /// Hosts under `bitbucket.org` select the Cloud 2.0 REST API,
    /// everything else the Server 1.0 API.
    #[ortho_config(cli_short = 's')]
    pub server_url: Option<String>,

    /// Credentials as a `user:password` pair.
    ///
    /// Falls back to the `BITBUCKET_TOKEN` environment variable when not
    /// provided via `BBEXPORT_TOKEN`, the CLI, or a configuration file.
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Repository coordinates in `PROJECT/repo` form.
    #[ortho_config(cli_short = 'r')]
    pub repository: Option<String>,

    /// Path to a JSON manifest listing repositories to import.
    #[ortho_config(cli_short = 'm')]
    pub manifest: Option<String>,

    /// Export store root. Defaults to `export`.
    #[ortho_config(cli_short = 'o')]
    pub output_dir: Option<String>,

    /// Also fetch and store the raw diff of every imported pull request.
    pub with_diffs: bool,

    /// Also fetch and store the comments of every imported pull request.
    pub with_comments: bool,

    /// Continue with the next repository when one fails (multi-repository
    /// imports only). Default is to stop on the first failure.
    pub skip_failures: bool,

    /// Fetch diffs missing from a previously imported store and exit.
    pub backfill_diffs: bool,

    /// Image dump destination pattern containing the `XXX` batch
    /// placeholder. Setting this selects the image dump operation.
    pub image_dump_dir: Option<String>,

    /// Builds and runs the companion exporter container and exits.
    pub run_exporter: bool,

    /// Container engine binary for the exporter. Defaults to `docker`.
    pub exporter_engine: Option<String>,

    /// Image tag for the exporter. Defaults to `bbexport-exporter`.
    pub exporter_image: Option<String>,

    /// Build context directory for the exporter. Defaults to `exporter`.
    pub exporter_context: Option<String>,
}

impl BbexportConfig {
    /// Resolves credentials from configuration or the legacy
    /// `BITBUCKET_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingCredentials`] when no source provides
    /// a value, or [`ExportError::MalformedCredentials`] when the pair is
    /// not `user:password`.
    pub fn resolve_credentials(&self) -> Result<Credentials, ExportError> {
        let pair = self
            .token
            .clone()
            .or_else(|| env::var("BITBUCKET_TOKEN").ok())
            .ok_or(ExportError::MissingCredentials)?;
        Credentials::parse(&pair)
    }

    /// Parses the configured server URL into a locator.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingServerUrl`] when no URL is configured
    /// or [`ExportError::InvalidUrl`] when it does not parse.
    pub fn require_server(&self) -> Result<ServerLocator, ExportError> {
        let url = self
            .server_url
            .as_deref()
            .ok_or(ExportError::MissingServerUrl)?;
        ServerLocator::parse(url)
    }

    /// Parses the configured repository coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingRepository`] when none are configured
    /// or [`ExportError::InvalidRepository`] when they do not parse.
    pub fn require_repository(&self) -> Result<RepositoryCoordinates, ExportError> {
        let value = self
            .repository
            .as_deref()
            .ok_or(ExportError::MissingRepository)?;
        RepositoryCoordinates::parse(value)
    }

    /// Returns the manifest path for multi-repository imports.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Configuration`] when no manifest is set.
    pub fn require_manifest(&self) -> Result<Utf8PathBuf, ExportError> {
        self.manifest
            .as_deref()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| ExportError::Configuration {
                message: "manifest path is required (use --manifest or -m)".to_owned(),
            })
    }

    /// Returns the image dump destination pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Configuration`] when none is set.
    pub fn require_image_dump_dir(&self) -> Result<Utf8PathBuf, ExportError> {
        self.image_dump_dir
            .as_deref()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| ExportError::Configuration {
                message: "image dump destination is required (use --image-dump-dir)".to_owned(),
            })
    }

    /// Export store root, defaulting to `export`.
    #[must_use]
    pub fn output_root(&self) -> Utf8PathBuf {
        self.output_dir
            .as_deref()
            .map_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR), Utf8PathBuf::from)
    }

    /// Builds the exporter spec from configuration, applying defaults.
    #[must_use]
    pub fn exporter_spec(&self) -> ExporterSpec {
        ExporterSpec {
            engine: self
                .exporter_engine
                .clone()
                .unwrap_or_else(|| DEFAULT_ENGINE.to_owned()),
            image: self
                .exporter_image
                .clone()
                .unwrap_or_else(|| DEFAULT_EXPORTER_IMAGE.to_owned()),
            context: self
                .exporter_context
                .as_deref()
                .map_or_else(|| Utf8PathBuf::from(DEFAULT_EXPORTER_CONTEXT), Utf8PathBuf::from),
            store_root: self.output_root(),
            args: Vec::new(),
        }
    }

    /// Determines the operation mode based on provided configuration.
    ///
    /// Exporter and image dump runs take precedence because they are
    /// explicit opt-ins; a manifest selects the multi-repository import
    /// over a single repository.
    #[must_use]
    pub const fn operation_mode(&self) -> OperationMode {
        if self.run_exporter {
            OperationMode::RunExporter
        } else if self.image_dump_dir.is_some() {
            OperationMode::ImageDump
        } else if self.backfill_diffs {
            OperationMode::DiffBackfill
        } else if self.manifest.is_some() {
            OperationMode::MultiRepository
        } else if self.repository.is_some() {
            OperationMode::SingleRepository
        } else {
            OperationMode::Unspecified
        }
    }
}
