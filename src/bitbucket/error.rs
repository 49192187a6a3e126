//! Error types exposed by the Bitbucket export layer.

use thiserror::Error;

/// Errors surfaced while parsing input or communicating with Bitbucket.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    /// The CLI did not include a server URL.
    #[error("server URL is required")]
    MissingServerUrl,

    /// The provided URL could not be parsed.
    #[error("server URL is invalid: {0}")]
    InvalidUrl(String),

    /// No repository was selected for the operation.
    #[error("repository is required (use --repository or a manifest)")]
    MissingRepository,

    /// The repository coordinates were not in `PROJECT/repo` form.
    #[error("repository must match PROJECT/repo, got '{value}'")]
    InvalidRepository {
        /// The coordinate string that failed to parse.
        value: String,
    },

    /// The credentials pair was missing.
    #[error("credentials are required (user:password)")]
    MissingCredentials,

    /// The credentials pair was present but not in `user:password` form.
    #[error("credentials must match user:password")]
    MalformedCredentials,

    /// The credentials were rejected by Bitbucket.
    #[error("Bitbucket rejected the credentials: {message}")]
    Authentication {
        /// Bitbucket error message returned with the 401/403 response.
        message: String,
    },

    /// Bitbucket returned a non-authentication API error.
    #[error("Bitbucket API error: {message}")]
    Api {
        /// Response body from Bitbucket describing the failure.
        message: String,
    },

    /// Networking failed while calling Bitbucket.
    #[error("network error talking to Bitbucket: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded or was incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The companion exporter container failed.
    #[error("exporter failed: {message}")]
    Exporter {
        /// User-readable failure reason.
        message: String,
        /// Exit code, if the container engine reported one.
        exit_code: Option<i32>,
    },
}
