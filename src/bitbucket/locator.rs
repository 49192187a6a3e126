//! Server locator and identity wrappers for Bitbucket export.

use url::Url;

use super::error::ExportError;

/// REST API version selected from the server host.
///
/// Bitbucket Cloud (`bitbucket.org`) speaks version 2.0; self-hosted
/// Server/Data Center instances speak version 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// Bitbucket Server / Data Center REST API (`rest/api/1.0`).
    Server,
    /// Bitbucket Cloud REST API (`rest/api/2.0`).
    Cloud,
}

impl ApiVersion {
    /// Returns the version segment used in endpoint URLs.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Server => "1.0",
            Self::Cloud => "2.0",
        }
    }
}

/// Project key wrapper to avoid stringly typed parameters.
///
/// Keys are lower-cased on construction, matching how the server treats
/// them case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub(crate) fn new(value: &str) -> Result<Self, ExportError> {
        if value.is_empty() {
            return Err(ExportError::InvalidRepository {
                value: value.to_owned(),
            });
        }
        Ok(Self(value.to_lowercase()))
    }

    /// Borrow the project key.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository slug wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug(String);

impl RepositorySlug {
    pub(crate) fn new(value: &str) -> Result<Self, ExportError> {
        if value.is_empty() {
            return Err(ExportError::InvalidRepository {
                value: value.to_owned(),
            });
        }
        Ok(Self(value.to_lowercase()))
    }

    /// Borrow the repository slug.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request identifier assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PullRequestId(u64);

impl PullRequestId {
    /// Wraps a server-assigned pull request identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Basic-auth credentials parsed from a `user:password` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Parses a `user:password` pair, splitting on the first colon.
    ///
    /// The password may itself contain colons.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MalformedCredentials`] when the pair has no
    /// colon or an empty username.
    pub fn parse(pair: &str) -> Result<Self, ExportError> {
        let (username, password) = pair
            .split_once(':')
            .ok_or(ExportError::MalformedCredentials)?;
        if username.trim().is_empty() {
            return Err(ExportError::MalformedCredentials);
        }
        Ok(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Borrow the username.
    #[must_use]
    pub const fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Borrow the password.
    #[must_use]
    pub const fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Repository coordinates in `PROJECT/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinates {
    project: ProjectKey,
    slug: RepositorySlug,
}

impl RepositoryCoordinates {
    /// Parses a `PROJECT/repo` coordinate string.
    ///
    /// Both segments are lower-cased, matching server behaviour.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidRepository`] when the string does not
    /// split into two non-empty segments.
    pub fn parse(value: &str) -> Result<Self, ExportError> {
        let (project, slug) = value
            .split_once('/')
            .ok_or_else(|| ExportError::InvalidRepository {
                value: value.to_owned(),
            })?;
        Ok(Self {
            project: ProjectKey::new(project)?,
            slug: RepositorySlug::new(slug)?,
        })
    }

    /// Project key.
    #[must_use]
    pub const fn project(&self) -> &ProjectKey {
        &self.project
    }

    /// Repository slug.
    #[must_use]
    pub const fn slug(&self) -> &RepositorySlug {
        &self.slug
    }

    /// Canonical `project/slug` form, used for display and store layout.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.project.as_str(), self.slug.as_str())
    }
}

/// Parsed Bitbucket server base URL with its derived REST endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLocator {
    api_base: Url,
    version: ApiVersion,
}

impl ServerLocator {
    /// Parses a server base URL and derives the REST API endpoint.
    ///
    /// Hosts under `bitbucket.org` select the Cloud 2.0 API, everything
    /// else the Server 1.0 API. The endpoint base is
    /// `{server}/rest/api/{version}/`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidUrl`] when parsing fails or the URL
    /// has no host.
    pub fn parse(input: &str) -> Result<Self, ExportError> {
        let trimmed = if input.ends_with('/') {
            input.to_owned()
        } else {
            format!("{input}/")
        };
        let parsed =
            Url::parse(&trimmed).map_err(|error| ExportError::InvalidUrl(error.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ExportError::InvalidUrl("URL must include a host".to_owned()))?;

        let version = if host.eq_ignore_ascii_case("bitbucket.org")
            || host.to_lowercase().ends_with(".bitbucket.org")
        {
            ApiVersion::Cloud
        } else {
            ApiVersion::Server
        };

        let api_base = parsed
            .join(&format!("rest/api/{}/", version.segment()))
            .map_err(|error| ExportError::InvalidUrl(error.to_string()))?;

        Ok(Self { api_base, version })
    }

    /// REST API base URL derived from the server host.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Detected API version.
    #[must_use]
    pub const fn version(&self) -> ApiVersion {
        self.version
    }

    /// Server origin without the REST suffix, used to filter image URLs.
    #[must_use]
    pub fn origin(&self) -> String {
        let mut origin = self.api_base.origin().ascii_serialization();
        origin.push('/');
        origin
    }

    pub(crate) fn pull_requests_url(
        &self,
        repository: &RepositoryCoordinates,
    ) -> Result<Url, ExportError> {
        self.join(&format!(
            "projects/{}/repos/{}/pull-requests",
            repository.project().as_str(),
            repository.slug().as_str()
        ))
    }

    pub(crate) fn activities_url(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<Url, ExportError> {
        self.join(&format!(
            "projects/{}/repos/{}/pull-requests/{}/activities",
            repository.project().as_str(),
            repository.slug().as_str(),
            id.get()
        ))
    }

    pub(crate) fn diff_url(
        &self,
        repository: &RepositoryCoordinates,
        id: PullRequestId,
    ) -> Result<Url, ExportError> {
        self.join(&format!(
            "projects/{}/repos/{}/pull-requests/{}.diff",
            repository.project().as_str(),
            repository.slug().as_str(),
            id.get()
        ))
    }

    fn join(&self, path: &str) -> Result<Url, ExportError> {
        self.api_base
            .join(path)
            .map_err(|error| ExportError::InvalidUrl(error.to_string()))
    }
}
