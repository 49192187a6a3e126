//! Filesystem export store.
//!
//! Exported data lives under one root directory with a fixed layout:
//!
//! ```text
//! <root>/<project>/<slug>/pull-requests/pr-<id>.json
//! <root>/<project>/<slug>/pull-requests/pr-<id>.diff
//! <root>/<project>/<slug>/pull-requests/pr-<id>-comments.json
//! ```
//!
//! Records are written as pretty-printed JSON with a trailing newline.
//! Struct field order fixes the serialised key order, so re-running an
//! import against unchanged input rewrites byte-identical files.

pub mod filename;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::{PullRequestId, RepositoryCoordinates};
use crate::bitbucket::models::{PullRequestComment, PullRequestRecord};

/// Opens `path` as a capability directory, creating parents when needed.
pub(crate) fn open_dir_with_parents(path: &Utf8Path) -> Result<Dir, ExportError> {
    let (anchor, relative) = if path.is_absolute() {
        let root = Dir::open_ambient_dir("/", ambient_authority()).map_err(|error| {
            ExportError::Io {
                message: format!("failed to open filesystem root: {error}"),
            }
        })?;
        let rel = path.strip_prefix("/").map_err(|_| ExportError::Io {
            message: format!("failed to normalise path '{path}'"),
        })?;
        (root, rel)
    } else {
        let cwd = Dir::open_ambient_dir(".", ambient_authority()).map_err(|error| {
            ExportError::Io {
                message: format!("failed to open current directory: {error}"),
            }
        })?;
        (cwd, path)
    };

    if relative.as_str().is_empty() || relative == Utf8Path::new(".") {
        return Ok(anchor);
    }

    anchor
        .create_dir_all(relative)
        .map_err(|error| ExportError::Io {
            message: format!("failed to create directory '{path}': {error}"),
        })?;
    anchor.open_dir(relative).map_err(|error| ExportError::Io {
        message: format!("failed to open directory '{path}': {error}"),
    })
}

/// Root of the export tree.
#[derive(Debug)]
pub struct ExportStore {
    root: Utf8PathBuf,
}

impl ExportStore {
    /// Opens the store root, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, ExportError> {
        let root_path = root.into();
        // Open eagerly so a bad root fails before any API traffic.
        open_dir_with_parents(&root_path)?;
        Ok(Self { root: root_path })
    }

    /// Path of the store root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }

    /// Opens the per-repository slice of the store.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the repository directory cannot be
    /// created or opened.
    pub fn repository(
        &self,
        repository: &RepositoryCoordinates,
    ) -> Result<RepositoryStore, ExportError> {
        let path = self
            .root
            .join(repository.project().as_str())
            .join(repository.slug().as_str())
            .join("pull-requests");
        let dir = open_dir_with_parents(&path)?;
        Ok(RepositoryStore { path, dir })
    }
}

/// Pull-request slice of the store for one repository.
#[derive(Debug)]
pub struct RepositoryStore {
    path: Utf8PathBuf,
    dir: Dir,
}

impl RepositoryStore {
    /// Directory holding this repository's pull request files.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Writes one pull request record, returning the file name used.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when serialisation or the write fails.
    pub fn write_record(&self, record: &PullRequestRecord) -> Result<String, ExportError> {
        let file_name = format!("pr-{}.json", record.id);
        self.write_json(&file_name, record)?;
        Ok(file_name)
    }

    /// Writes the raw diff for a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the write fails.
    pub fn write_diff(&self, id: PullRequestId, diff: &str) -> Result<(), ExportError> {
        let file_name = format!("pr-{}.diff", id.get());
        self.dir
            .write(&file_name, diff)
            .map_err(|error| self.io_error(&file_name, &error))
    }

    /// Writes the comments attached to a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when serialisation or the write fails.
    pub fn write_comments(
        &self,
        id: PullRequestId,
        comments: &[PullRequestComment],
    ) -> Result<(), ExportError> {
        let file_name = format!("pr-{}-comments.json", id.get());
        self.write_json(&file_name, comments)
    }

    /// Returns true when a diff file exists for the pull request.
    #[must_use]
    pub fn has_diff(&self, id: PullRequestId) -> bool {
        self.dir.exists(format!("pr-{}.diff", id.get()))
    }

    /// Lists the identifiers of all recorded pull requests, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the directory cannot be listed.
    pub fn recorded_ids(&self) -> Result<Vec<PullRequestId>, ExportError> {
        let mut ids = Vec::new();
        for entry_result in self.dir.entries().map_err(|error| ExportError::Io {
            message: format!("failed to list '{}': {error}", self.path),
        })? {
            let Ok(entry) = entry_result else { continue };
            let Ok(name) = entry.file_name() else {
                continue;
            };
            if let Some(id) = parse_record_file_name(&name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Reads the textual content of every record and comment file.
    ///
    /// The image dumper scans this text for embedded attachment URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] when the directory cannot be listed or a
    /// file cannot be read.
    pub fn stored_text(&self) -> Result<Vec<String>, ExportError> {
        let mut texts = Vec::new();
        let mut names = Vec::new();
        for entry_result in self.dir.entries().map_err(|error| ExportError::Io {
            message: format!("failed to list '{}': {error}", self.path),
        })? {
            let Ok(entry) = entry_result else { continue };
            let Ok(name) = entry.file_name() else {
                continue;
            };
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort_unstable();

        for name in names {
            let content = self
                .dir
                .read_to_string(&name)
                .map_err(|error| ExportError::Io {
                    message: format!("failed to read '{}/{name}': {error}", self.path),
                })?;
            texts.push(content);
        }
        Ok(texts)
    }

    fn write_json<T: serde::Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), ExportError> {
        let mut json = serde_json::to_string_pretty(value).map_err(|error| ExportError::Io {
            message: format!("failed to serialise '{file_name}': {error}"),
        })?;
        json.push('\n');
        self.dir
            .write(file_name, json)
            .map_err(|error| self.io_error(file_name, &error))
    }

    fn io_error(&self, file_name: &str, error: &std::io::Error) -> ExportError {
        ExportError::Io {
            message: format!("failed to write '{}/{file_name}': {error}", self.path),
        }
    }
}

fn parse_record_file_name(name: &str) -> Option<PullRequestId> {
    let stem = name.strip_prefix("pr-")?.strip_suffix(".json")?;
    if stem.ends_with("-comments") {
        return None;
    }
    stem.parse::<u64>().ok().map(PullRequestId::new)
}
