use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MogrtError>;

/// Top level error returned from the [`crate::Mogrt`] facade.
#[derive(Debug, Error)]
pub enum MogrtError {
    #[error("`{operation}` called before the template was initialized, call `init()` first")]
    NotInitialized { operation: &'static str },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to parse manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("An I/O error has occurred while writing to {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Errors coming from the zip container itself.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open template {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("template does not contain member `{name}`")]
    MissingMember { name: String },

    #[error("template does not contain a manifest (expected `definition.xml` or `definition.json`)")]
    NoManifest,

    #[error("template does not contain an embedded project file")]
    NoProjectFile,

    #[error("failed to read member `{name}`: {source}")]
    Read { name: String, source: io::Error },

    #[error("failed to open nested project archive `{name}`: {source}")]
    NestedProject {
        name: String,
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    /// Maps a zip error raised while looking up `name` to the matching variant.
    pub(crate) fn from_member_lookup(name: &str, err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::FileNotFound => ArchiveError::MissingMember {
                name: name.to_owned(),
            },
            zip::result::ZipError::Io(source) => ArchiveError::Read {
                name: name.to_owned(),
                source,
            },
            other => ArchiveError::Read {
                name: name.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidData, other),
            },
        }
    }
}

/// The manifest bytes did not have the structure of a template manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed XML at position {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in {what}")]
    InvalidUtf8 { what: &'static str },

    #[error("manifest is empty")]
    EmptyDocument,

    #[error("missing expected node `{path}`")]
    MissingNode { path: String },

    #[error("node `{path}` has an unexpected shape, expected {expected}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
    },

    #[error("locale table at `{path}` has no entries")]
    EmptyLocaleTable { path: String },

    #[error("locale table entry {index} at `{path}` is missing `localeString` or its text")]
    MalformedLocaleEntry { path: String, index: usize },

    #[error("node `{path}` should be `true` or `false`, found `{value}`")]
    InvalidBool { path: String, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot flatten a locale table without entries")]
    EmptyLocaleTable,
}
