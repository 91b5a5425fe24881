//! Error types shared by the JSON store and the database writer.

use std::fmt;
use std::io;

use crate::path::{Path, PathError};

/// Error type produced by external collaborators (backend table accessors).
///
/// These are carried through unchanged as the source of [`Error::Backend`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which path hint a resolver inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Origin,
    Target,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Origin => f.write_str("origin"),
            Attribute::Target => f.write_str("target"),
        }
    }
}

/// A table-scoped backend call that completed before a batch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedCall {
    Delete { table: String },
    Set { table: String },
}

impl fmt::Display for AppliedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppliedCall::Delete { table } => write!(f, "delete {}", table),
            AppliedCall::Set { table } => write!(f, "set {}", table),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Path(#[from] PathError),

    /// The checkpoint is absent, unreadable or not a JSON object.
    #[error("invalid checkpoint {}: {message}", .location.display())]
    InvalidCheckpoint {
        location: std::path::PathBuf,
        message: String,
    },

    #[error("invalid value at {path}: {message}")]
    InvalidValue { path: Path, message: String },

    #[error("invalid path {path}: {message}")]
    InvalidPath { path: Path, message: String },

    #[error("path not found: {path}")]
    NotFound { path: Path },

    /// Paths (or a path and the caller's override) disagree on origin/target.
    #[error("{attribute} conflict: expected {expected:?}, found {found:?}")]
    Conflict {
        attribute: Attribute,
        expected: String,
        found: String,
    },

    #[error("schema violation in table {table}: {detail}")]
    SchemaViolation { table: String, detail: String },

    #[error("backend error on {database}/{table}: {source}")]
    Backend {
        database: String,
        table: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid config: {message}")]
    Config { message: String },

    #[error("I/O error on {}: {source}", .location.display())]
    Io {
        location: std::path::PathBuf,
        #[source]
        source: io::Error,
    },

    /// A batch stopped at `table`; the calls in `applied` had already
    /// completed and were not rolled back.
    #[error("batch aborted at table {table}{}: {source}", describe_item(.item))]
    Batch {
        table: String,
        item: Option<Path>,
        applied: Vec<AppliedCall>,
        #[source]
        source: Box<Error>,
    },
}

fn describe_item(item: &Option<Path>) -> String {
    match item {
        Some(path) => format!(" (item {})", path),
        None => String::new(),
    }
}

impl Error {
    /// The underlying error of a batch failure, or `self` otherwise.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Batch { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
