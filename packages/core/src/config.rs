//! Client configuration.
//!
//! Configuration is a JSON object like:
//! ```json
//! {
//!     "checkpoint": "/etc/sonic/gnmi/config.cp.json",
//!     "origin": "sonic-db",
//!     "target": "APPL_DB",
//!     "tables": {
//!         "DASH_QOS": {"key_pattern": "^qos_[0-9]+$", "fields": ["bw", "cps", "flows"]}
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path as FsPath, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::resolve::resolve_origin;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Location of the JSON checkpoint backing the JSON client.
    pub checkpoint: PathBuf,
    /// Default schema namespace for requests whose paths carry no origin.
    #[serde(default)]
    pub origin: String,
    /// Default database for writes whose paths carry no target hint.
    #[serde(default)]
    pub target: String,
    /// Per-table schema rules. Empty means every write is accepted.
    #[serde(default)]
    pub tables: BTreeMap<String, TableSchemaConfig>,
}

/// Schema rules for one table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableSchemaConfig {
    /// Regular expression every key of the table must match.
    #[serde(default)]
    pub key_pattern: Option<String>,
    /// Allowed field names; empty allows any field.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ClientConfig {
    pub fn load(location: impl AsRef<FsPath>) -> Result<Self> {
        let location = location.as_ref();
        let text = fs::read_to_string(location).map_err(|source| Error::Io {
            location: location.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|error| match error {
            Error::Config { message } => Error::Config {
                message: format!("{}: {}", location.display(), message),
            },
            other => other,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| Error::Config {
            message: error.to_string(),
        })
    }

    /// The origin a request over `paths` addresses, checked against the
    /// configured default.
    pub fn request_origin<'a, I>(&self, paths: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        resolve_origin(&self.origin, paths)
    }
}
