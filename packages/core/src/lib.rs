//! Core types for the SONiC data client.
//!
//! - `Path`: structural path with optional origin/target hints
//! - `Error`: error kinds shared by the JSON store and the database writer
//! - `resolve_origin`/`resolve_target`: decide which namespace/database a
//!   request addresses
//! - `TypedValue`/`Update`: protocol values carried by write requests
//! - `ClientConfig`: checkpoint location, default target, table schemas
//!
//! # Example
//!
//! ```rust
//! use sonic_data_core::{resolve_target, Path};
//!
//! let paths = vec![Path::parse_xpath("sonic-db:APPL_DB/DASH_QOS").unwrap()];
//! assert_eq!(resolve_target("", &paths).unwrap(), "APPL_DB");
//! ```

pub use bytes::Bytes;

pub mod config;
mod error;
mod path;
mod resolve;
mod value;

pub use config::{ClientConfig, TableSchemaConfig};
pub use error::{AppliedCall, Attribute, BoxError, Error, Result};
pub use path::{parse_index, Path, PathError, DB_ORIGIN};
pub use resolve::{resolve_origin, resolve_target};
pub use value::{TypedValue, Update};
