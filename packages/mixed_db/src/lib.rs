//! Batched, schema-validated writes to the switch-state database.
//!
//! A request batch (deletes, replaces, updates) is grouped by table. Every
//! replace and update item goes through the [`Pipeline`] stages: serialize,
//! validate, convert. The resulting [`TableEntry`] records are handed to a
//! [`TableAccessor`] with one call per table.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sonic_data_core::{Path, TypedValue, Update};
//! use sonic_data_mixed_db::{InMemoryTables, MixedDbClient};
//!
//! let client = MixedDbClient::new("APPL_DB", Arc::new(InMemoryTables::new()));
//! let update = Update::new(
//!     Path::parse("DASH_QOS/qos_01").unwrap(),
//!     TypedValue::json_ietf(&br#"{"bw": "54321"}"#[..]),
//! );
//! client.set_db(&[], &[update], &[]).unwrap();
//!
//! let stored = client.get_db(&Path::parse("DASH_QOS/qos_01/bw").unwrap()).unwrap();
//! assert_eq!(stored, br#""54321""#);
//! ```

pub mod backend;
pub mod client;
pub mod convert;
pub mod entry;
pub mod pipeline;
pub mod schema;

pub use backend::{InMemoryTables, InMemoryTablesError, Rows, TableAccessor};
pub use client::{BatchReport, MixedDbClient};
pub use convert::FieldMapConverter;
pub use entry::{Fields, ItemLocation, KeySelector, TableEntry, WriteMode};
pub use pipeline::{
    AcceptAll, CanonicalJson, Converter, Pipeline, RawJson, SchemaValidator, Serializer, Stage,
    StageTimings,
};
pub use schema::FieldSchemaValidator;
