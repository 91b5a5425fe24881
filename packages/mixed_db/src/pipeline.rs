//! The per-item update pipeline: serialize, validate, convert.
//!
//! The fourth stage, apply, is the backend [`crate::TableAccessor`] driven by
//! [`crate::MixedDbClient`] once a table's entries are accumulated. Each stage
//! is a trait object so it can be swapped for a stub and its latency measured
//! in isolation.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use sonic_data_core::{Error, Path, Result, TypedValue, Update};

use crate::convert::FieldMapConverter;
use crate::entry::{ItemLocation, TableEntry, WriteMode};

/// Renders a protocol value into canonical JSON bytes.
pub trait Serializer: Send + Sync {
    fn serialize(&self, path: &Path, value: &TypedValue) -> Result<Bytes>;
}

/// Checks a serialized item against the schema.
///
/// Implementations report non-conformance as [`Error::SchemaViolation`].
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, location: &ItemLocation, payload: &[u8]) -> Result<()>;
}

/// Turns a validated payload into backend table entries.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        location: &ItemLocation,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<Vec<TableEntry>>;
}

/// Decodes the value and re-encodes it with sorted object keys.
pub struct CanonicalJson;

impl Serializer for CanonicalJson {
    fn serialize(&self, path: &Path, value: &TypedValue) -> Result<Bytes> {
        let invalid = |error: serde_json::Error| Error::InvalidValue {
            path: path.clone(),
            message: error.to_string(),
        };
        let value = value.to_json().map_err(invalid)?;
        Ok(Bytes::from(serde_json::to_vec(&value).map_err(invalid)?))
    }
}

/// Hands JSON payloads through untouched; only scalar values are encoded.
///
/// Skips the decode/encode round trip of [`CanonicalJson`]; malformed JSON is
/// then only caught by later stages.
pub struct RawJson;

impl Serializer for RawJson {
    fn serialize(&self, path: &Path, value: &TypedValue) -> Result<Bytes> {
        match value {
            TypedValue::JsonIetf(bytes) | TypedValue::Json(bytes) => Ok(bytes.clone()),
            scalar => CanonicalJson.serialize(path, scalar),
        }
    }
}

/// Accepts everything.
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _location: &ItemLocation, _payload: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Serialize,
    Validate,
    Convert,
    Apply,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Serialize => "serialize",
            Stage::Validate => "validate",
            Stage::Convert => "convert",
            Stage::Apply => "apply",
        };
        f.write_str(name)
    }
}

/// Time spent in each stage, summed over every item of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub serialize: Duration,
    pub validate: Duration,
    pub convert: Duration,
    pub apply: Duration,
}

impl StageTimings {
    pub fn get(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Serialize => self.serialize,
            Stage::Validate => self.validate,
            Stage::Convert => self.convert,
            Stage::Apply => self.apply,
        }
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let slot = match stage {
            Stage::Serialize => &mut self.serialize,
            Stage::Validate => &mut self.validate,
            Stage::Convert => &mut self.convert,
            Stage::Apply => &mut self.apply,
        };
        *slot += elapsed;
    }

    pub fn total(&self) -> Duration {
        self.serialize + self.validate + self.convert + self.apply
    }

    /// Run `operation`, charging its wall time to `stage`.
    pub fn time<T>(&mut self, stage: Stage, operation: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = operation();
        self.record(stage, start.elapsed());
        result
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "serialize {:?}, validate {:?}, convert {:?}, apply {:?}",
            self.serialize, self.validate, self.convert, self.apply
        )
    }
}

/// The serialize, validate and convert stages in their fixed order.
pub struct Pipeline {
    serializer: Box<dyn Serializer>,
    validator: Box<dyn SchemaValidator>,
    converter: Box<dyn Converter>,
}

impl Pipeline {
    /// [`CanonicalJson`], [`AcceptAll`] and [`FieldMapConverter`].
    pub fn new() -> Self {
        Self {
            serializer: Box::new(CanonicalJson),
            validator: Box::new(AcceptAll),
            converter: Box::new(FieldMapConverter),
        }
    }

    #[must_use]
    pub fn with_serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Box::new(serializer);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Drive one item through the stages, stopping at the first failure.
    pub fn run(
        &self,
        location: &ItemLocation,
        update: &Update,
        mode: WriteMode,
        timings: &mut StageTimings,
    ) -> Result<Vec<TableEntry>> {
        let payload = timings.time(Stage::Serialize, || {
            self.serializer.serialize(&update.path, &update.value)
        })?;
        timings.time(Stage::Validate, || self.validator.validate(location, &payload))?;
        timings.time(Stage::Convert, || {
            self.converter.convert(location, &payload, mode)
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
