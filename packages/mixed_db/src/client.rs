//! The batched, table-scoped database writer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value as JsonValue};
use sonic_data_core::{
    resolve_target, AppliedCall, BoxError, ClientConfig, Error, Path, Result, Update,
};

use crate::backend::TableAccessor;
use crate::entry::{Fields, ItemLocation, KeySelector, TableEntry, WriteMode};
use crate::pipeline::{Pipeline, Stage, StageTimings};
use crate::schema::FieldSchemaValidator;

/// Outcome of a successful [`MixedDbClient::set_db`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub database: String,
    pub timings: StageTimings,
    pub delete_calls: usize,
    pub set_calls: usize,
    pub entries_written: usize,
}

#[derive(Default)]
struct TableBatch<'a> {
    selectors: Vec<KeySelector>,
    replaces: Vec<(ItemLocation, &'a Update)>,
    updates: Vec<(ItemLocation, &'a Update)>,
}

/// Writes request batches to one database through a [`TableAccessor`].
///
/// Paths are read as `TABLE[/key[/field]]` below the database; the database
/// itself is the batch's resolved target.
pub struct MixedDbClient {
    target: String,
    pipeline: Pipeline,
    tables: Arc<dyn TableAccessor>,
    write_lock: Mutex<()>,
}

impl MixedDbClient {
    /// A client defaulting to database `target` (may be empty, in which case
    /// every request must name its database) with the default pipeline.
    pub fn new(target: impl Into<String>, tables: Arc<dyn TableAccessor>) -> Self {
        Self {
            target: target.into(),
            pipeline: Pipeline::new(),
            tables,
            write_lock: Mutex::new(()),
        }
    }

    /// A client using the config's default target, validating against its
    /// table schemas when any are configured.
    pub fn from_config(config: &ClientConfig, tables: Arc<dyn TableAccessor>) -> Result<Self> {
        let mut pipeline = Pipeline::new();
        if !config.tables.is_empty() {
            pipeline = pipeline.with_validator(FieldSchemaValidator::from_config(&config.tables)?);
        }
        Ok(Self::new(config.target.clone(), tables).with_pipeline(pipeline))
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Apply a batch of deletes, replaces and updates.
    ///
    /// Every replace and update item first runs through the pipeline; a
    /// failing item stops the batch before any backend call. Then, holding the
    /// client's write lock, deletes go out as one `delete_table` call per
    /// table, followed by one `set_table` call per table with that table's
    /// entries. The pipeline runs outside the lock, so a slow validation does
    /// not hold up other requests.
    ///
    /// A replace at table or key level overwrites each key's whole field set.
    /// A replace addressing a single field only sets that field and leaves
    /// the key's other fields in place.
    ///
    /// This is best effort, not atomic: when a backend call fails, the table
    /// calls already made stay applied. The returned [`Error::Batch`] names
    /// the failing table and item along with those applied calls.
    pub fn set_db(
        &self,
        deletes: &[Path],
        replaces: &[Update],
        updates: &[Update],
    ) -> Result<BatchReport> {
        let paths = deletes
            .iter()
            .chain(replaces.iter().map(|u| &u.path))
            .chain(updates.iter().map(|u| &u.path));
        let database = resolve_target(&self.target, paths)?;

        let mut report = BatchReport {
            database,
            ..BatchReport::default()
        };
        if deletes.is_empty() && replaces.is_empty() && updates.is_empty() {
            return Ok(report);
        }
        if report.database.is_empty() {
            return Err(Error::InvalidPath {
                path: deletes
                    .first()
                    .or_else(|| replaces.first().map(|u| &u.path))
                    .or_else(|| updates.first().map(|u| &u.path))
                    .cloned()
                    .unwrap_or_default(),
                message: "no target database given".to_string(),
            });
        }

        let batches = partition(deletes, replaces, updates)?;

        let mut pending: Vec<(&String, Vec<TableEntry>)> = Vec::new();
        for (table, batch) in &batches {
            let items = batch
                .replaces
                .iter()
                .map(|item| (item, replace_mode(&item.0)))
                .chain(batch.updates.iter().map(|item| (item, WriteMode::Merge)));

            let mut entries: Vec<TableEntry> = Vec::new();
            for ((location, update), mode) in items {
                match self.pipeline.run(location, update, mode, &mut report.timings) {
                    Ok(converted) => entries.extend(converted),
                    Err(error) => {
                        return Err(batch_error(table, Some(update.path.clone()), &[], error))
                    }
                }
            }
            if !entries.is_empty() {
                pending.push((table, entries));
            }
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut applied = Vec::new();
        let database = report.database.clone();

        for (table, batch) in batches.iter().filter(|(_, b)| !b.selectors.is_empty()) {
            let result = report.timings.time(Stage::Apply, || {
                self.tables.delete_table(&database, table, &batch.selectors)
            });
            if let Err(source) = result {
                return Err(batch_error(
                    table,
                    None,
                    &applied,
                    backend_error(&database, table, source),
                ));
            }
            report.delete_calls += 1;
            applied.push(AppliedCall::Delete {
                table: table.clone(),
            });
        }

        for (table, entries) in &pending {
            let result = report.timings.time(Stage::Apply, || {
                self.tables.set_table(&database, table, entries)
            });
            if let Err(source) = result {
                return Err(batch_error(
                    table,
                    None,
                    &applied,
                    backend_error(&database, table, source),
                ));
            }
            report.set_calls += 1;
            report.entries_written += entries.len();
            applied.push(AppliedCall::Set {
                table: table.to_string(),
            });
        }

        log::debug!(
            "Applied batch to {}: {} delete calls, {} set calls, {} entries ({}).",
            report.database,
            report.delete_calls,
            report.set_calls,
            report.entries_written,
            report.timings
        );
        Ok(report)
    }

    /// Read a table, key or field back from the backend as JSON.
    ///
    /// A table reads as `{key: {field: value}}`, a key as `{field: value}`
    /// and a field as its string value. Absent data is [`Error::NotFound`].
    pub fn get_db(&self, path: &Path) -> Result<Vec<u8>> {
        let database = resolve_target(&self.target, [path])?;
        if database.is_empty() {
            return Err(Error::InvalidPath {
                path: path.clone(),
                message: "no target database given".to_string(),
            });
        }
        let location = ItemLocation::from_path(path)?;

        let rows = self
            .tables
            .get_table(&database, &location.table)
            .map_err(|source| backend_error(&database, &location.table, source))?;
        let not_found = || Error::NotFound { path: path.clone() };

        let value = match (&location.key, &location.field) {
            (None, _) if rows.is_empty() => return Err(not_found()),
            (None, _) => JsonValue::Object(
                rows.iter()
                    .map(|(key, fields)| (key.clone(), fields_to_json(fields)))
                    .collect(),
            ),
            (Some(key), None) => fields_to_json(rows.get(key).ok_or_else(not_found)?),
            (Some(key), Some(field)) => JsonValue::String(
                rows.get(key)
                    .and_then(|fields| fields.get(field))
                    .ok_or_else(not_found)?
                    .clone(),
            ),
        };

        serde_json::to_vec(&value).map_err(|error| Error::InvalidValue {
            path: path.clone(),
            message: error.to_string(),
        })
    }
}

fn partition<'a>(
    deletes: &[Path],
    replaces: &'a [Update],
    updates: &'a [Update],
) -> Result<BTreeMap<String, TableBatch<'a>>> {
    let mut batches: BTreeMap<String, TableBatch<'a>> = BTreeMap::new();

    for path in deletes {
        let location = ItemLocation::from_path(path)?;
        let selector = location.selector();
        batches
            .entry(location.table)
            .or_default()
            .selectors
            .push(selector);
    }
    for update in replaces {
        let location = ItemLocation::from_path(&update.path)?;
        batches
            .entry(location.table.clone())
            .or_default()
            .replaces
            .push((location, update));
    }
    for update in updates {
        let location = ItemLocation::from_path(&update.path)?;
        batches
            .entry(location.table.clone())
            .or_default()
            .updates
            .push((location, update));
    }

    Ok(batches)
}

fn replace_mode(location: &ItemLocation) -> WriteMode {
    match location.field {
        Some(_) => WriteMode::Merge,
        None => WriteMode::Replace,
    }
}

fn fields_to_json(fields: &Fields) -> JsonValue {
    JsonValue::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), JsonValue::String(value.clone())))
            .collect::<Map<_, _>>(),
    )
}

fn backend_error(database: &str, table: &str, source: BoxError) -> Error {
    Error::Backend {
        database: database.to_string(),
        table: table.to_string(),
        source,
    }
}

fn batch_error(table: &str, item: Option<Path>, applied: &[AppliedCall], source: Error) -> Error {
    log::warn!(
        "Batch aborted at table {} after {} applied calls: {}",
        table,
        applied.len(),
        source
    );
    Error::Batch {
        table: table.to_string(),
        item,
        applied: applied.to_vec(),
        source: Box::new(source),
    }
}
