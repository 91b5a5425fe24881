//! The backend table accessor boundary and an in-memory implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use sonic_data_core::BoxError;

use crate::entry::{Fields, KeySelector, TableEntry, WriteMode};

/// Rows of one table, by key.
pub type Rows = BTreeMap<String, Fields>;

/// Table-scoped access to a named database connection.
///
/// Each call is expected to be transactional at table scope; the accessor,
/// not its caller, serializes concurrent writes to the same table. Errors are
/// reported to callers unchanged.
pub trait TableAccessor: Send + Sync {
    fn delete_table(
        &self,
        database: &str,
        table: &str,
        selectors: &[KeySelector],
    ) -> Result<(), BoxError>;

    fn set_table(&self, database: &str, table: &str, entries: &[TableEntry])
        -> Result<(), BoxError>;

    fn get_table(&self, database: &str, table: &str) -> Result<Rows, BoxError>;
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InMemoryTablesError {
    #[error("unknown database {database}")]
    UnknownDatabase { database: String },
    #[error("entry for key {key} belongs to table {entry_table}, not {table}")]
    TableMismatch {
        table: String,
        key: String,
        entry_table: String,
    },
}

/// Tables held in process memory, one map per database.
///
/// Honors [`WriteMode`]: a replace swaps the key's field set, a merge extends
/// it. Keys left without fields by a field delete are dropped, as are tables
/// left without keys.
#[derive(Default)]
pub struct InMemoryTables {
    databases: RwLock<BTreeMap<String, BTreeMap<String, Rows>>>,
    known: Option<BTreeSet<String>>,
}

impl InMemoryTables {
    /// Tables accepting any database name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables rejecting databases other than `databases`.
    pub fn with_databases<I, S>(databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            databases: RwLock::default(),
            known: Some(databases.into_iter().map(Into::into).collect()),
        }
    }

    fn check_database(&self, database: &str) -> Result<(), InMemoryTablesError> {
        match &self.known {
            Some(known) if !known.contains(database) => Err(InMemoryTablesError::UnknownDatabase {
                database: database.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl TableAccessor for InMemoryTables {
    fn delete_table(
        &self,
        database: &str,
        table: &str,
        selectors: &[KeySelector],
    ) -> Result<(), BoxError> {
        self.check_database(database)?;
        let mut databases = self.databases.write().unwrap_or_else(PoisonError::into_inner);
        let Some(tables) = databases.get_mut(database) else {
            return Ok(());
        };
        let Some(rows) = tables.get_mut(table) else {
            return Ok(());
        };

        for selector in selectors {
            match selector {
                KeySelector::Table => rows.clear(),
                KeySelector::Key(key) => {
                    rows.remove(key);
                }
                KeySelector::Field { key, field } => {
                    if let Some(fields) = rows.get_mut(key) {
                        fields.remove(field);
                        if fields.is_empty() {
                            rows.remove(key);
                        }
                    }
                }
            }
        }

        if rows.is_empty() {
            tables.remove(table);
        }
        Ok(())
    }

    fn set_table(
        &self,
        database: &str,
        table: &str,
        entries: &[TableEntry],
    ) -> Result<(), BoxError> {
        self.check_database(database)?;
        if let Some(stray) = entries.iter().find(|entry| entry.table != table) {
            return Err(Box::new(InMemoryTablesError::TableMismatch {
                table: table.to_string(),
                key: stray.key.clone(),
                entry_table: stray.table.clone(),
            }));
        }

        let mut databases = self.databases.write().unwrap_or_else(PoisonError::into_inner);
        let rows = databases
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();

        for entry in entries {
            match entry.mode {
                WriteMode::Replace => {
                    rows.insert(entry.key.clone(), entry.fields.clone());
                }
                WriteMode::Merge => {
                    rows.entry(entry.key.clone())
                        .or_default()
                        .extend(entry.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        Ok(())
    }

    fn get_table(&self, database: &str, table: &str) -> Result<Rows, BoxError> {
        self.check_database(database)?;
        let databases = self.databases.read().unwrap_or_else(PoisonError::into_inner);
        Ok(databases
            .get(database)
            .and_then(|tables| tables.get(table))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;

    fn entry(key: &str, fields: Fields, mode: WriteMode) -> TableEntry {
        TableEntry {
            table: "DASH_QOS".to_string(),
            key: key.to_string(),
            fields,
            mode,
        }
    }

    #[test]
    fn replace_overwrites_and_merge_extends() {
        let tables = InMemoryTables::new();
        tables
            .set_table(
                "APPL_DB",
                "DASH_QOS",
                &[entry(
                    "qos_01",
                    btree! {
                        "bw".to_string() => "1".to_string(),
                        "cps".to_string() => "2".to_string(),
                    },
                    WriteMode::Replace,
                )],
            )
            .unwrap();

        tables
            .set_table(
                "APPL_DB",
                "DASH_QOS",
                &[entry(
                    "qos_01",
                    btree! { "bw".to_string() => "10".to_string() },
                    WriteMode::Merge,
                )],
            )
            .unwrap();
        assert_eq!(
            tables.get_table("APPL_DB", "DASH_QOS").unwrap()["qos_01"],
            btree! {
                "bw".to_string() => "10".to_string(),
                "cps".to_string() => "2".to_string(),
            }
        );

        tables
            .set_table(
                "APPL_DB",
                "DASH_QOS",
                &[entry(
                    "qos_01",
                    btree! { "flows".to_string() => "3".to_string() },
                    WriteMode::Replace,
                )],
            )
            .unwrap();
        assert_eq!(
            tables.get_table("APPL_DB", "DASH_QOS").unwrap()["qos_01"],
            btree! { "flows".to_string() => "3".to_string() }
        );
    }

    #[test]
    fn deletes_by_selector() {
        let tables = InMemoryTables::new();
        tables
            .set_table(
                "APPL_DB",
                "DASH_QOS",
                &[
                    entry(
                        "qos_01",
                        btree! {
                            "bw".to_string() => "1".to_string(),
                            "cps".to_string() => "2".to_string(),
                        },
                        WriteMode::Replace,
                    ),
                    entry(
                        "qos_02",
                        btree! { "bw".to_string() => "1".to_string() },
                        WriteMode::Replace,
                    ),
                ],
            )
            .unwrap();

        tables
            .delete_table(
                "APPL_DB",
                "DASH_QOS",
                &[
                    KeySelector::Field {
                        key: "qos_01".to_string(),
                        field: "cps".to_string(),
                    },
                    KeySelector::Key("qos_02".to_string()),
                ],
            )
            .unwrap();
        let rows = tables.get_table("APPL_DB", "DASH_QOS").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["qos_01"], btree! { "bw".to_string() => "1".to_string() });

        tables
            .delete_table("APPL_DB", "DASH_QOS", &[KeySelector::Table])
            .unwrap();
        assert!(tables.get_table("APPL_DB", "DASH_QOS").unwrap().is_empty());
    }

    #[test]
    fn deleting_absent_rows_is_a_no_op() {
        let tables = InMemoryTables::new();
        tables
            .delete_table("APPL_DB", "DASH_QOS", &[KeySelector::Key("x".to_string())])
            .unwrap();
    }

    #[test]
    fn unknown_database_rejected() {
        let tables = InMemoryTables::with_databases(["APPL_DB"]);
        let error = tables.get_table("STATE_DB", "DASH_QOS").unwrap_err();
        assert_eq!(
            error.downcast_ref::<InMemoryTablesError>(),
            Some(&InMemoryTablesError::UnknownDatabase {
                database: "STATE_DB".to_string()
            })
        );
    }

    #[test]
    fn entries_must_match_table() {
        let tables = InMemoryTables::new();
        let error = tables
            .set_table(
                "APPL_DB",
                "DASH_VNET",
                &[entry("qos_01", Fields::new(), WriteMode::Merge)],
            )
            .unwrap_err();
        assert!(error.downcast_ref::<InMemoryTablesError>().is_some());
    }
}
