//! Config-driven schema validation.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::Value as JsonValue;
use sonic_data_core::{Error, Result, TableSchemaConfig};

use crate::convert::LIST_FIELD_SUFFIX;
use crate::entry::{split_records, ItemLocation};
use crate::pipeline::SchemaValidator;

struct TableRules {
    key_pattern: Option<Regex>,
    fields: BTreeSet<String>,
}

/// Validates items against per-table key patterns and field names.
///
/// Tables missing from the schema are rejected outright.
pub struct FieldSchemaValidator {
    tables: BTreeMap<String, TableRules>,
}

impl FieldSchemaValidator {
    pub fn from_config(tables: &BTreeMap<String, TableSchemaConfig>) -> Result<Self> {
        let tables = tables
            .iter()
            .map(|(table, config)| {
                let key_pattern = config
                    .key_pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|error| Error::Config {
                        message: format!("key pattern of table {}: {}", table, error),
                    })?;
                let rules = TableRules {
                    key_pattern,
                    fields: config.fields.iter().cloned().collect(),
                };
                Ok((table.clone(), rules))
            })
            .collect::<Result<_>>()?;

        Ok(Self { tables })
    }
}

impl SchemaValidator for FieldSchemaValidator {
    fn validate(&self, location: &ItemLocation, payload: &[u8]) -> Result<()> {
        let violation = |detail: String| Error::SchemaViolation {
            table: location.table.clone(),
            detail,
        };

        let rules = self
            .tables
            .get(&location.table)
            .ok_or_else(|| violation("table is not defined in the schema".to_string()))?;

        let value: JsonValue = serde_json::from_slice(payload)
            .map_err(|error| violation(format!("payload is not valid JSON: {}", error)))?;
        let records =
            split_records(location, &value).map_err(|error| violation(error.to_string()))?;

        for (key, fields) in &records {
            if let Some(pattern) = &rules.key_pattern {
                if !pattern.is_match(key) {
                    return Err(violation(format!(
                        "key {:?} does not match {}",
                        key,
                        pattern.as_str()
                    )));
                }
            }

            if rules.fields.is_empty() {
                continue;
            }
            if let Some(unknown) = fields
                .keys()
                .find(|name| {
                    let base = name.strip_suffix(LIST_FIELD_SUFFIX).unwrap_or(name.as_str());
                    !rules.fields.contains(base)
                })
            {
                return Err(violation(format!(
                    "field {:?} of key {:?} is not defined",
                    unknown, key
                )));
            }
        }

        Ok(())
    }
}
