//! JSON payload to table entry conversion.

use serde_json::{Map, Value as JsonValue};
use sonic_data_core::{Error, Path, Result};

use crate::entry::{split_records, Fields, ItemLocation, TableEntry, WriteMode};
use crate::pipeline::Converter;

/// Suffix marking a field whose value is a comma-joined list.
pub const LIST_FIELD_SUFFIX: char = '@';

/// Field set written for a key that carries no fields.
pub const EMPTY_FIELD: &str = "NULL";

/// Converts JSON payloads into string field maps.
///
/// Strings are taken as is; numbers and booleans are rendered. A list of
/// scalars becomes one comma-joined value under `<field>@`. Nulls and nested
/// objects have no field representation and are rejected. A key written with
/// no fields gets the `NULL: NULL` placeholder so that it still exists.
pub struct FieldMapConverter;

impl Converter for FieldMapConverter {
    fn convert(
        &self,
        location: &ItemLocation,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<Vec<TableEntry>> {
        let value: JsonValue =
            serde_json::from_slice(payload).map_err(|error| Error::InvalidValue {
                path: location.to_path(),
                message: error.to_string(),
            })?;

        split_records(location, &value)?
            .into_iter()
            .map(|(key, fields)| {
                Ok(TableEntry {
                    table: location.table.clone(),
                    fields: convert_fields(location, &key, fields)?,
                    key,
                    mode,
                })
            })
            .collect()
    }
}

fn convert_fields(
    location: &ItemLocation,
    key: &str,
    fields: Map<String, JsonValue>,
) -> Result<Fields> {
    let mut converted = Fields::new();
    for (name, value) in fields {
        let (name, value) = match value {
            JsonValue::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| scalar_to_string(location, key, &name, item))
                    .collect::<Result<Vec<_>>>()?;
                let name = if name.ends_with(LIST_FIELD_SUFFIX) {
                    name
                } else {
                    format!("{}{}", name, LIST_FIELD_SUFFIX)
                };
                (name, items.join(","))
            }
            other => {
                let value = scalar_to_string(location, key, &name, &other)?;
                (name, value)
            }
        };
        converted.insert(name, value);
    }

    if converted.is_empty() {
        converted.insert(EMPTY_FIELD.to_string(), EMPTY_FIELD.to_string());
    }
    Ok(converted)
}

fn scalar_to_string(
    location: &ItemLocation,
    key: &str,
    field: &str,
    value: &JsonValue,
) -> Result<String> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::InvalidValue {
            path: Path {
                origin: None,
                target: None,
                components: vec![location.table.clone(), key.to_string(), field.to_string()],
            },
            message: "field values must be strings, numbers, booleans or lists of those"
                .to_string(),
        }),
    }
}
