//! Backend-facing write units and the table/key/field view of a path.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};
use sonic_data_core::{Error, Path, Result};

/// Field name to value mapping of one table key.
pub type Fields = BTreeMap<String, String>;

/// How a [`TableEntry`] combines with what the backend already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite the key's entire field set.
    Replace,
    /// Merge the supplied fields into the key's existing field set.
    Merge,
}

/// A converted, backend-ready write for one key of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub table: String,
    pub key: String,
    pub fields: Fields,
    pub mode: WriteMode,
}

/// What a delete path removes from its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// Every key of the table.
    Table,
    Key(String),
    Field { key: String, field: String },
}

/// A path within a database, read as `TABLE[/key[/field]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocation {
    pub table: String,
    pub key: Option<String>,
    pub field: Option<String>,
}

impl ItemLocation {
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut components = path.iter().cloned();
        let location = match path.len() {
            1..=3 => ItemLocation {
                table: components.next().unwrap_or_default(),
                key: components.next(),
                field: components.next(),
            },
            0 => {
                return Err(Error::InvalidPath {
                    path: path.clone(),
                    message: "a table name is required".to_string(),
                })
            }
            _ => {
                return Err(Error::InvalidPath {
                    path: path.clone(),
                    message: "expected at most table, key and field components".to_string(),
                })
            }
        };
        Ok(location)
    }

    pub fn selector(&self) -> KeySelector {
        match (&self.key, &self.field) {
            (None, _) => KeySelector::Table,
            (Some(key), None) => KeySelector::Key(key.clone()),
            (Some(key), Some(field)) => KeySelector::Field {
                key: key.clone(),
                field: field.clone(),
            },
        }
    }

    pub fn to_path(&self) -> Path {
        Path {
            origin: None,
            target: None,
            components: std::iter::once(&self.table)
                .chain(self.key.iter())
                .chain(self.field.iter())
                .cloned()
                .collect(),
        }
    }
}

/// Split a decoded payload into `(key, fields)` records according to how
/// deep `location` points:
///
/// - table level: `{"key": {"field": value, ...}, ...}`
/// - key level: `{"field": value, ...}`
/// - field level: any value, becoming the single field of the key
pub fn split_records(
    location: &ItemLocation,
    payload: &JsonValue,
) -> Result<Vec<(String, Map<String, JsonValue>)>> {
    let not_an_object = |path: Path| Error::InvalidValue {
        path,
        message: "expected a JSON object".to_string(),
    };

    match (&location.key, &location.field) {
        (None, _) => {
            let keys = payload
                .as_object()
                .ok_or_else(|| not_an_object(location.to_path()))?;
            keys.iter()
                .map(|(key, fields)| {
                    let fields = fields.as_object().ok_or_else(|| {
                        let mut path = location.to_path();
                        path.components.push(key.clone());
                        not_an_object(path)
                    })?;
                    Ok((key.clone(), fields.clone()))
                })
                .collect()
        }
        (Some(key), None) => {
            let fields = payload
                .as_object()
                .ok_or_else(|| not_an_object(location.to_path()))?;
            Ok(vec![(key.clone(), fields.clone())])
        }
        (Some(key), Some(field)) => {
            let mut fields = Map::new();
            fields.insert(field.clone(), payload.clone());
            Ok(vec![(key.clone(), fields)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sonic_data_core::path;

    #[test]
    fn location_from_path() {
        let location = ItemLocation::from_path(&path!("DASH_QOS/qos_01/bw")).unwrap();
        assert_eq!(location.table, "DASH_QOS");
        assert_eq!(location.key.as_deref(), Some("qos_01"));
        assert_eq!(location.field.as_deref(), Some("bw"));
        assert_eq!(location.to_path(), path!("DASH_QOS/qos_01/bw"));
    }

    #[test]
    fn location_depth_limits() {
        assert!(matches!(
            ItemLocation::from_path(&path!("")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            ItemLocation::from_path(&path!("a/b/c/d")),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn selectors() {
        let selector = |p: &str| ItemLocation::from_path(&Path::parse(p).unwrap()).unwrap().selector();
        assert_eq!(selector("DASH_QOS"), KeySelector::Table);
        assert_eq!(selector("DASH_QOS/q"), KeySelector::Key("q".to_string()));
        assert_eq!(
            selector("DASH_QOS/q/bw"),
            KeySelector::Field {
                key: "q".to_string(),
                field: "bw".to_string()
            }
        );
    }

    #[test]
    fn split_table_level() {
        let location = ItemLocation::from_path(&path!("DASH_QOS")).unwrap();
        let records = split_records(
            &location,
            &json!({"qos_01": {"bw": "1"}, "qos_02": {"bw": "2"}}),
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "qos_01");
        assert_eq!(records[1].1["bw"], json!("2"));

        assert!(matches!(
            split_records(&location, &json!({"qos_01": "flat"})),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn split_field_level() {
        let location = ItemLocation::from_path(&path!("DASH_QOS/qos_01/bw")).unwrap();
        let records = split_records(&location, &json!("54321")).unwrap();
        assert_eq!(records, vec![("qos_01".to_string(), {
            let mut fields = Map::new();
            fields.insert("bw".to_string(), json!("54321"));
            fields
        })]);
    }
}
