//! Lock-guarded JSON document mirrored to a checkpoint file.

use std::path as fs_path;
use std::sync::{PoisonError, RwLock};

use serde_json::value::Value as JsonValue;
use sonic_data_core::{ClientConfig, Error, Path};

use crate::checkpoint::Checkpoint;
use crate::json_utils;

/// A JSON document addressed by structural paths.
///
/// Reads proceed concurrently; `add` and `remove` are exclusive and hold the
/// lock until the checkpoint has been atomically replaced, so any later `get`
/// observes a document that is already durable.
///
/// # Example
///
/// ```rust
/// use sonic_data_json_store::JsonClient;
/// use sonic_data_core::path;
///
/// let dir = tempfile::tempdir().unwrap();
/// let location = dir.path().join("cp.json");
/// std::fs::write(&location, "{}").unwrap();
///
/// let client = JsonClient::new(&location).unwrap();
/// client.add(&path!("DASH_QOS/qos_01/bw"), r#""54321""#).unwrap();
/// assert_eq!(client.get(&path!("DASH_QOS/qos_01/bw")).unwrap(), br#""54321""#);
/// ```
pub struct JsonClient {
    checkpoint: Checkpoint,
    document: RwLock<JsonValue>,
}

impl JsonClient {
    /// Load the client from an existing checkpoint.
    ///
    /// Fails with `InvalidCheckpoint` if the file is absent or does not hold
    /// a JSON object.
    pub fn new(location: impl AsRef<fs_path::Path>) -> Result<JsonClient, Error> {
        let (checkpoint, document) = Checkpoint::open(location.as_ref().to_path_buf())?;
        Ok(JsonClient {
            checkpoint,
            document: RwLock::new(document),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<JsonClient, Error> {
        Self::new(&config.checkpoint)
    }

    pub fn location(&self) -> &fs_path::Path {
        self.checkpoint.location()
    }

    /// A copy of the whole document.
    pub fn document(&self) -> JsonValue {
        self.read_document().clone()
    }

    /// The JSON serialization of the value at `path`.
    pub fn get(&self, path: &Path) -> Result<Vec<u8>, Error> {
        let document = self.read_document();
        let value = json_utils::get_path(&document, path)?;
        serde_json::to_vec(value).map_err(|error| Error::InvalidValue {
            path: path.clone(),
            message: error.to_string(),
        })
    }

    /// Parse `value` as JSON and set it at `path`.
    ///
    /// Missing intermediate containers are created (a sequence when the next
    /// component is an index, a map otherwise). A map key is inserted or
    /// overwritten with its siblings kept; a sequence index may overwrite an
    /// existing slot or append at the current length, nothing else.
    pub fn add(&self, path: &Path, value: &str) -> Result<(), Error> {
        let value: JsonValue = serde_json::from_str(value).map_err(|error| Error::InvalidValue {
            path: path.clone(),
            message: error.to_string(),
        })?;
        if path.is_empty() && !value.is_object() {
            return Err(Error::InvalidValue {
                path: path.clone(),
                message: "the document root must be a JSON object".to_string(),
            });
        }

        self.mutate(|document| json_utils::set_path(document, path, value))?;
        log::debug!("Added {} to {}.", path, self.location().display());
        Ok(())
    }

    /// Remove the value at `path`.
    ///
    /// Removing a sequence element closes the gap it leaves.
    pub fn remove(&self, path: &Path) -> Result<(), Error> {
        self.mutate(|document| json_utils::remove_path(document, path).map(|_| ()))?;
        log::debug!("Removed {} from {}.", path, self.location().display());
        Ok(())
    }

    /// Apply `operation` to a copy of the document, persist the copy, then
    /// publish it. A failed operation or a failed write leaves both the
    /// in-memory document and the checkpoint untouched.
    fn mutate<F>(&self, operation: F) -> Result<(), Error>
    where
        F: FnOnce(&mut JsonValue) -> Result<(), Error>,
    {
        let mut document = self
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut updated = document.clone();
        operation(&mut updated)?;
        self.checkpoint.persist(&updated)?;
        *document = updated;

        Ok(())
    }

    fn read_document(&self) -> std::sync::RwLockReadGuard<'_, JsonValue> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod json_client_tests {
    use super::*;
    use serde_json::json;
    use sonic_data_core::path;

    struct TestJsonClient {
        // Keeps the checkpoint directory alive until the client is dropped.
        _dir: tempfile::TempDir,
        client: JsonClient,
    }

    impl TestJsonClient {
        fn new() -> TestJsonClient {
            let dir = tempfile::tempdir().unwrap();
            let location = dir.path().join("cp.json");
            std::fs::write(&location, "{}").unwrap();
            TestJsonClient {
                client: JsonClient::new(&location).unwrap(),
                _dir: dir,
            }
        }
    }

    fn get_json(client: &JsonClient, path: &Path) -> JsonValue {
        serde_json::from_slice(&client.get(path).unwrap()).unwrap()
    }

    #[test]
    fn get_root_of_empty_document() {
        let test = TestJsonClient::new();
        assert_eq!(get_json(&test.client, &path!("")), json!({}));
    }

    #[test]
    fn add_invalid_json_is_rejected() {
        let test = TestJsonClient::new();
        let result = test.client.add(&path!("DASH_QOS"), r#"{"qos_01": "#);
        assert!(matches!(result, Err(Error::InvalidValue { .. })));
        assert_eq!(test.client.document(), json!({}));
    }

    #[test]
    fn add_root_requires_object() {
        let test = TestJsonClient::new();
        assert!(matches!(
            test.client.add(&path!(""), "[]"),
            Err(Error::InvalidValue { .. })
        ));
        test.client.add(&path!(""), r#"{"DASH_QOS": {}}"#).unwrap();
        assert_eq!(test.client.document(), json!({"DASH_QOS": {}}));
    }

    #[test]
    fn failed_add_leaves_document_untouched() {
        let test = TestJsonClient::new();
        test.client
            .add(&path!("DASH_VNET/vnet001/address_spaces"), r#"["10.250.0.0"]"#)
            .unwrap();
        let before = test.client.document();

        // Intermediate "vnet002" would be created before the bad index is hit.
        let result = test
            .client
            .add(&path!("DASH_VNET/vnet002/address_spaces/3"), r#""1.1.1.1""#);
        assert!(result.is_err());
        assert_eq!(test.client.document(), before);

        let reloaded = JsonClient::new(test.client.location()).unwrap();
        assert_eq!(reloaded.document(), before);
    }

    #[test]
    fn remove_root_is_invalid() {
        let test = TestJsonClient::new();
        assert!(matches!(
            test.client.remove(&path!("")),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn mutations_are_durable() {
        let test = TestJsonClient::new();
        test.client
            .add(&path!("DASH_QOS/qos_01"), r#"{"bw": "54321"}"#)
            .unwrap();
        test.client
            .add(&path!("DASH_QOS/qos_02"), r#"{"bw": "10001"}"#)
            .unwrap();
        test.client.remove(&path!("DASH_QOS/qos_01")).unwrap();

        let reloaded = JsonClient::new(test.client.location()).unwrap();
        assert_eq!(
            reloaded.document(),
            json!({"DASH_QOS": {"qos_02": {"bw": "10001"}}})
        );
    }
}
