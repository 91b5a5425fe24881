use std::io::Write;
use std::{fs, io, path};

use serde_json::value::Value as JsonValue;
use sonic_data_core::Error;

/// The on-disk JSON snapshot backing a [`crate::JsonClient`].
pub struct Checkpoint {
    location: path::PathBuf,
}

impl Checkpoint {
    /// Open an existing checkpoint and load its document.
    ///
    /// The file must already exist and hold a JSON object; an empty object is
    /// the minimal valid checkpoint. Nothing is created on failure.
    pub fn open(location: path::PathBuf) -> Result<(Checkpoint, JsonValue), Error> {
        log::debug!("Loading checkpoint {}...", location.display());

        let file = fs::File::open(&location).map_err(|error| Error::InvalidCheckpoint {
            location: location.clone(),
            message: format!("could not be opened: {}", error),
        })?;

        let document: JsonValue = serde_json::from_reader(io::BufReader::new(file)).map_err(
            |error| Error::InvalidCheckpoint {
                location: location.clone(),
                message: format!("is not valid JSON: {}", error),
            },
        )?;

        if !document.is_object() {
            return Err(Error::InvalidCheckpoint {
                location,
                message: "must contain a JSON object".to_string(),
            });
        }

        Ok((Checkpoint { location }, document))
    }

    pub fn location(&self) -> &path::Path {
        &self.location
    }

    /// Atomically replace the checkpoint with `document`.
    ///
    /// The document is written and synced to a temporary file in the same
    /// directory, which is then renamed over the checkpoint. Readers of the
    /// file see either the previous or the new document, never a partial one.
    pub fn persist(&self, document: &JsonValue) -> Result<(), Error> {
        log::debug!("Writing checkpoint {}...", self.location.display());

        let io_error = |source: io::Error| Error::Io {
            location: self.location.clone(),
            source,
        };

        let directory = match self.location.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => path::Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(io_error)?;

        {
            let mut writer = io::BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)
                .map_err(|error| io_error(io::Error::from(error)))?;
            writer.flush().map_err(io_error)?;
        }

        // Keep the checkpoint's mode rather than the temp file's private one.
        if let Ok(metadata) = fs::metadata(&self.location) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(io_error)?;
        }
        temp.as_file().sync_all().map_err(io_error)?;

        temp.persist(&self.location)
            .map_err(|error| io_error(error.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod checkpoint_tests {
    use super::*;
    use serde_json::json;

    fn write_file(location: &path::Path, contents: &[u8]) {
        let mut f = fs::File::create(location).unwrap();
        f.write_all(contents).unwrap();
        f.sync_all().unwrap();
    }

    #[test]
    fn open_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("cp.json");
        write_file(&location, b"{}");

        let (checkpoint, document) = Checkpoint::open(location.clone()).unwrap();
        assert_eq!(document, json!({}));
        assert_eq!(checkpoint.location(), location.as_path());
    }

    #[test]
    fn open_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Checkpoint::open(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::InvalidCheckpoint { .. })));
        assert!(!dir.path().join("absent.json").exists());
    }

    #[test]
    fn open_malformed_fails() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("cp.json");
        write_file(&location, b"{");
        assert!(matches!(
            Checkpoint::open(location),
            Err(Error::InvalidCheckpoint { .. })
        ));
    }

    #[test]
    fn open_non_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("cp.json");
        write_file(&location, b"[1, 2]");
        assert!(matches!(
            Checkpoint::open(location),
            Err(Error::InvalidCheckpoint { .. })
        ));
    }

    #[test]
    fn persist_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("cp.json");
        write_file(&location, b"{}");

        let (checkpoint, _) = Checkpoint::open(location.clone()).unwrap();
        let document = json!({"DASH_QOS": {"qos_01": {"bw": "54321"}}});
        checkpoint.persist(&document).unwrap();

        let (_, reloaded) = Checkpoint::open(location).unwrap();
        assert_eq!(reloaded, document);

        // Only the checkpoint remains; the temporary file was renamed away.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
