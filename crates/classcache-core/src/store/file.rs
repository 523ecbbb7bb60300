use std::path::PathBuf;

use tracing::debug;

use super::{LocalStore, StoreError, StoreResult};

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> StoreResult<Self> {
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, contents: &str) -> StoreResult<()> {
        let path = self.key_path(key)?;
        // Write to a sibling temp file and rename so a crash never leaves a half-written table
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::write(&tmp, contents).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        debug!(key = key, bytes = contents.len(), "Persisted store key");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
