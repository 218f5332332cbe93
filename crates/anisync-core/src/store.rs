//! Whole-document JSON persistence for the mapping files.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Load a document, creating it with the default value when the file is missing.
///
/// A file that exists but does not parse is an error, never silently replaced.
pub fn load_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("{} does not exist, creating it", path.display());
        let value = T::default();
        save(path, &value)?;
        return Ok(value);
    }

    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the document on disk with `value`
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let encoded = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &encoded)
}

/// Write to a temp file, then rename over the target
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, bytes).map_err(|e| StoreError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_file_is_created_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let value: BTreeMap<String, String> = load_or_default(&path).unwrap();
        assert!(value.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut value = BTreeMap::new();
        value.insert("81797".to_string(), "21".to_string());

        save(&path, &value).unwrap();
        let loaded: BTreeMap<String, String> = load_or_default(&path).unwrap();
        assert_eq!(loaded, value);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_or_default::<BTreeMap<String, String>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert!(err.to_string().contains("broken.json"));
        // The broken file is left for the user to inspect
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
