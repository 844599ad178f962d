//! Utility functions for working with `object_store` paths.

use bytes::Bytes;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt as _};
use station_structs::{PipelineError, PipelineResult};

/// Reads an object, returning `None` when it does not exist.
///
/// # Errors
///
/// Returns an error if the read fails for any reason other than a missing
/// object.
pub async fn read_optional(store: &dyn ObjectStore, path: &str) -> PipelineResult<Option<Bytes>> {
    let object_path = ObjectStorePath::from(path);

    match store.get(&object_path).await {
        Ok(result) => result
            .bytes()
            .await
            .map(Some)
            .map_err(|e| PipelineError::storage(format!("Failed to read bytes of {path}"), e)),
        Err(object_store::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(PipelineError::storage(format!("Failed to read {path}"), e)),
    }
}

/// Returns true if an object exists at `path`.
///
/// # Errors
///
/// Returns an error if the store cannot be queried.
pub async fn object_exists(store: &dyn ObjectStore, path: &str) -> PipelineResult<bool> {
    let object_path = ObjectStorePath::from(path);

    match store.head(&object_path).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(e) => Err(PipelineError::storage(format!("Failed to stat {path}"), e)),
    }
}

/// Writes an object, replacing any previous content.
///
/// The local store writes to a temporary file and renames it into place, so
/// readers never observe a partially written object.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn write_bytes(store: &dyn ObjectStore, path: &str, data: Bytes) -> PipelineResult<()> {
    let object_path = ObjectStorePath::from(path);

    store
        .put(&object_path, data.into())
        .await
        .map(|_| ())
        .map_err(|e| PipelineError::storage(format!("Failed to write {path}"), e))
}
