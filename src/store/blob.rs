//! Blob storage for uploaded files such as receipt images.

use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::Error;

/// An asynchronous store for binary objects addressed by slash-separated paths,
/// e.g. "receipts/{user_id}/{file_name}".
pub trait BlobStore: Clone + Send + Sync + 'static {
    /// Store `bytes` at `path`, replacing any existing object, and return the
    /// URL the object can be fetched from.
    fn upload(&self, path: &str, bytes: Vec<u8>)
    -> impl Future<Output = Result<String, Error>> + Send;

    /// Read the object stored at `path`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no object at `path`.
    fn read(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;

    /// Delete every object whose path starts with the directory `prefix`.
    /// Deleting a prefix with no objects is not an error.
    fn delete_prefix(&self, prefix: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A [BlobStore] that writes objects to a directory on the local filesystem.
///
/// Objects are served by the app itself, so the URL of an object is its path
/// relative to the site root.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `root`. The directory is created on the first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a blob path to a file path under the root directory.
    ///
    /// Rejects empty segments and `.`/`..` so a path can never escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, Error> {
        let mut resolved = self.root.clone();

        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(Error::InvalidBlobPath(path.to_owned()));
            }

            resolved.push(segment);
        }

        Ok(resolved)
    }
}

impl BlobStore for FileBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, Error> {
        let file_path = self.resolve(path)?;

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| blob_error("create directory", parent, error))?;
        }

        tokio::fs::write(&file_path, bytes)
            .await
            .map_err(|error| blob_error("write", &file_path, error))?;

        Ok(format!("/{path}"))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, Error> {
        let file_path = self.resolve(path)?;

        match tokio::fs::read(&file_path).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == ErrorKind::NotFound => Err(Error::NotFound),
            Err(error) => Err(blob_error("read", &file_path, error)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), Error> {
        let directory = self.resolve(prefix)?;

        match tokio::fs::remove_dir_all(&directory).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(blob_error("delete", &directory, error)),
        }
    }
}

fn blob_error(action: &str, path: &Path, error: std::io::Error) -> Error {
    tracing::error!("could not {action} {}: {error}", path.display());
    Error::BlobStorageError(error.to_string())
}
