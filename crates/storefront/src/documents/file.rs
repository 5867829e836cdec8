//! File-backed document store.
//!
//! Layout: `{root}/{collection}/{key}.json`. Keys are percent-encoded so any
//! user id maps to a single safe file name. Each write goes to its own
//! uniquely named temporary file in the target directory, which is then
//! renamed over the target, so readers never see a partial document even
//! when several processes share the directory.

use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::instrument;

use atelier_core::UserId;

use super::{Collection, Document, DocumentError, DocumentStore, merge_into};

/// Document store that keeps one JSON file per document.
#[derive(Debug)]
pub struct FileDocumentStore {
    root: PathBuf,
    // Serializes read-merge-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: Collection, key: &UserId) -> PathBuf {
        self.root
            .join(collection.as_str())
            .join(format!("{}.json", urlencoding::encode(key.as_str())))
    }

    async fn read(
        &self,
        collection: Collection,
        key: &UserId,
    ) -> Result<Option<Document>, DocumentError> {
        let path = self.path_for(collection, key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| DocumentError::Malformed {
                collection,
                key: key.to_string(),
                source,
            })?;
        let Value::Object(document) = value else {
            return Err(DocumentError::Rejected(format!(
                "{} is not a JSON object",
                path.display()
            )));
        };
        Ok(Some(document))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    #[instrument(skip(self), fields(collection = %collection, key = %key))]
    async fn get(
        &self,
        collection: Collection,
        key: &UserId,
    ) -> Result<Option<Document>, DocumentError> {
        self.read(collection, key).await
    }

    #[instrument(skip(self, document), fields(collection = %collection, key = %key))]
    async fn set_merge(
        &self,
        collection: Collection,
        key: &UserId,
        document: Document,
    ) -> Result<(), DocumentError> {
        let _guard = self.write_lock.lock().await;

        let mut stored = self.read(collection, key).await?.unwrap_or_default();
        merge_into(&mut stored, document);

        let path = self.path_for(collection, key);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        let bytes =
            serde_json::to_vec_pretty(&Value::Object(stored)).map_err(DocumentError::Encode)?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || replace_file(&dir, &target, &bytes))
            .await
            .map_err(std::io::Error::other)??;

        tracing::debug!(path = %path.display(), "document written");
        Ok(())
    }
}

/// Write `bytes` to a fresh temporary file in `dir` and rename it to `target`.
fn replace_file(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
