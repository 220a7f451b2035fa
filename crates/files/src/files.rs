//! Local filesystem storage for document photos
//!
//! This module provides [`LocalFileStorage`], the production implementation of the
//! [`FileStorage`] trait.
//!
//! # Storage Keys
//!
//! Every stored payload gets a fresh v4 UUID. The storage key (the `storage_path` persisted in the
//! `files` table) is relative to the uploads directory:
//!
//! ```text
//! <u[0..2]>/<u[2..4]>/<u><ext>
//! ```
//!
//! Keys are re-validated on every read and delete, so a corrupted or hostile row cannot point
//! outside the uploads directory.
//!
//! # Write Protocol
//!
//! Bytes are written to `<key>.tmp`, flushed, and renamed onto the final key. A crash mid-write
//! leaves at most a `.tmp` sibling, never a truncated file under a live key.
//!
//! # Shard Directories
//!
//! `delete` removes only the file. Emptied `<aa>/<bb>/` directories stay in place: pruning them
//! would race a concurrent `store` into the same shard between its `create_dir_all` and the
//! temporary file creation. There are at most 65,536 of them.

use crate::{DocumentContentType, FilesError, TEMP_FILE_SUFFIX};
use async_trait::async_trait;
use registry_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Reference to a payload persisted by a [`FileStorage`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Name of the file on disk (`<uuid><ext>`)
    pub server_filename: String,

    /// Basename of the file as uploaded by the client
    pub original_filename: NonEmptyText,

    /// Key relative to the storage root; unique per stored payload
    pub storage_path: String,

    pub content_type: DocumentContentType,

    pub size_bytes: u64,

    /// Hexadecimal SHA-256 digest of the payload
    pub sha256: String,
}

/// Persists document bytes and hands back a stable reference.
#[async_trait]
pub trait FileStorage: Send + Sync + std::fmt::Debug {
    /// Writes `bytes` under a fresh unique key.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the payload exceeds the configured bound or any I/O step fails.
    async fn store(
        &self,
        bytes: &[u8],
        content_type: DocumentContentType,
        original_filename: &str,
    ) -> Result<StoredFile, FilesError>;

    /// Reads back exactly the bytes stored under `storage_path`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::NotFound` when nothing is stored under the key.
    async fn retrieve(&self, storage_path: &str) -> Result<Vec<u8>, FilesError>;

    /// Removes the payload; succeeds silently if it is already gone.
    async fn delete(&self, storage_path: &str) -> Result<(), FilesError>;
}

/// [`FileStorage`] backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    /// Canonicalised uploads directory
    root_directory: PathBuf,

    max_size_bytes: u64,
}

impl LocalFileStorage {
    /// Creates the storage, creating `root_directory` (and parents) if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the path exists but is not a directory or
    /// cannot be created or canonicalised.
    pub fn new(root_directory: &Path, max_size_bytes: u64) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        std::fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            max_size_bytes,
        })
    }

    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Absolute path for a storage key, rejecting anything that could escape the root.
    pub fn resolve(&self, storage_path: &str) -> Result<PathBuf, FilesError> {
        let relative = Path::new(storage_path);
        if storage_path.is_empty() {
            return Err(FilesError::InvalidPath("storage path is empty".into()));
        }
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !only_normal {
            return Err(FilesError::InvalidPath(format!(
                "storage path must be relative without '..': {}",
                storage_path
            )));
        }
        Ok(self.root_directory.join(relative))
    }

    /// Sharded key for a new payload.
    fn compute_storage_path(id: &Uuid, extension: &str) -> (String, String) {
        let hex = id.simple().to_string();
        let server_filename = format!("{}.{}", hex, extension);
        let storage_path = format!("{}/{}/{}", &hex[0..2], &hex[2..4], server_filename);
        (server_filename, storage_path)
    }

    /// Keeps the uploaded extension when it agrees with the content type (`.jpeg` stays
    /// `.jpeg`), otherwise falls back to the canonical one.
    fn extension_for(original_filename: &str, content_type: DocumentContentType) -> String {
        Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| DocumentContentType::from_extension(e) == Some(content_type))
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| content_type.extension().to_string())
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(
        &self,
        bytes: &[u8],
        content_type: DocumentContentType,
        original_filename: &str,
    ) -> Result<StoredFile, FilesError> {
        let size_bytes = bytes.len() as u64;
        if size_bytes > self.max_size_bytes {
            return Err(FilesError::TooLarge {
                size: size_bytes,
                max: self.max_size_bytes,
            });
        }

        // Best-effort sniffing; the declared type stays authoritative.
        if let Some(kind) = infer::get(bytes) {
            if kind.mime_type() != content_type.mime() {
                tracing::warn!(
                    declared = %content_type,
                    detected = kind.mime_type(),
                    "document content does not match declared type"
                );
            }
        }

        let id = Uuid::new_v4();
        let extension = Self::extension_for(original_filename, content_type);
        let (server_filename, storage_path) = Self::compute_storage_path(&id, &extension);
        let full_path = self.resolve(&storage_path)?;

        let basename = Path::new(original_filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let original_filename = NonEmptyText::new(basename)
            .or_else(|_| NonEmptyText::new(&server_filename))
            .map_err(|_| FilesError::InvalidPath("server filename is empty".into()))?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let temp_path = PathBuf::from(format!("{}{}", full_path.display(), TEMP_FILE_SUFFIX));
        let write_result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &full_path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", full_path.display(), e),
            )));
        }

        let sha256 = hex::encode(Sha256::digest(bytes));

        tracing::debug!(%storage_path, size_bytes, "stored document");

        Ok(StoredFile {
            server_filename,
            original_filename,
            storage_path,
            content_type,
            size_bytes,
            sha256,
        })
    }

    async fn retrieve(&self, storage_path: &str) -> Result<Vec<u8>, FilesError> {
        let full_path = self.resolve(storage_path)?;
        match fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FilesError::NotFound(storage_path.to_string()))
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", full_path.display(), e),
            ))),
        }
    }

    async fn delete(&self, storage_path: &str) -> Result<(), FilesError> {
        let full_path = self.resolve(storage_path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
