//! Registry File Storage
//!
//! This crate stores the document photos attached to patient records.
//!
//! ## Design Principles
//!
//! - Metadata (rows in the `files` table) and bytes (files on disk) are deliberately separated
//! - Bytes are immutable once written: replacing a document writes a new file
//! - Every file lives under a fresh UUID, so storage keys never collide or get reused
//! - Callers hand over already-validated bytes; the allow-list and size bound are re-checked here
//!
//! ## Storage Layout
//!
//! ```text
//! <uploads_dir>/
//! └── 55/
//!     └── 0e/
//!         └── 550e8400e29b41d4a716446655440000.jpg
//! ```
//!
//! The first four hex characters of the UUID shard the tree so that no single directory grows
//! without bound.
//!
//! ## Example Usage
//!
//! ```no_run
//! use registry_files::{DocumentContentType, FileStorage, LocalFileStorage};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), registry_files::FilesError> {
//! let storage = LocalFileStorage::new(Path::new("data/uploads"), 5 * 1024 * 1024)?;
//! let stored = storage
//!     .store(b"...", DocumentContentType::Jpeg, "dni.jpg")
//!     .await?;
//! let bytes = storage.retrieve(&stored.storage_path).await?;
//! storage.delete(&stored.storage_path).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod content_type;
mod files;

pub use constants::{MAX_DOCUMENT_SIZE_BYTES, TEMP_FILE_SUFFIX};
pub use content_type::DocumentContentType;
pub use files::{FileStorage, LocalFileStorage, StoredFile};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Payload larger than the configured maximum
    #[error("File of {size} bytes exceeds the maximum of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// No bytes stored under the given key
    #[error("File not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
