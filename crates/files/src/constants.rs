/// Default upper bound for a stored document photo (5 MiB).
pub const MAX_DOCUMENT_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Suffix of the temporary sibling a payload is written to before being renamed into place.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";
