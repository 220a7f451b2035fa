//! Constants used throughout the registry core crate.

/// Default SQLite database when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/registry.db";

/// Default storage root for uploaded documents.
pub const DEFAULT_UPLOADS_DIR: &str = "data/uploads";

/// Default connection pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before giving up.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Page number used when the client does not supply one.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the client does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Subject of the email sent after a patient is registered.
pub const CONFIRMATION_EMAIL_SUBJECT: &str = "Patient registration confirmation";
