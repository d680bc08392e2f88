use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No home or data directory could be resolved for this platform.
    #[error("No local data directory available for the inventory file")]
    NoDataDir,

    #[error("Local file access failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema upgrade to v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored session names a user id that is not a UUID.
    #[error("Stored user id is invalid: {0}")]
    Uuid(#[from] uuid::Error),

    /// A stored expiry or update time is not RFC 3339.
    #[error("Stored timestamp is invalid: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
