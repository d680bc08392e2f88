//! Handle on the local SQLite file.
//!
//! Opening a [`Database`] always upgrades the schema first, so the helpers
//! in the sibling modules can assume every table exists.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

const FILE_NAME: &str = "inventaire.db";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the file in the per-user data directory, for instance
    /// `~/.local/share/inventaire/inventaire.db` on Linux.
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("fr", "catenaires-versailles", "inventaire")
            .ok_or(StoreError::NoDataDir)?;
        Self::open_in_dir(dirs.data_dir())
    }

    /// Open `inventaire.db` under `dir`. Missing directories are created.
    pub fn open_in_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::open_at(&dir.join(FILE_NAME))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "Opening local store");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::ready(conn)
    }

    /// Private database that disappears with the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::ready(Connection::open_in_memory()?)
    }

    fn ready(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// File backing this handle; `None` in memory.
    pub fn path(&self) -> Option<PathBuf> {
        match self.conn.path() {
            Some(p) if !p.is_empty() => Some(PathBuf::from(p)),
            _ => None,
        }
    }
}
