//! Persisted client preferences.
//!
//! The only preference today is the remembered CP number: written when a
//! login succeeds with "remember me" checked, cleared when it succeeds
//! without, and read once at startup to pre-fill the login form.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

const KEY_REMEMBERED_CP: &str = "remembered_cp";

impl Database {
    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Returns `true` if a value was removed.
    pub fn delete_preference(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    pub fn remembered_cp(&self) -> Result<Option<String>> {
        Ok(self
            .get_preference(KEY_REMEMBERED_CP)?
            .filter(|cp| !cp.is_empty()))
    }

    pub fn set_remembered_cp(&self, cp: &str) -> Result<()> {
        self.set_preference(KEY_REMEMBERED_CP, cp)
    }

    pub fn clear_remembered_cp(&self) -> Result<()> {
        self.delete_preference(KEY_REMEMBERED_CP)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembered_cp_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.remembered_cp().unwrap(), None);

        db.set_remembered_cp("7408443F").unwrap();
        assert_eq!(db.remembered_cp().unwrap().as_deref(), Some("7408443F"));

        db.set_remembered_cp("1111111A").unwrap();
        assert_eq!(db.remembered_cp().unwrap().as_deref(), Some("1111111A"));

        db.clear_remembered_cp().unwrap();
        assert_eq!(db.remembered_cp().unwrap(), None);
    }

    #[test]
    fn remembered_cp_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.set_remembered_cp("7408443F").unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.remembered_cp().unwrap().as_deref(), Some("7408443F"));
    }

    #[test]
    fn delete_missing_preference() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.delete_preference("nope").unwrap());
    }
}
