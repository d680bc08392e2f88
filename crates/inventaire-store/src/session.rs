//! Persistence of the backend session across restarts.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use inventaire_shared::Session;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Replace the stored session.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO auth_session (id, access_token, refresh_token, user_id, expires_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                session.access_token,
                session.refresh_token,
                session.user_id.to_string(),
                session.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Session>> {
        let row: Option<(String, Option<String>, String, Option<String>)> = self
            .conn()
            .query_row(
                "SELECT access_token, refresh_token, user_id, expires_at FROM auth_session WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((access_token, refresh_token, user_id, expires_at)) = row else {
            return Ok(None);
        };

        let user_id = Uuid::parse_str(&user_id)?;
        let expires_at = expires_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()?;

        Ok(Some(Session {
            access_token,
            refresh_token,
            user_id,
            expires_at,
        }))
    }

    pub fn clear_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM auth_session", [])?;
        Ok(())
    }
}
