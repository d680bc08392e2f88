//! Schema upgrades, tracked with the `user_version` pragma.

pub mod v001_initial;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

type Upgrade = fn(&Connection) -> std::result::Result<(), rusqlite::Error>;

/// Upgrades in order; entry `n` moves the schema from `n` to `n + 1`.
const UPGRADES: &[(&str, Upgrade)] = &[("v001_initial", v001_initial::up)];

pub fn schema_version() -> u32 {
    UPGRADES.len() as u32
}

/// Bring the local file up to [`schema_version`].
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    debug!(found, wanted = schema_version(), "Local schema version");

    for (index, (name, upgrade)) in UPGRADES.iter().enumerate().skip(found as usize) {
        let version = index as u32 + 1;
        info!(version, migration = *name, "Upgrading local schema");
        upgrade(conn).map_err(|e| StoreError::Migration {
            version,
            reason: e.to_string(),
        })?;
        conn.pragma_update(None, "user_version", version)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_run_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES ('k', 'v', 'now')",
            [],
        )
        .unwrap();
        run_migrations(&conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, schema_version());
        let kept: i64 = conn
            .query_row("SELECT COUNT(*) FROM preferences", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kept, 1);
    }
}
