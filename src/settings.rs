//! Local key-value preferences
//!
//! Lives in the same database file as everything else, so a preference is
//! available on the next start without any network round trip.

use redb::{Database, ReadableDatabase, ReadableTable};

use crate::database::TABLE_SETTINGS;
use crate::error::AppResult;

pub const DARK_MODE_KEY: &str = "dark_mode";

/// Reads a raw preference value
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `key` - Preference name, e.g. `DARK_MODE_KEY`
///
/// # Returns
///
/// * `Ok(Some(value))` - the stored value
/// * `Ok(None)` - the preference was never set
pub fn get(db: &Database, key: &str) -> AppResult<Option<String>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_SETTINGS)?;
    let value = table.get(key)?.map(|guard| guard.value().to_string());
    Ok(value)
}

/// Stores a raw preference value, replacing any previous one
pub fn set(db: &Database, key: &str, value: &str) -> AppResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SETTINGS)?;
        table.insert(key, value)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Stored dark-mode preference; `false` when unset or unreadable
pub fn dark_mode(db: &Database) -> AppResult<bool> {
    let value = get(db, DARK_MODE_KEY)?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(false))
}

/// Persists the dark-mode preference for the next start
pub fn set_dark_mode(db: &Database, enabled: bool) -> AppResult<()> {
    set(db, DARK_MODE_KEY, if enabled { "true" } else { "false" })?;
    tracing::debug!(enabled, "dark mode preference saved");
    Ok(())
}
