//! Sync coordinator state. The key names and value encodings are the
//! app's long-standing external contract and must not change.

use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::Store;

pub const KEY_AUTO_SYNC: &str = "autoSyncEnabled";
pub const KEY_LAST_SYNC: &str = "lastSync";

impl Store {
  /// Completion time of the last successful sync, if any.
  pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
    match self.state_value(KEY_LAST_SYNC)? {
      Some(raw) => {
        let parsed = DateTime::parse_from_rfc3339(&raw)
          .map_err(|e| eyre!("Failed to parse stored sync time '{}': {}", raw, e))?;
        Ok(Some(parsed.with_timezone(&Utc)))
      }
      None => Ok(None),
    }
  }

  pub fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
    self.set_state_value(KEY_LAST_SYNC, &at.to_rfc3339_opts(SecondsFormat::Millis, true))
  }

  /// Whether background sync should run; defaults to off.
  pub fn auto_sync_enabled(&self) -> Result<bool> {
    Ok(self.state_value(KEY_AUTO_SYNC)?.as_deref() == Some("true"))
  }

  pub fn set_auto_sync_enabled(&self, enabled: bool) -> Result<()> {
    self.set_state_value(KEY_AUTO_SYNC, if enabled { "true" } else { "false" })
  }

  pub(crate) fn state_value(&self, key: &str) -> Result<Option<String>> {
    self
      .conn()?
      .query_row(
        "SELECT value FROM sync_state WHERE key = ?",
        params![key],
        |row| row.get::<_, String>(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read sync state '{}': {}", key, e))
  }

  fn set_state_value(&self, key: &str, value: &str) -> Result<()> {
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write sync state '{}': {}", key, e))?;
    Ok(())
  }
}
