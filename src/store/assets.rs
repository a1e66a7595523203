//! The named asset cache: one captured response per (cache name, URL).

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::Store;

/// A captured HTTP response, exactly what a cache entry stores.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  /// When this representation was captured.
  pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

impl Store {
  /// Store a response under `(cache_name, url)`, replacing any previous
  /// entry. Concurrent writers race last-write-wins.
  pub fn put_response(&self, cache_name: &str, url: &str, response: &CachedResponse) -> Result<()> {
    let headers = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO asset_cache (cache_name, url, status, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
          cache_name,
          url,
          response.status,
          headers,
          response.body,
          response.stored_at.to_rfc3339()
        ],
      )
      .map_err(|e| eyre!("Failed to store cached response: {}", e))?;
    Ok(())
  }

  /// Look up the captured response for `url` in the named cache.
  pub fn match_response(&self, cache_name: &str, url: &str) -> Result<Option<CachedResponse>> {
    let conn = self.conn()?;
    let mut stmt = conn
      .prepare("SELECT status, headers, body, stored_at FROM asset_cache WHERE cache_name = ? AND url = ?")
      .map_err(|e| eyre!("Failed to prepare cache lookup: {}", e))?;
    let row = stmt
      .query_row(params![cache_name, url], |row| {
        Ok((
          row.get::<_, u16>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, Vec<u8>>(2)?,
          row.get::<_, String>(3)?,
        ))
      })
      .optional()
      .map_err(|e| eyre!("Failed to read cached response: {}", e))?;

    match row {
      Some((status, headers, body, stored_at)) => {
        let headers = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to parse stored headers: {}", e))?;
        let stored_at = DateTime::parse_from_rfc3339(&stored_at)
          .map_err(|e| eyre!("Failed to parse stored timestamp: {}", e))?
          .with_timezone(&Utc);
        Ok(Some(CachedResponse {
          status,
          headers,
          body,
          stored_at,
        }))
      }
      None => Ok(None),
    }
  }

  /// Names of every cache that currently holds entries.
  pub fn cache_names(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn
      .prepare("SELECT DISTINCT cache_name FROM asset_cache ORDER BY cache_name")
      .map_err(|e| eyre!("Failed to prepare cache listing: {}", e))?;
    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .filter_map(|r| r.ok())
      .collect();
    Ok(names)
  }

  /// Delete every cache except `keep`; returns the names that were removed.
  pub fn prune_caches(&self, keep: &str) -> Result<Vec<String>> {
    let stale: Vec<String> = self
      .cache_names()?
      .into_iter()
      .filter(|name| name != keep)
      .collect();
    if !stale.is_empty() {
      self
        .conn()?
        .execute("DELETE FROM asset_cache WHERE cache_name != ?", params![keep])
        .map_err(|e| eyre!("Failed to prune caches: {}", e))?;
    }
    Ok(stale)
  }

  /// Number of entries in the named cache.
  pub fn response_count(&self, cache_name: &str) -> Result<u64> {
    self
      .conn()?
      .query_row(
        "SELECT COUNT(*) FROM asset_cache WHERE cache_name = ?",
        params![cache_name],
        |row| row.get::<_, u64>(0),
      )
      .map_err(|e| eyre!("Failed to count cached responses: {}", e))
  }
}
