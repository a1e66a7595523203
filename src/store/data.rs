//! JSON documents: one per app domain, plus the prayer schedule.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use super::Store;
use crate::domain::{FinanceData, Syncable};
use crate::prayer::PrayerSchedule;

const DOC_FINANCES: &str = "finances";
const DOC_PRAYER_TIMES: &str = "prayer_times";

impl Store {
  /// Load a document by name; `None` when it has never been written.
  pub fn load_document<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
    let raw = self
      .conn()?
      .query_row(
        "SELECT data FROM documents WHERE name = ?",
        params![name],
        |row| row.get::<_, Vec<u8>>(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read document '{}': {}", name, e))?;
    match raw {
      Some(bytes) => {
        let value = serde_json::from_slice(&bytes)
          .map_err(|e| eyre!("Failed to parse document '{}': {}", name, e))?;
        Ok(Some(value))
      }
      None => Ok(None),
    }
  }

  /// Write a document wholesale.
  pub fn save_document<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
      .map_err(|e| eyre!("Failed to serialize document '{}': {}", name, e))?;
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO documents (name, data, updated_at) VALUES (?, ?, datetime('now'))",
        params![name, bytes],
      )
      .map_err(|e| eyre!("Failed to write document '{}': {}", name, e))?;
    Ok(())
  }

  /// All rows of a syncable domain; an unwritten document is empty.
  pub fn rows<T: Syncable>(&self) -> Result<Vec<T>> {
    Ok(self.load_document(T::document())?.unwrap_or_default())
  }

  pub fn set_rows<T: Syncable>(&self, rows: &[T]) -> Result<()> {
    self.save_document(T::document(), &rows)
  }

  /// The finances document, or its initial state when never written.
  pub fn finances(&self) -> Result<FinanceData> {
    Ok(self.load_document(DOC_FINANCES)?.unwrap_or_default())
  }

  pub fn set_finances(&self, finances: &FinanceData) -> Result<()> {
    self.save_document(DOC_FINANCES, finances)
  }

  pub fn prayer_schedule(&self) -> Result<Option<PrayerSchedule>> {
    self.load_document(DOC_PRAYER_TIMES)
  }

  pub fn set_prayer_schedule(&self, schedule: &PrayerSchedule) -> Result<()> {
    self.save_document(DOC_PRAYER_TIMES, schedule)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Location, LocationCategory};

  fn location(id: &str, updated_at: &str) -> Location {
    Location {
      id: id.to_string(),
      title: format!("مكان {}", id),
      url: "geo:-34.6,-58.4".to_string(),
      category: LocationCategory::Other,
      created_at: "2026-01-01T00:00:00.000Z".to_string(),
      updated_at: updated_at.to_string(),
    }
  }

  #[test]
  fn test_unwritten_documents_are_empty() {
    let store = Store::in_memory().unwrap();
    assert!(store.rows::<Location>().unwrap().is_empty());
    assert_eq!(store.finances().unwrap(), FinanceData::default());
    assert!(store.prayer_schedule().unwrap().is_none());
  }

  #[test]
  fn test_rows_round_trip() {
    let store = Store::in_memory().unwrap();
    let rows = vec![
      location("a", "2026-02-01T00:00:00.000Z"),
      location("b", "2026-02-02T00:00:00.000Z"),
    ];
    store.set_rows(&rows).unwrap();
    assert_eq!(store.rows::<Location>().unwrap(), rows);

    // Rewriting replaces the whole document.
    store.set_rows(&rows[..1]).unwrap();
    assert_eq!(store.rows::<Location>().unwrap().len(), 1);
  }

  #[test]
  fn test_finances_round_trip() {
    let store = Store::in_memory().unwrap();
    let mut finances = FinanceData::default();
    finances.balance = 1500.5;
    store.set_finances(&finances).unwrap();
    assert_eq!(store.finances().unwrap().balance, 1500.5);
  }

  #[test]
  fn test_prayer_schedule_round_trip() {
    let store = Store::in_memory().unwrap();
    let schedule = PrayerSchedule {
      fajr: "05:30".to_string(),
      sunrise: "06:45".to_string(),
      dhuhr: "12:45".to_string(),
      asr: "16:15".to_string(),
      maghrib: "19:30".to_string(),
      isha: "21:00".to_string(),
      date: "2026-08-25".to_string(),
    };
    store.set_prayer_schedule(&schedule).unwrap();
    assert_eq!(store.prayer_schedule().unwrap(), Some(schedule));
  }
}
