//! Last-write-wins reconciliation between the local documents and the
//! cloud tables.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::client::TableClient;
use super::outcome::SyncOutcome;
use super::rows::{FinanceRow, FINANCES_TABLE};
use crate::domain::{Appointment, Location, Syncable, Task};
use crate::store::Store;

pub const MSG_SYNCED: &str = "تمت المزامنة بنجاح";
pub const MSG_PULLED: &str = "تم سحب البيانات";
pub const MSG_NOT_CONFIGURED: &str = "المستخدم غير مسجل الدخول";
pub const MSG_SYNC_FAILED: &str = "فشلت المزامنة";

/// The remote side of the sync coordinator. `Ok` carries business
/// outcomes, good and bad; `Err` is reserved for transport failures.
#[async_trait]
pub trait RemoteSync: Send + Sync {
  async fn sync_all(&self) -> Result<SyncOutcome>;
  async fn pull_all(&self) -> Result<SyncOutcome>;
}

/// Reconciles the local documents with the per-user cloud tables.
pub struct CloudSync {
  client: Arc<dyn TableClient>,
  store: Arc<Store>,
  user_id: Option<String>,
}

impl CloudSync {
  pub fn new(client: Arc<dyn TableClient>, store: Arc<Store>, user_id: Option<String>) -> Self {
    Self {
      client,
      store,
      user_id,
    }
  }

  /// Merge one list domain both ways.
  ///
  /// Rows are matched by id. A local item is pushed when the remote copy
  /// is missing or older; a remote row lands locally when the local copy
  /// is missing or older. Comparisons are strict, so equal or unparseable
  /// timestamps move nothing.
  async fn sync_rows<T: Syncable>(&self, user_id: &str) -> Result<()> {
    let local: Vec<T> = self.store.rows()?;
    let remote_rows = self.client.select_rows(T::table(), user_id).await?;

    let mut to_upsert = Vec::new();
    for item in &local {
      match remote_rows.iter().find(|row| row_id(row) == Some(item.id())) {
        None => to_upsert.push(item.to_row(user_id)),
        Some(row) => {
          if is_newer(item.updated_at(), row_updated_at(row).unwrap_or_default()) {
            to_upsert.push(item.to_row(user_id));
          }
        }
      }
    }

    let mut merged = local;
    let mut changed = false;
    for row in &remote_rows {
      let remote_item = match T::from_row(row) {
        Some(item) => item,
        None => {
          debug!("Skipping malformed row in {}", T::table());
          continue;
        }
      };
      match merged.iter().position(|item| item.id() == remote_item.id()) {
        Some(index) => {
          if is_newer(remote_item.updated_at(), merged[index].updated_at()) {
            merged[index] = remote_item;
            changed = true;
          }
        }
        None => {
          merged.push(remote_item);
          changed = true;
        }
      }
    }

    if !to_upsert.is_empty() {
      debug!("Pushing {} rows to {}", to_upsert.len(), T::table());
      self.client.upsert_rows(T::table(), &to_upsert).await?;
    }
    if changed {
      self.store.set_rows(&merged)?;
    }
    Ok(())
  }

  /// Finances travel as one document row per user. Its local side has no
  /// own timestamp, so the push stamp is "now" and the local copy wins
  /// unless the remote one is dated in the future.
  async fn sync_finances(&self, user_id: &str) -> Result<()> {
    let local = self.store.finances()?;
    let rows = self.client.select_rows(FINANCES_TABLE, user_id).await?;
    let local_stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let remote: Option<FinanceRow> = rows
      .first()
      .and_then(|row| serde_json::from_value(row.clone()).ok());

    let push = match &remote {
      None => true,
      Some(row) => is_newer(&local_stamp, &row.updated_at),
    };

    if push {
      let row = json!({
        "user_id": user_id,
        "data": local,
        "updated_at": local_stamp,
      });
      self.client.upsert_rows(FINANCES_TABLE, &[row]).await?;
    } else if let Some(row) = remote {
      self.store.set_finances(&row.data)?;
    }
    Ok(())
  }

  /// Replace one local document with the remote rows verbatim.
  async fn pull_rows<T: Syncable>(&self, user_id: &str) -> Result<()> {
    let rows = self.client.select_rows(T::table(), user_id).await?;
    let items: Vec<T> = rows.iter().filter_map(T::from_row).collect();
    self.store.set_rows(&items)
  }

  async fn pull_finances(&self, user_id: &str) -> Result<()> {
    let rows = self.client.select_rows(FINANCES_TABLE, user_id).await?;
    if let Some(row) = rows.first() {
      let row: FinanceRow = serde_json::from_value(row.clone())
        .map_err(|e| eyre!("Failed to parse finances row: {}", e))?;
      self.store.set_finances(&row.data)?;
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteSync for CloudSync {
  /// Reconcile all four domains, concurrently.
  async fn sync_all(&self) -> Result<SyncOutcome> {
    let user_id = match &self.user_id {
      Some(user_id) => user_id.clone(),
      None => return Ok(SyncOutcome::failure(MSG_NOT_CONFIGURED)),
    };

    futures::try_join!(
      self.sync_rows::<Location>(&user_id),
      self.sync_rows::<Task>(&user_id),
      self.sync_rows::<Appointment>(&user_id),
      self.sync_finances(&user_id),
    )?;

    Ok(SyncOutcome::success(MSG_SYNCED))
  }

  /// Replace every local document with the cloud copy. Initial-sync and
  /// reset path; a finances document missing remotely is left alone.
  async fn pull_all(&self) -> Result<SyncOutcome> {
    let user_id = match &self.user_id {
      Some(user_id) => user_id.clone(),
      None => return Ok(SyncOutcome::failure(MSG_NOT_CONFIGURED)),
    };

    self.pull_rows::<Location>(&user_id).await?;
    self.pull_rows::<Task>(&user_id).await?;
    self.pull_rows::<Appointment>(&user_id).await?;
    self.pull_finances(&user_id).await?;

    Ok(SyncOutcome::success(MSG_PULLED))
  }
}

fn row_id(row: &Value) -> Option<&str> {
  row.get("id").and_then(Value::as_str)
}

fn row_updated_at(row: &Value) -> Option<&str> {
  row.get("updated_at").and_then(Value::as_str)
}

/// Strict comparison for the merge; `true` only when both stamps parse
/// and `a` is later than `b`.
fn is_newer(a: &str, b: &str) -> bool {
  match (parse_timestamp(a), parse_timestamp(b)) {
    (Some(a), Some(b)) => a > b,
    _ => false,
  }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(value).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cloud::client::testing::MemoryTableClient;
  use crate::domain::{FinanceData, LocationCategory};

  const OLDER: &str = "2026-01-01T00:00:00.000Z";
  const NEWER: &str = "2026-01-02T00:00:00.000Z";

  fn location(id: &str, title: &str, updated_at: &str) -> Location {
    Location {
      id: id.to_string(),
      title: title.to_string(),
      url: "geo:0,0".to_string(),
      category: LocationCategory::Other,
      created_at: OLDER.to_string(),
      updated_at: updated_at.to_string(),
    }
  }

  fn remote_location(id: &str, title: &str, updated_at: &str) -> Value {
    json!({
      "id": id,
      "user_id": "u1",
      "title": title,
      "url": "geo:0,0",
      "category": "other",
      "created_at": OLDER,
      "updated_at": updated_at,
    })
  }

  fn remote_finances(balance: f64, updated_at: &str) -> Value {
    json!({
      "user_id": "u1",
      "data": {
        "balance": balance,
        "currency": "ARS",
        "exchangeRate": 1000.0,
        "monthlyBudget": 0.0,
        "expenses": [],
        "income": [],
      },
      "updated_at": updated_at,
    })
  }

  fn fixture(user_id: Option<&str>) -> (CloudSync, Arc<MemoryTableClient>, Arc<Store>) {
    let client = Arc::new(MemoryTableClient::new());
    let store = Arc::new(Store::in_memory().unwrap());
    let sync = CloudSync::new(client.clone(), store.clone(), user_id.map(str::to_string));
    (sync, client, store)
  }

  #[test]
  fn test_is_newer_is_strict() {
    assert!(is_newer(NEWER, OLDER));
    assert!(!is_newer(OLDER, NEWER));
    assert!(!is_newer(NEWER, NEWER));
    assert!(!is_newer("garbage", OLDER));
    assert!(!is_newer(NEWER, "garbage"));
  }

  #[tokio::test]
  async fn test_sync_requires_configured_user() {
    let (sync, client, _store) = fixture(None);

    let outcome = sync.sync_all().await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, MSG_NOT_CONFIGURED);

    let outcome = sync.pull_all().await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, MSG_NOT_CONFIGURED);

    assert_eq!(client.upsert_calls(), 0);
  }

  #[tokio::test]
  async fn test_sync_pushes_rows_missing_remotely() {
    let (sync, client, store) = fixture(Some("u1"));
    store.set_rows(&[location("l1", "البيت", NEWER)]).unwrap();

    let outcome = sync.sync_all().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message, MSG_SYNCED);
    let rows = client.rows("locations");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], "u1");
    assert_eq!(rows[0]["title"], "البيت");
  }

  #[tokio::test]
  async fn test_sync_pushes_newer_local_row() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l1", "قديم", OLDER)]);
    store.set_rows(&[location("l1", "جديد", NEWER)]).unwrap();

    sync.sync_all().await.unwrap();

    assert_eq!(client.rows("locations")[0]["title"], "جديد");
    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local[0].title, "جديد");
  }

  #[tokio::test]
  async fn test_sync_pulls_newer_remote_row() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l1", "جديد", NEWER)]);
    store.set_rows(&[location("l1", "قديم", OLDER)]).unwrap();

    sync.sync_all().await.unwrap();

    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local[0].title, "جديد");
    // The stale local copy was not pushed over the remote one.
    assert_eq!(client.rows("locations")[0]["updated_at"], NEWER);
  }

  #[tokio::test]
  async fn test_sync_appends_rows_missing_locally() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l2", "العمل", NEWER)]);
    store.set_rows(&[location("l1", "البيت", OLDER)]).unwrap();

    sync.sync_all().await.unwrap();

    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local.len(), 2);
    assert_eq!(local[0].id, "l1");
    assert_eq!(local[1].id, "l2");
    // l1 was pushed, so both sides now hold both rows.
    assert_eq!(client.rows("locations").len(), 2);
  }

  #[tokio::test]
  async fn test_equal_timestamps_move_nothing() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l1", "بعيد", NEWER)]);
    store.set_rows(&[location("l1", "قريب", NEWER)]).unwrap();

    sync.sync_all().await.unwrap();

    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local[0].title, "قريب");
    assert_eq!(client.rows("locations")[0]["title"], "بعيد");
  }

  #[tokio::test]
  async fn test_unparseable_timestamps_move_nothing() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l1", "بعيد", "not-a-date")]);
    store.set_rows(&[location("l1", "قريب", NEWER)]).unwrap();

    sync.sync_all().await.unwrap();

    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local[0].title, "قريب");
    assert_eq!(client.rows("locations")[0]["title"], "بعيد");
  }

  #[tokio::test]
  async fn test_finances_inserted_when_remote_missing() {
    let (sync, client, store) = fixture(Some("u1"));
    let finances = FinanceData {
      balance: 250.0,
      ..FinanceData::default()
    };
    store.set_finances(&finances).unwrap();

    sync.sync_all().await.unwrap();

    let rows = client.rows("finances");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], "u1");
    assert_eq!(rows[0]["data"]["balance"], 250.0);
  }

  #[tokio::test]
  async fn test_finances_dated_in_future_win_remotely() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed(
      "finances",
      vec![remote_finances(999.0, "2126-01-01T00:00:00.000Z")],
    );

    sync.sync_all().await.unwrap();

    assert_eq!(store.finances().unwrap().balance, 999.0);
    // Nothing was pushed over the newer remote document.
    assert_eq!(client.rows("finances")[0]["data"]["balance"], 999.0);
  }

  #[tokio::test]
  async fn test_pull_replaces_local_documents() {
    let (sync, client, store) = fixture(Some("u1"));
    client.seed("locations", vec![remote_location("l2", "العمل", NEWER)]);
    store.set_rows(&[location("l1", "البيت", NEWER)]).unwrap();

    let outcome = sync.pull_all().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message, MSG_PULLED);
    let local: Vec<Location> = store.rows().unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, "l2");
    // Pull never pushes.
    assert_eq!(client.upsert_calls(), 0);
  }

  #[tokio::test]
  async fn test_pull_leaves_finances_when_remote_missing() {
    let (sync, _client, store) = fixture(Some("u1"));
    let finances = FinanceData {
      balance: 42.0,
      ..FinanceData::default()
    };
    store.set_finances(&finances).unwrap();

    sync.pull_all().await.unwrap();

    assert_eq!(store.finances().unwrap().balance, 42.0);
  }

  #[tokio::test]
  async fn test_sync_surfaces_transport_errors() {
    let (sync, client, store) = fixture(Some("u1"));
    store.set_rows(&[location("l1", "البيت", NEWER)]).unwrap();
    client.fail_with("connection reset");

    let err = sync.sync_all().await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
  }
}
