//! Remote table access over the backend's REST interface.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Access to the per-user rows of one remote table.
#[async_trait]
pub trait TableClient: Send + Sync {
  /// All rows of `table` owned by `user_id`.
  async fn select_rows(&self, table: &str, user_id: &str) -> Result<Vec<Value>>;
  /// Insert rows, updating any that already exist under the same key.
  async fn upsert_rows(&self, table: &str, rows: &[Value]) -> Result<()>;
}

/// Table access against Supabase's PostgREST endpoint.
pub struct SupabaseClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: String,
}

impl SupabaseClient {
  pub fn new(base_url: Url, api_key: String) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key,
    })
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    self
      .base_url
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Invalid table name '{}': {}", table, e))
  }
}

#[async_trait]
impl TableClient for SupabaseClient {
  async fn select_rows(&self, table: &str, user_id: &str) -> Result<Vec<Value>> {
    let mut url = self.table_url(table)?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("user_id", &format!("eq.{}", user_id));

    let response = self
      .http
      .get(url)
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .send()
      .await
      .map_err(|e| eyre!("Failed to query table {}: {}", table, e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Table {} query returned status {}",
        table,
        response.status()
      ));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse rows from table {}: {}", table, e))
  }

  async fn upsert_rows(&self, table: &str, rows: &[Value]) -> Result<()> {
    let response = self
      .http
      .post(self.table_url(table)?)
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .header("Prefer", "resolution=merge-duplicates")
      .json(&rows)
      .send()
      .await
      .map_err(|e| eyre!("Failed to upsert into table {}: {}", table, e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Table {} upsert returned status {}",
        table,
        response.status()
      ));
    }

    Ok(())
  }
}
