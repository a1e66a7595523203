//! App data shapes shared by the local store and the cloud tables.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A saved place; `url` carries a `geo:lat,lng` link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
  pub id: String,
  pub title: String,
  pub url: String,
  pub category: LocationCategory,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationCategory {
  Other,
  Home,
  Work,
  Mosque,
}

/// A task or multi-step project with optional subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub deadline: String,
  pub completed: bool,
  pub priority: Priority,
  #[serde(rename = "type")]
  pub kind: TaskKind,
  #[serde(default)]
  pub subtasks: Vec<SubTask>,
  /// Percentage of completed subtasks, kept alongside the list.
  pub progress: u8,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
  Task,
  Project,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
  pub id: String,
  pub title: String,
  pub completed: bool,
}

/// A dated appointment with an optional reminder lead time in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
  pub id: String,
  pub title: String,
  pub date: String,
  pub time: String,
  pub reminder_minutes: u32,
  pub is_completed: bool,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

/// The per-user finances document; synced wholesale, not per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceData {
  pub balance: f64,
  pub currency: Currency,
  pub exchange_rate: f64,
  pub monthly_budget: f64,
  pub expenses: Vec<Expense>,
  pub income: Vec<Income>,
}

impl Default for FinanceData {
  fn default() -> Self {
    Self {
      balance: 0.0,
      currency: Currency::Ars,
      exchange_rate: 1000.0,
      monthly_budget: 0.0,
      expenses: Vec::new(),
      income: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
  #[serde(rename = "ARS")]
  Ars,
  #[serde(rename = "USD")]
  Usd,
}

impl Currency {
  pub fn code(self) -> &'static str {
    match self {
      Currency::Ars => "ARS",
      Currency::Usd => "USD",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
  pub id: String,
  pub amount: f64,
  pub description: String,
  pub category: String,
  pub date: String,
  pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
  pub id: String,
  pub amount: f64,
  pub description: String,
  pub date: String,
  pub currency: Currency,
}

/// Percentage of completed subtasks, rounded to the nearest whole number.
/// An empty list counts as zero progress.
pub fn subtask_progress(subtasks: &[SubTask]) -> u8 {
  if subtasks.is_empty() {
    return 0;
  }
  let completed = subtasks.iter().filter(|subtask| subtask.completed).count();
  ((completed as f64 / subtasks.len() as f64) * 100.0).round() as u8
}

/// Contract satisfied by every list domain that reconciles with a cloud
/// table: a stable id, the last-write-wins timestamp, the table and
/// document names, and the row mapping in both directions.
pub trait Syncable: Clone + Send + Sync + Serialize + DeserializeOwned {
  fn id(&self) -> &str;
  /// ISO-8601 modification time compared by the merge.
  fn updated_at(&self) -> &str;
  /// Remote table the rows live in.
  fn table() -> &'static str;
  /// Local document the rows persist under.
  fn document() -> &'static str;
  /// The remote row representation: snake_case columns plus the owner.
  fn to_row(&self, user_id: &str) -> serde_json::Value;
  /// Parse a remote row; rows that don't match the shape yield `None`.
  fn from_row(row: &serde_json::Value) -> Option<Self>;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn subtask(id: &str, completed: bool) -> SubTask {
    SubTask {
      id: id.to_string(),
      title: format!("subtask {}", id),
      completed,
    }
  }

  #[test]
  fn test_progress_empty_is_zero() {
    assert_eq!(subtask_progress(&[]), 0);
  }

  #[test]
  fn test_progress_rounds_to_nearest() {
    let one_of_three = [subtask("a", true), subtask("b", false), subtask("c", false)];
    assert_eq!(subtask_progress(&one_of_three), 33);

    let two_of_three = [subtask("a", true), subtask("b", true), subtask("c", false)];
    assert_eq!(subtask_progress(&two_of_three), 67);

    let all = [subtask("a", true), subtask("b", true)];
    assert_eq!(subtask_progress(&all), 100);
  }

  #[test]
  fn test_location_serializes_camel_case() {
    let location = Location {
      id: "1".to_string(),
      title: "المسجد".to_string(),
      url: "geo:-34.6,-58.4".to_string(),
      category: LocationCategory::Mosque,
      created_at: "2026-01-01T00:00:00.000Z".to_string(),
      updated_at: "2026-01-02T00:00:00.000Z".to_string(),
    };
    let value = serde_json::to_value(&location).unwrap();
    assert!(value.get("createdAt").is_some());
    assert!(value.get("created_at").is_none());
    assert_eq!(value["category"], "mosque");
  }

  #[test]
  fn test_task_kind_round_trips_as_type() {
    let task = Task {
      id: "t1".to_string(),
      title: "مشروع".to_string(),
      description: None,
      deadline: "2026-09-01".to_string(),
      completed: false,
      priority: Priority::High,
      kind: TaskKind::Project,
      subtasks: vec![subtask("a", true)],
      progress: 100,
      created_at: "2026-01-01T00:00:00.000Z".to_string(),
      updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    };
    let value = serde_json::to_value(&task).unwrap();
    assert_eq!(value["type"], "project");
    assert_eq!(value["priority"], "high");

    let back: Task = serde_json::from_value(value).unwrap();
    assert_eq!(back, task);
  }

  #[test]
  fn test_finance_defaults_match_initial_state() {
    let finances = FinanceData::default();
    assert_eq!(finances.balance, 0.0);
    assert_eq!(finances.currency, Currency::Ars);
    assert_eq!(finances.exchange_rate, 1000.0);
    assert!(finances.expenses.is_empty());
    assert_eq!(serde_json::to_value(finances.currency).unwrap(), "ARS");
  }
}
