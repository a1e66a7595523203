//! Row mappings between the local documents and the remote tables.
//!
//! Remote columns are snake_case; the local documents keep the app's
//! camelCase. Rows that don't match the expected shape are skipped
//! rather than failing the whole table.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{
  subtask_progress, Appointment, FinanceData, Location, LocationCategory, Priority, SubTask,
  Syncable, Task, TaskKind,
};

/// Remote table holding the single-row finances document.
pub const FINANCES_TABLE: &str = "finances";

/// Shape of the finances document row.
#[derive(Deserialize)]
pub struct FinanceRow {
  pub data: FinanceData,
  pub updated_at: String,
}

#[derive(Deserialize)]
struct LocationRow {
  id: String,
  title: String,
  url: String,
  category: LocationCategory,
  created_at: String,
  updated_at: String,
}

impl Syncable for Location {
  fn id(&self) -> &str {
    &self.id
  }

  fn updated_at(&self) -> &str {
    &self.updated_at
  }

  fn table() -> &'static str {
    "locations"
  }

  fn document() -> &'static str {
    "locations"
  }

  fn to_row(&self, user_id: &str) -> Value {
    json!({
      "id": self.id,
      "user_id": user_id,
      "title": self.title,
      "url": self.url,
      "category": self.category,
      "created_at": self.created_at,
      "updated_at": self.updated_at,
    })
  }

  fn from_row(row: &Value) -> Option<Self> {
    let row: LocationRow = serde_json::from_value(row.clone()).ok()?;
    Some(Location {
      id: row.id,
      title: row.title,
      url: row.url,
      category: row.category,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Deserialize)]
struct TaskRow {
  id: String,
  title: String,
  #[serde(default)]
  description: Option<String>,
  deadline: String,
  completed: bool,
  priority: Priority,
  #[serde(rename = "type")]
  kind: TaskKind,
  #[serde(default)]
  subtasks: Option<Vec<SubTask>>,
  #[serde(default)]
  progress: Option<u8>,
  created_at: String,
  updated_at: String,
}

impl Syncable for Task {
  fn id(&self) -> &str {
    &self.id
  }

  fn updated_at(&self) -> &str {
    &self.updated_at
  }

  fn table() -> &'static str {
    "tasks"
  }

  fn document() -> &'static str {
    "tasks"
  }

  fn to_row(&self, user_id: &str) -> Value {
    json!({
      "id": self.id,
      "user_id": user_id,
      "title": self.title,
      "description": self.description,
      "deadline": self.deadline,
      "completed": self.completed,
      "priority": self.priority,
      "type": self.kind,
      "subtasks": self.subtasks,
      "progress": self.progress,
      "created_at": self.created_at,
      "updated_at": self.updated_at,
    })
  }

  fn from_row(row: &Value) -> Option<Self> {
    let row: TaskRow = serde_json::from_value(row.clone()).ok()?;
    let subtasks = row.subtasks.unwrap_or_default();
    // Older rows predate the stored percentage; recompute it.
    let progress = row.progress.unwrap_or_else(|| subtask_progress(&subtasks));
    Some(Task {
      id: row.id,
      title: row.title,
      description: row.description,
      deadline: row.deadline,
      completed: row.completed,
      priority: row.priority,
      kind: row.kind,
      subtasks,
      progress,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Deserialize)]
struct AppointmentRow {
  id: String,
  title: String,
  date: String,
  time: String,
  reminder_minutes: u32,
  is_completed: bool,
  #[serde(default)]
  location: Option<String>,
  #[serde(default)]
  notes: Option<String>,
  created_at: String,
  updated_at: String,
}

impl Syncable for Appointment {
  fn id(&self) -> &str {
    &self.id
  }

  fn updated_at(&self) -> &str {
    &self.updated_at
  }

  fn table() -> &'static str {
    "appointments"
  }

  fn document() -> &'static str {
    "appointments"
  }

  fn to_row(&self, user_id: &str) -> Value {
    json!({
      "id": self.id,
      "user_id": user_id,
      "title": self.title,
      "date": self.date,
      "time": self.time,
      "reminder_minutes": self.reminder_minutes,
      "is_completed": self.is_completed,
      "location": self.location,
      "notes": self.notes,
      "created_at": self.created_at,
      "updated_at": self.updated_at,
    })
  }

  fn from_row(row: &Value) -> Option<Self> {
    let row: AppointmentRow = serde_json::from_value(row.clone()).ok()?;
    Some(Appointment {
      id: row.id,
      title: row.title,
      date: row.date,
      time: row.time,
      reminder_minutes: row.reminder_minutes,
      is_completed: row.is_completed,
      location: row.location,
      notes: row.notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}
