//! Push payload parsing and the notification it turns into.

use serde::Deserialize;

use crate::notify::{Notification, NotificationAction};

/// Fallback title when the payload carries none.
pub const DEFAULT_TITLE: &str = "نظام بركة";
/// Fallback body when the payload carries none.
pub const DEFAULT_BODY: &str = "إشعار جديد من نظام بركة";

/// The JSON shape the push service delivers. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  #[serde(default)]
  pub data: PushData,
  #[serde(default)]
  pub actions: Vec<NotificationAction>,
  pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PushData {
  /// Where a click on the notification should take the user.
  pub url: Option<String>,
}

/// Build the notification a payload asks for. Absent or malformed
/// payloads yield nothing; that is a quiet skip, not an error.
pub fn notification_from_push(payload: Option<&str>) -> Option<Notification> {
  let raw = payload?;
  let payload: PushPayload = serde_json::from_str(raw).ok()?;
  let mut notification = Notification::new(
    payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
    payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
  );
  if let Some(url) = payload.data.url {
    notification.url = url;
  }
  if let Some(tag) = payload.tag {
    notification.tag = tag;
  }
  notification.actions = payload.actions;
  Some(notification)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notify::DEFAULT_TAG;

  #[test]
  fn test_full_payload_maps_through() {
    let raw = r#"{
      "title": "موعد قريب",
      "body": "موعد الطبيب بعد ٣٠ دقيقة",
      "data": {"url": "/appointments"},
      "tag": "appointment-7",
      "actions": [{"action": "open", "title": "فتح"}]
    }"#;
    let notification = notification_from_push(Some(raw)).unwrap();
    assert_eq!(notification.title, "موعد قريب");
    assert_eq!(notification.body, "موعد الطبيب بعد ٣٠ دقيقة");
    assert_eq!(notification.url, "/appointments");
    assert_eq!(notification.tag, "appointment-7");
    assert_eq!(notification.actions.len(), 1);
    assert_eq!(notification.actions[0].action, "open");
  }

  #[test]
  fn test_empty_object_gets_defaults() {
    let notification = notification_from_push(Some("{}")).unwrap();
    assert_eq!(notification.title, DEFAULT_TITLE);
    assert_eq!(notification.body, DEFAULT_BODY);
    assert_eq!(notification.tag, DEFAULT_TAG);
    assert_eq!(notification.url, "/");
    assert!(notification.actions.is_empty());
  }

  #[test]
  fn test_absent_or_malformed_payload_yields_nothing() {
    assert!(notification_from_push(None).is_none());
    assert!(notification_from_push(Some("")).is_none());
    assert!(notification_from_push(Some("not json")).is_none());
  }
}
