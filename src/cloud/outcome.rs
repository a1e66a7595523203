/// What a sync or pull attempt came to. `message` is the user-facing
/// product string, shown in notifications and on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
  pub success: bool,
  pub message: String,
}

impl SyncOutcome {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      success: true,
      message: message.into(),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
    }
  }
}
