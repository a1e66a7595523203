use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub cloud: CloudConfig,
  #[serde(default)]
  pub app: AppConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
  /// Base URL of the hosted backend project.
  pub url: String,
  /// Row owner for every synced table; syncing is refused without it.
  pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Origin the worker serves and pre-caches.
  pub origin: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      origin: "https://barakah.app".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Minutes between automatic background syncs.
  pub interval_minutes: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      interval_minutes: 5,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./barakah.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/barakah/config.yaml
  /// 4. ~/.config/barakah/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/barakah/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("barakah.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("barakah").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the cloud API key from environment variables.
  ///
  /// Checks BARAKAH_CLOUD_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("BARAKAH_CLOUD_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Cloud API key not found. Set BARAKAH_CLOUD_KEY or SUPABASE_ANON_KEY environment variable.")
      })
  }

  pub fn cloud_url(&self) -> Result<Url> {
    Url::parse(&self.cloud.url).map_err(|e| eyre!("Invalid cloud URL '{}': {}", self.cloud.url, e))
  }

  /// Host of the hosted backend; requests to it bypass the cache.
  pub fn backend_host(&self) -> Result<String> {
    self
      .cloud_url()?
      .host_str()
      .map(str::to_string)
      .ok_or_else(|| eyre!("Cloud URL '{}' has no host", self.cloud.url))
  }

  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.app.origin)
      .map_err(|e| eyre!("Invalid app origin '{}': {}", self.app.origin, e))
  }

  pub fn sync_interval(&self) -> Duration {
    Duration::from_secs(self.sync.interval_minutes.max(1) * 60)
  }
}
