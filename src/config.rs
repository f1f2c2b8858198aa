use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::appointments::DEFAULT_INDIVIDUAL_MARKER;
use crate::cache::{CacheOptions, SqliteStorage};
use crate::shop::Timeouts;

const APP_DIR: &str = "appointment-updater";

/// Static service configuration. Shop credentials are not in here; they are
/// admin-editable settings (see `settings`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub fetch: FetchConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub server: ServerConfig,
  /// Where admin settings are stored (defaults to the data directory)
  pub settings_path: Option<PathBuf>,
  /// Write logs to daily files in this directory instead of stderr
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
  /// Products to list per fetch (the API allows at most 100)
  pub max_products: u32,
  pub connect_timeout_secs: u64,
  pub timeout_secs: u64,
  /// SKU substring marking on-request bookings (case-insensitive)
  pub individual_marker: String,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      max_products: 18,
      connect_timeout_secs: 30,
      timeout_secs: 30,
      individual_marker: DEFAULT_INDIVIDUAL_MARKER.to_string(),
    }
  }
}

impl FetchConfig {
  pub fn timeouts(&self) -> Timeouts {
    Timeouts {
      connect: Duration::from_secs(self.connect_timeout_secs),
      request: Duration::from_secs(self.timeout_secs),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Lifetime of fetched appointments (two days)
  pub ttl_secs: i64,
  /// Debounce window before refetching after an invalidation
  pub refetch_delay_secs: u64,
  /// SQLite database file (defaults to the data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: 2 * 24 * 60 * 60,
      refetch_delay_secs: 15,
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub listen: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      listen: "127.0.0.1:8080".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./appointment-updater.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/appointment-updater/config.yaml
  ///
  /// Without any file, defaults apply.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("appointment-updater.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_DIR).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means defaults.
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn settings_path(&self) -> Result<PathBuf> {
    match &self.settings_path {
      Some(p) => Ok(p.clone()),
      None => Ok(data_dir()?.join("settings.yaml")),
    }
  }

  pub fn cache_path(&self) -> Result<PathBuf> {
    match &self.cache.path {
      Some(p) => Ok(p.clone()),
      None => SqliteStorage::default_path(),
    }
  }

  pub fn cache_options(&self) -> CacheOptions {
    CacheOptions {
      ttl: chrono::Duration::seconds(self.cache.ttl_secs),
      refetch_delay: Duration::from_secs(self.cache.refetch_delay_secs),
      max_products: self.fetch.max_products,
      individual_marker: self.fetch.individual_marker.clone(),
      timeouts: self.fetch.timeouts(),
    }
  }

  /// Token the admin routes require in `X-Admin-Token`.
  ///
  /// Checks APPOINTMENT_UPDATER_ADMIN_TOKEN.
  pub fn get_admin_token() -> Result<String> {
    std::env::var("APPOINTMENT_UPDATER_ADMIN_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
      .ok_or_else(|| {
        eyre!("Admin token not found. Set the APPOINTMENT_UPDATER_ADMIN_TOKEN environment variable.")
      })
  }
}

fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(data_dir.join(APP_DIR))
}
