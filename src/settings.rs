//! Admin-editable settings: shop credentials, shop URL and display mode.
//!
//! Settings are persisted as YAML and every successful write is broadcast as a
//! [`SettingsChange`], so the cache can drop data fetched with old
//! credentials.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;

/// How many appointments the shortcode shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
  /// The three soonest appointments
  NextThreeAppointments,
  /// The next appointment of every training
  #[default]
  OneAppointmentPerTraining,
}

impl DisplayMode {
  pub fn shows_all(self) -> bool {
    self == DisplayMode::OneAppointmentPerTraining
  }
}

const SECRET_MASK: &str = "********";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub consumer_key: String,
  #[serde(default)]
  pub consumer_secret: String,
  #[serde(default)]
  pub base_url: String,
  #[serde(default)]
  pub appointments_dropdown: DisplayMode,
}

impl Settings {
  /// Copy safe to show in the admin UI. The mask doesn't reveal the
  /// secret's length; an unset secret stays empty.
  pub fn masked(&self) -> Settings {
    let consumer_secret = if self.consumer_secret.is_empty() {
      String::new()
    } else {
      SECRET_MASK.to_string()
    };
    Settings {
      consumer_secret,
      ..self.clone()
    }
  }
}

/// A partial update as submitted by the settings form. Absent fields keep
/// their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsInput {
  pub consumer_key: Option<String>,
  pub consumer_secret: Option<String>,
  pub base_url: Option<String>,
  pub appointments_dropdown: Option<DisplayMode>,
}

impl SettingsInput {
  /// Apply the sanitized input on top of `current`.
  pub fn sanitize_onto(&self, current: &Settings) -> Settings {
    Settings {
      consumer_key: self
        .consumer_key
        .as_deref()
        .map(sanitize_key)
        .unwrap_or_else(|| current.consumer_key.clone()),
      consumer_secret: self
        .consumer_secret
        .as_deref()
        .map(sanitize_key)
        .unwrap_or_else(|| current.consumer_secret.clone()),
      base_url: self
        .base_url
        .as_deref()
        .map(sanitize_url)
        .unwrap_or_else(|| current.base_url.clone()),
      appointments_dropdown: self
        .appointments_dropdown
        .unwrap_or(current.appointments_dropdown),
    }
  }
}

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn sanitize_key(raw: &str) -> String {
  raw
    .to_lowercase()
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
    .collect()
}

/// Normalize a shop URL. Anything that isn't an http(s) URL becomes empty.
pub fn sanitize_url(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return String::new();
  }
  let candidate = if trimmed.contains("://") {
    trimmed.to_string()
  } else {
    format!("http://{}", trimmed)
  };
  match Url::parse(&candidate) {
    Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
      url.as_str().trim_end_matches('/').to_string()
    }
    _ => String::new(),
  }
}

/// Old and new settings of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChange {
  pub old: Settings,
  pub new: Settings,
}

impl SettingsChange {
  /// Whether anything used to talk to the shop changed.
  pub fn connection_changed(&self) -> bool {
    self.old.consumer_key != self.new.consumer_key
      || self.old.consumer_secret != self.new.consumer_secret
      || self.old.base_url != self.new.base_url
  }
}

/// File-backed settings with change notification.
///
/// Writes from other processes (e.g. `configure` while `serve` runs) are
/// picked up on the next read: a changed file mtime reloads the file and
/// broadcasts the difference like a local write.
pub struct SettingsStore {
  path: Option<PathBuf>,
  current: RwLock<Settings>,
  /// File mtime `current` corresponds to. Locked before `current`.
  loaded_mtime: Mutex<Option<SystemTime>>,
  changes: broadcast::Sender<SettingsChange>,
}

impl SettingsStore {
  /// Load settings from `path`; a missing file means defaults.
  pub fn open(path: &Path) -> Result<Self> {
    let mtime = file_mtime(path);
    let settings = if mtime.is_some() {
      load(path)?
    } else {
      Settings::default()
    };
    Ok(Self::with_path(Some(path.to_path_buf()), settings, mtime))
  }

  /// Settings that are never written to disk.
  pub fn in_memory(settings: Settings) -> Self {
    Self::with_path(None, settings, None)
  }

  fn with_path(path: Option<PathBuf>, settings: Settings, mtime: Option<SystemTime>) -> Self {
    let (changes, _) = broadcast::channel(16);
    Self {
      path,
      current: RwLock::new(settings),
      loaded_mtime: Mutex::new(mtime),
      changes,
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, Settings> {
    self.reload_if_changed();
    self.current.read().unwrap_or_else(|e| e.into_inner())
  }

  pub fn snapshot(&self) -> Settings {
    self.read().clone()
  }

  pub fn display_mode(&self) -> DisplayMode {
    self.read().appointments_dropdown
  }

  /// Re-read the file if someone else wrote it since we last did.
  ///
  /// An unreadable file keeps the current settings and is retried on the
  /// next read. A deleted file keeps them too.
  fn reload_if_changed(&self) {
    let Some(path) = &self.path else {
      return;
    };
    let mut loaded = self.loaded_mtime.lock().unwrap_or_else(|e| e.into_inner());
    let mtime = file_mtime(path);
    if mtime.is_none() || mtime == *loaded {
      return;
    }
    let settings = match load(path) {
      Ok(settings) => settings,
      Err(e) => {
        warn!(error = %e, "Failed to reload settings, keeping current values");
        return;
      }
    };
    *loaded = mtime;

    let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
    if *current == settings {
      return;
    }
    let change = SettingsChange {
      old: std::mem::replace(&mut *current, settings.clone()),
      new: settings,
    };
    drop(current);
    drop(loaded);

    info!(
      connection_changed = change.connection_changed(),
      "Settings reloaded from {}",
      path.display()
    );
    let _ = self.changes.send(change);
  }

  /// Sanitize, persist and broadcast an update.
  pub fn set(&self, input: &SettingsInput) -> Result<SettingsChange> {
    self.reload_if_changed();
    let mut loaded = self.loaded_mtime.lock().unwrap_or_else(|e| e.into_inner());
    let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
    let new = input.sanitize_onto(&current);
    if let Some(path) = &self.path {
      persist(path, &new)?;
      *loaded = file_mtime(path);
    }
    let change = SettingsChange {
      old: std::mem::replace(&mut *current, new.clone()),
      new,
    };
    drop(current);
    drop(loaded);

    info!(
      connection_changed = change.connection_changed(),
      "Settings updated"
    );
    // No subscribers is fine (e.g. one-shot CLI use).
    let _ = self.changes.send(change.clone());
    Ok(change)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
    self.changes.subscribe()
  }
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
  std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn load(path: &Path) -> Result<Settings> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read settings file {}: {}", path.display(), e))?;
  serde_yaml::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse settings file {}: {}", path.display(), e))
}

/// Write through a sibling temp file so readers never see a partial file.
fn persist(path: &Path, settings: &Settings) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
  }
  let contents =
    serde_yaml::to_string(settings).map_err(|e| eyre!("Failed to serialize settings: {}", e))?;
  let tmp = path.with_extension("yaml.tmp");
  std::fs::write(&tmp, contents)
    .map_err(|e| eyre!("Failed to write settings file {}: {}", tmp.display(), e))?;
  std::fs::rename(&tmp, path)
    .map_err(|e| eyre!("Failed to replace settings file {}: {}", path.display(), e))
}
