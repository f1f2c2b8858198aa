//! The appointment cache: one slot, filled from the shop on a miss, emptied
//! when the shop connection changes or an admin asks for a refetch.

use chrono::Duration;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::traits::TransientStore;
use crate::appointments::{collate_today, Appointment};
use crate::schedule::Debouncer;
use crate::settings::{Settings, SettingsChange, SettingsStore};
use crate::shop::{fetch_all, ShopClient, Timeouts};

/// Key of the single cache slot.
pub const CACHE_KEY: &str = "APPOINTMENTS_UPDATER_CACHE_QUERY_RESULTS";

/// Name of the deferred refresh, used in logs.
const REFRESH_HOOK: &str = "clear_cache";

/// Tuning for [`AppointmentCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
  pub ttl: Duration,
  /// Delay before the background refresh after an invalidation.
  pub refetch_delay: std::time::Duration,
  pub max_products: u32,
  pub individual_marker: String,
  pub timeouts: Timeouts,
}

/// What the slot holds: collated appointments plus the fingerprint of the
/// connection they were fetched with.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAppointments {
  fingerprint: String,
  appointments: Vec<Appointment>,
}

/// SHA-256 over everything that selects which shop (and which account) we
/// talk to.
fn connection_fingerprint(settings: &Settings) -> String {
  let mut hasher = Sha256::new();
  for part in [
    &settings.base_url,
    &settings.consumer_key,
    &settings.consumer_secret,
  ] {
    hasher.update(part.as_bytes());
    hasher.update([0u8]);
  }
  hex::encode(hasher.finalize())
}

/// HTTP session plus the fingerprint of the settings it was built from.
#[derive(Clone)]
struct Session {
  client: ShopClient,
  fingerprint: String,
}

pub struct AppointmentCache<S: TransientStore> {
  store: S,
  settings: Arc<SettingsStore>,
  session: RwLock<Session>,
  refresh: Debouncer,
  options: CacheOptions,
}

impl<S: TransientStore + 'static> AppointmentCache<S> {
  pub fn new(store: S, settings: Arc<SettingsStore>, options: CacheOptions) -> Result<Self> {
    let session = build_session(&settings.snapshot(), options.timeouts)?;
    Ok(Self {
      store,
      settings,
      session: RwLock::new(session),
      refresh: Debouncer::new(REFRESH_HOOK),
      options,
    })
  }

  pub fn settings(&self) -> &SettingsStore {
    &self.settings
  }

  /// Session for the current settings, rebuilt if the settings moved on
  /// since it was created.
  fn current_session(&self) -> Result<Session> {
    let settings = self.settings.snapshot();
    let fingerprint = connection_fingerprint(&settings);
    {
      let session = self.session.read().unwrap_or_else(|e| e.into_inner());
      if session.fingerprint == fingerprint {
        return Ok(session.clone());
      }
    }
    self.reset_session(&settings)
  }

  fn reset_session(&self, settings: &Settings) -> Result<Session> {
    let session = build_session(settings, self.options.timeouts)?;
    debug!(shop = %session.client.base_url(), "Rebuilt shop session");
    *self.session.write().unwrap_or_else(|e| e.into_inner()) = session.clone();
    Ok(session)
  }

  /// Appointments from the cache, fetching them on a miss.
  ///
  /// Shop failures never surface here; they yield an empty (and cached)
  /// list. Only a broken session setup is an error.
  #[instrument(skip(self))]
  pub async fn get_appointments(&self) -> Result<Vec<Appointment>> {
    let session = self.current_session()?;

    match self.store.get::<CachedAppointments>(CACHE_KEY) {
      Ok(Some(cached)) if cached.fingerprint == session.fingerprint => {
        debug!(count = cached.appointments.len(), "Cache hit");
        return Ok(cached.appointments);
      }
      Ok(Some(_)) => info!("Cached appointments belong to other shop settings, refetching"),
      Ok(None) => debug!("Cache miss"),
      Err(e) => warn!(error = %e, "Failed to read appointment cache, refetching"),
    }

    Ok(self.populate(session).await)
  }

  async fn populate(&self, session: Session) -> Vec<Appointment> {
    let raw = fetch_all(
      &session.client,
      self.options.max_products,
      &self.options.individual_marker,
    )
    .await;
    let appointments = collate_today(raw);

    let entry = CachedAppointments {
      fingerprint: session.fingerprint,
      appointments,
    };
    if let Err(e) = self.store.set(CACHE_KEY, &entry, self.options.ttl) {
      warn!(error = %e, "Failed to store appointments in cache");
    }
    info!(count = entry.appointments.len(), "Cached appointments");
    entry.appointments
  }

  /// Empty the slot and rebuild the session from the current settings.
  pub fn clear(&self) -> Result<()> {
    self.store.delete(CACHE_KEY)?;
    self.reset_session(&self.settings.snapshot())?;
    info!("Appointment cache cleared");
    Ok(())
  }

  /// Clear, then fetch again right away.
  #[instrument(skip(self))]
  pub async fn refresh(&self) -> Result<Vec<Appointment>> {
    self.clear()?;
    let session = self.current_session()?;
    Ok(self.populate(session).await)
  }

  /// Clear now and refetch in the background after `delay`. A refresh that
  /// is still pending is replaced.
  ///
  /// Returns whether the refresh could be scheduled.
  pub fn invalidate_and_reschedule(self: &Arc<Self>, delay: std::time::Duration) -> bool {
    if let Err(e) = self.clear() {
      warn!(error = %e, "Failed to clear appointment cache");
    }

    let this = Arc::clone(self);
    self.refresh.schedule(delay, async move {
      if let Err(e) = this.refresh().await {
        warn!(error = %e, "Scheduled appointment refresh failed");
      }
    })
  }

  /// [`Self::invalidate_and_reschedule`] with the configured delay.
  pub fn request_refetch(self: &Arc<Self>) -> bool {
    self.invalidate_and_reschedule(self.options.refetch_delay)
  }

  /// React to a settings write. Only changes to the shop connection
  /// invalidate; returns whether they did.
  pub fn handle_settings_change(self: &Arc<Self>, change: &SettingsChange) -> bool {
    if !change.connection_changed() {
      return false;
    }
    info!("Shop connection settings changed, invalidating appointments");
    if !self.request_refetch() {
      warn!("Could not schedule appointment refresh after settings change");
    }
    true
  }

  /// Apply settings changes until the settings store goes away.
  pub async fn watch_settings(self: Arc<Self>, mut changes: broadcast::Receiver<SettingsChange>) {
    loop {
      match changes.recv().await {
        Ok(change) => {
          self.handle_settings_change(&change);
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          // Missed changes may have touched the connection; be safe.
          warn!(skipped, "Missed settings changes, invalidating");
          self.request_refetch();
        }
        Err(broadcast::error::RecvError::Closed) => break,
      }
    }
  }

  pub fn is_refresh_pending(&self) -> bool {
    self.refresh.is_scheduled()
  }

  /// Drop a pending background refresh, e.g. on shutdown.
  pub fn cancel_pending_refresh(&self) -> bool {
    self.refresh.cancel()
  }
}

fn build_session(settings: &Settings, timeouts: Timeouts) -> Result<Session> {
  Ok(Session {
    client: ShopClient::new(settings, timeouts)?,
    fingerprint: connection_fingerprint(settings),
  })
}
