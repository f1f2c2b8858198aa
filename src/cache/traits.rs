//! The key-value contract the appointment cache is built on.

use chrono::Duration;
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};

/// A store of values that expire after a time-to-live ("transients").
///
/// Expiry is checked when reading: an expired entry reads as absent.
pub trait TransientStore: Send + Sync {
  /// Value under `key`, or `None` when absent or expired.
  fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

  /// Store `value` under `key` for `ttl`, replacing any previous value.
  fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

  /// Remove `key`. Removing an absent key is not an error.
  fn delete(&self, key: &str) -> Result<()>;
}
