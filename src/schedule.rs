//! One-shot deferred tasks with debounce semantics.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Holds at most one pending task. Scheduling again replaces the pending
/// task instead of adding a second one.
pub struct Debouncer {
  name: &'static str,
  pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      pending: Mutex::new(None),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    self.pending.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Run `task` once after `delay`, cancelling whatever was pending.
  ///
  /// Returns `false` if there is no runtime to schedule on.
  pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let Ok(runtime) = Handle::try_current() else {
      warn!(hook = self.name, "No async runtime, cannot schedule");
      return false;
    };

    let mut pending = self.lock();
    if let Some(previous) = pending.take() {
      if !previous.is_finished() {
        debug!(hook = self.name, "Replacing pending run");
      }
      previous.abort();
    }

    let name = self.name;
    *pending = Some(runtime.spawn(async move {
      tokio::time::sleep(delay).await;
      debug!(hook = name, "Firing");
      task.await;
    }));
    debug!(hook = self.name, delay_secs = delay.as_secs_f64(), "Scheduled");
    true
  }

  /// Cancel the pending task, if any. Returns whether one was pending.
  pub fn cancel(&self) -> bool {
    match self.lock().take() {
      Some(handle) => {
        let was_pending = !handle.is_finished();
        handle.abort();
        was_pending
      }
      None => false,
    }
  }

  pub fn is_scheduled(&self) -> bool {
    self.lock().as_ref().is_some_and(|h| !h.is_finished())
  }
}
