/*!
Internal polling implementation.

Drives `dispatch_pending` on a background thread and periodically rescans the
application catalog. Consumers don't interact with this directly - polling is
owned by `Tracker`.

The thread only holds a weak reference, so dropping the last `Tracker` ends it.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::{Tracker, TrackerInner};

/// Handle to control polling lifetime. Stops on drop.
pub(crate) struct PollingHandle {
  stop_signal: Arc<AtomicBool>,
  thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PollingHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PollingHandle").finish_non_exhaustive()
  }
}

impl PollingHandle {
  fn stop(&self) {
    self.stop_signal.store(true, Ordering::SeqCst);
  }
}

impl Drop for PollingHandle {
  fn drop(&mut self) {
    self.stop();
    if let Some(t) = self.thread.take() {
      // The last Tracker can be released by the polling thread itself.
      if t.thread().id() != thread::current().id() {
        drop(t.join());
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollingConfig {
  pub(crate) interval_ms: u64,
  /// `0` disables catalog rescans.
  pub(crate) catalog_rescan_cycles: u64,
}

pub(crate) fn start_polling(tracker: Weak<TrackerInner>, config: PollingConfig) -> PollingHandle {
  let stop_signal = Arc::new(AtomicBool::new(false));
  let stop_signal_clone = Arc::clone(&stop_signal);

  let spawned = thread::Builder::new()
    .name("wintrack-poll".to_owned())
    .spawn(move || {
      let mut cycle: u64 = 0;
      while !stop_signal_clone.load(Ordering::SeqCst) {
        let loop_start = Instant::now();

        let Some(inner) = tracker.upgrade() else {
          break;
        };
        cycle = cycle.wrapping_add(1);
        poll_iteration(&Tracker { inner }, &config, cycle);

        let elapsed = loop_start.elapsed();
        let target = Duration::from_millis(config.interval_ms);
        if elapsed < target {
          thread::sleep(target - elapsed);
        }
      }
      log::debug!("Polling stopped");
    });

  let thread = match spawned {
    Ok(thread) => Some(thread),
    Err(e) => {
      log::error!("Cannot start polling thread: {e}");
      None
    }
  };

  PollingHandle { stop_signal, thread }
}

fn poll_iteration(tracker: &Tracker, config: &PollingConfig, cycle: u64) {
  if let Err(e) = tracker.dispatch_pending() {
    log::warn!("Window refresh failed: {e}");
  }
  if rescan_due(config, cycle) {
    if let Err(e) = tracker.reload_applications() {
      log::warn!("Application catalog rescan failed: {e}");
    }
  }
}

fn rescan_due(config: &PollingConfig, cycle: u64) -> bool {
  config.catalog_rescan_cycles > 0 && cycle % config.catalog_rescan_cycles == 0
}
