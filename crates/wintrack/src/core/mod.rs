/*!
Core Tracker instance - owns window and application state and event broadcasting.

# Module Structure

- `mod.rs` - Tracker struct, builder, construction, events
- `window_tracker.rs` - cached window-manager state and snapshot diffing
- `app_tracker.rs` - running-applications table
- `resolve.rs` - window-to-application resolution strategies
- `sync.rs` - `refresh()`, `dispatch_pending()`, `reload_applications()`
- `queries.rs` - read-only pass-throughs to both trackers
- `timestamps.rs` - `current_time()` fallback chain

# Example

```no_run
use wintrack::{ApplicationDatabase, Tracker, X11WindowSystem};

let system = X11WindowSystem::connect(None)?;
let tracker = Tracker::builder(system)
  .application_database(ApplicationDatabase::system())
  .stage_pid(std::process::id())
  .build()?;

for app in tracker.get_running_applications() {
  println!("{} has {} windows", app.desktop_id, app.windows.len());
}

let mut events = tracker.subscribe();
while let Ok(event) = events.try_recv() {
  // handle event
}
# Ok::<(), wintrack::TrackerError>(())
```
*/

mod app_tracker;
mod queries;
mod resolve;
mod sync;
mod timestamps;
mod window_tracker;

pub use app_tracker::TrackedApplication;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_broadcast::{InactiveReceiver, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::appdb::ApplicationDatabase;
use crate::config::TrackerConfig;
use crate::platform::{ProcFs, ProcessEnvironment, TimestampSource, WindowSystem};
use crate::polling::{self, PollingConfig, PollingHandle};
use crate::types::{Event, ProcessId, TrackerError, TrackerResult};
use app_tracker::ApplicationTracker;
use window_tracker::WindowTracker;

/// Both trackers, mutated together under one lock.
#[derive(Debug)]
pub(crate) struct State {
  pub(crate) windows: WindowTracker,
  pub(crate) apps: ApplicationTracker,
}

pub(crate) struct TrackerInner {
  system: Box<dyn WindowSystem>,
  environment: Box<dyn ProcessEnvironment>,
  database: ApplicationDatabase,
  state: RwLock<State>,
  /// Held from snapshot to emission so snapshots are applied in order.
  refresh_lock: Mutex<()>,
  toolkit_times: Mutex<BTreeMap<TimestampSource, u32>>,
  events_tx: Sender<Event>,
  events_keepalive: InactiveReceiver<Event>,
  polling: Mutex<Option<PollingHandle>>,
  shut_down: AtomicBool,
  /// Events evicted from a full channel.
  dropped_events: AtomicU64,
}

/// Main Tracker instance - owns state, event broadcasting, and polling.
///
/// Polling (if enabled) starts when built and stops on [`shutdown`](Self::shutdown)
/// or when the last clone is dropped.
/// Clone is cheap (Arc bump) - share freely across threads.
#[derive(Clone)]
pub struct Tracker {
  pub(crate) inner: Arc<TrackerInner>,
}

impl std::fmt::Debug for Tracker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Tracker").finish_non_exhaustive()
  }
}

/// Builder for configuring a Tracker instance.
///
/// # Example
///
/// ```ignore
/// let tracker = Tracker::builder(system)
///     .stage_pid(std::process::id())
///     .poll_interval_ms(100)
///     .build()?;
/// ```
#[must_use = "Builder does nothing until .build() is called"]
pub struct TrackerBuilder {
  system: Box<dyn WindowSystem>,
  database: Option<ApplicationDatabase>,
  environment: Option<Box<dyn ProcessEnvironment>>,
  config: TrackerConfig,
}

impl std::fmt::Debug for TrackerBuilder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TrackerBuilder")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl TrackerBuilder {
  /// Use this catalog instead of the configured application directories.
  /// Loaded on build if it is not loaded yet.
  pub fn application_database(mut self, database: ApplicationDatabase) -> Self {
    self.database = Some(database);
    self
  }

  /// Where launch environments are read from. Default: procfs at the
  /// configured `proc_root`.
  pub fn process_environment(mut self, environment: impl ProcessEnvironment) -> Self {
    self.environment = Some(Box::new(environment));
    self
  }

  /// Process owning the launcher's own windows. They are flagged
  /// `is_stage` and never attributed to an application.
  pub fn stage_pid(mut self, pid: u32) -> Self {
    self.config.stage_pid = Some(ProcessId(pid));
    self
  }

  /// Capacity of the event channel. Default: 1000.
  pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
    self.config.event_channel_capacity = capacity;
    self
  }

  /// Set polling interval in milliseconds. `0` disables the polling thread.
  /// Default: 250ms.
  pub fn poll_interval_ms(mut self, ms: u64) -> Self {
    self.config.poll_interval_ms = ms;
    self
  }

  /// Rescan the catalog every `cycles` polls. `0` disables rescans.
  pub fn catalog_rescan_cycles(mut self, cycles: u64) -> Self {
    self.config.catalog_rescan_cycles = cycles;
    self
  }

  /// Replace every setting at once.
  pub fn config(mut self, config: TrackerConfig) -> Self {
    self.config = config;
    self
  }

  /// Build the Tracker: load the catalog if needed, take the first snapshot
  /// and start polling.
  ///
  /// Fails if the configuration is invalid or the first snapshot cannot be
  /// read. A catalog that cannot be loaded is only a warning.
  #[must_use = "Tracker instance must be stored to keep polling active"]
  pub fn build(self) -> TrackerResult<Tracker> {
    let Self {
      system,
      database,
      environment,
      config,
    } = self;

    if config.event_channel_capacity == 0 {
      return Err(TrackerError::Config(
        "event_channel_capacity must be at least 1".to_owned(),
      ));
    }

    let database = database.unwrap_or_else(|| {
      if config.application_dirs.is_empty() {
        ApplicationDatabase::system()
      } else {
        ApplicationDatabase::new(config.application_dirs.iter().cloned())
      }
    });
    if !database.is_loaded() {
      if let Err(e) = database.load() {
        log::warn!("Application catalog unavailable: {e}");
      }
    }
    let environment = environment.unwrap_or_else(|| Box::new(ProcFs::new(config.proc_root.clone())));

    let (mut tx, rx) = async_broadcast::broadcast(config.event_channel_capacity);
    tx.set_overflow(true); // Drop oldest messages when full

    let tracker = Tracker {
      inner: Arc::new(TrackerInner {
        system,
        environment,
        database,
        state: RwLock::new(State {
          windows: WindowTracker::new(config.stage_pid),
          apps: ApplicationTracker::new(),
        }),
        refresh_lock: Mutex::new(()),
        toolkit_times: Mutex::new(BTreeMap::new()),
        events_tx: tx,
        events_keepalive: rx.deactivate(),
        polling: Mutex::new(None),
        shut_down: AtomicBool::new(false),
        dropped_events: AtomicU64::new(0),
      }),
    };

    tracker.refresh()?;

    if config.poll_interval_ms > 0 {
      let handle = polling::start_polling(
        Arc::downgrade(&tracker.inner),
        PollingConfig {
          interval_ms: config.poll_interval_ms,
          catalog_rescan_cycles: config.catalog_rescan_cycles,
        },
      );
      *tracker.inner.polling.lock() = Some(handle);
    }

    Ok(tracker)
  }
}

impl Tracker {
  /// Create a builder around a window system.
  pub fn builder(system: impl WindowSystem) -> TrackerBuilder {
    TrackerBuilder {
      system: Box::new(system),
      database: None,
      environment: None,
      config: TrackerConfig::default(),
    }
  }

  /// Subscribe to events from this instance.
  ///
  /// The receiver sees events emitted after this call only.
  pub fn subscribe(&self) -> Receiver<Event> {
    self.inner.events_keepalive.activate_cloned()
  }

  pub fn application_database(&self) -> &ApplicationDatabase {
    &self.inner.database
  }

  /// Stop polling and wait for the polling thread. Idempotent. Queries keep
  /// answering from the last state; refreshes fail with `ShutDown`.
  pub fn shutdown(&self) {
    if self.inner.shut_down.swap(true, Ordering::SeqCst) {
      return;
    }
    let handle = self.inner.polling.lock().take();
    drop(handle);
    log::debug!("Tracker shut down");
  }

  pub fn is_shut_down(&self) -> bool {
    self.inner.shut_down.load(Ordering::SeqCst)
  }

  /// Number of events dropped because a subscriber fell a full channel
  /// behind. Those subscribers see `Overflowed` on their next receive.
  pub fn dropped_events(&self) -> u64 {
    self.inner.dropped_events.load(Ordering::Relaxed)
  }

  pub(crate) fn emit(&self, event: Event) {
    match self.inner.events_tx.try_broadcast(event) {
      Ok(None) => {}
      Ok(Some(evicted)) => {
        let dropped = self.inner.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
        log::error!(
          "Event channel overflow - dropped {evicted:?} ({dropped} dropped so far). \
           Consider increasing event_channel_capacity or processing events faster."
        );
      }
      // No active subscribers.
      Err(e) => log::trace!("Event not delivered: {e}"),
    }
  }

  /// Read state. Never call platform functions inside the closure.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
    f(&self.inner.state.read())
  }

  /// Write state.
  #[inline]
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
    f(&mut self.inner.state.write())
  }
}
