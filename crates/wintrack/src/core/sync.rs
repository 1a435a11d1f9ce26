/*!
Bringing cached state up to date with the window system and the catalog.
*/

use std::sync::atomic::Ordering;

use super::Tracker;
use crate::appdb::CatalogChanges;
use crate::types::{Event, TrackerError, TrackerResult};

impl Tracker {
  /// Take a snapshot, diff it against the cache, attribute new windows and
  /// emit the resulting events.
  ///
  /// On error the cached state is left untouched.
  pub fn refresh(&self) -> TrackerResult<()> {
    self.ensure_running()?;
    let _ordered = self.inner.refresh_lock.lock();

    let snapshot = self.inner.system.snapshot()?;
    let events = self.write(|state| {
      let mut events = Vec::new();
      for event in state.windows.apply(snapshot) {
        let follow_up = match &event {
          Event::WindowOpened { window } => {
            state
              .apps
              .window_opened(window, self.inner.environment.as_ref(), &self.inner.database)
          }
          Event::WindowClosed { window } => state.apps.window_closed(window.id),
          _ => None,
        };
        events.push(event);
        events.extend(follow_up);
      }
      events
    });

    if !events.is_empty() {
      log::trace!("Refresh produced {} events", events.len());
    }
    for event in events {
      self.emit(event);
    }
    Ok(())
  }

  /// Refresh only if the window system reports pending changes. Returns
  /// whether a refresh happened.
  pub fn dispatch_pending(&self) -> TrackerResult<bool> {
    self.ensure_running()?;
    if !self.inner.system.poll_changes() {
      return Ok(false);
    }
    self.refresh()?;
    Ok(true)
  }

  /// Rescan the application catalog and announce what changed.
  ///
  /// Running applications keep their cached metadata.
  pub fn reload_applications(&self) -> TrackerResult<CatalogChanges> {
    self.ensure_running()?;
    let changes = self.inner.database.reload()?;
    if changes.is_empty() {
      return Ok(changes);
    }

    log::info!(
      "Application catalog changed: {} added, {} removed",
      changes.added.len(),
      changes.removed.len()
    );
    for desktop_id in &changes.added {
      self.emit(Event::ApplicationAdded {
        desktop_id: desktop_id.clone(),
      });
    }
    for desktop_id in &changes.removed {
      self.emit(Event::ApplicationRemoved {
        desktop_id: desktop_id.clone(),
      });
    }
    self.emit(Event::MenuReloadRequired);
    Ok(changes)
  }

  fn ensure_running(&self) -> TrackerResult<()> {
    if self.inner.shut_down.load(Ordering::SeqCst) {
      return Err(TrackerError::ShutDown);
    }
    Ok(())
  }
}
