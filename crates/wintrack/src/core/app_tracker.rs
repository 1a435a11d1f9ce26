/*!
Application tracker - the running-applications table.

Each desktop ID is either untracked or running with a non-empty window list.
`application:state-changed` is emitted only on the transitions between the
two, never when a running application gains or loses a further window.
*/

use std::collections::HashMap;

use serde::Serialize;

use super::resolve;
use crate::appdb::{AppInfo, ApplicationDatabase};
use crate::platform::ProcessEnvironment;
use crate::types::{DesktopId, Event, ProcessId, Window, WindowId};

/// A running application and the windows attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedApplication {
  pub desktop_id: DesktopId,
  /// Process of the window that started tracking.
  pub process_id: Option<ProcessId>,
  pub app_info: AppInfo,
  /// In the order they were opened. Never empty.
  pub windows: Vec<WindowId>,
}

#[derive(Debug, Default)]
pub(crate) struct ApplicationTracker {
  running: HashMap<DesktopId, TrackedApplication>,
  by_window: HashMap<WindowId, DesktopId>,
}

impl ApplicationTracker {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Resolve a newly opened window and start tracking it.
  pub(crate) fn window_opened(
    &mut self,
    window: &Window,
    environment: &dyn ProcessEnvironment,
    database: &ApplicationDatabase,
  ) -> Option<Event> {
    if window.is_stage {
      return None;
    }
    if self.by_window.contains_key(&window.id) {
      log::debug!("Window {} is already tracked", window.id);
      return None;
    }
    if !database.is_loaded() {
      log::warn!("Application database is not loaded, window {} may stay unresolved", window.id);
    }

    let Some(app) = resolve::resolve_window(window, environment, database) else {
      log::debug!(
        "Window {} ({:?}) not attributed to any application",
        window.id,
        window.instance_names()
      );
      return None;
    };
    self.track(window, app)
  }

  /// Attribute `window` to `app`. Emits on the first window of an application.
  pub(crate) fn track(&mut self, window: &Window, app: AppInfo) -> Option<Event> {
    if self.by_window.contains_key(&window.id) {
      return None;
    }
    let desktop_id = app.desktop_id.clone();
    self.by_window.insert(window.id, desktop_id.clone());

    if let Some(tracked) = self.running.get_mut(&desktop_id) {
      tracked.windows.push(window.id);
      log::debug!(
        "Window {} added to '{desktop_id}' ({} windows)",
        window.id,
        tracked.windows.len()
      );
      return None;
    }

    log::debug!("Application '{desktop_id}' is running");
    self.running.insert(
      desktop_id.clone(),
      TrackedApplication {
        desktop_id: desktop_id.clone(),
        process_id: window.process_id,
        app_info: app,
        windows: vec![window.id],
      },
    );
    Some(Event::ApplicationStateChanged {
      desktop_id,
      running: true,
    })
  }

  /// Forget a closed window. Emits when it was the application's last one.
  pub(crate) fn window_closed(&mut self, id: WindowId) -> Option<Event> {
    let desktop_id = self.by_window.remove(&id)?;
    let tracked = self.running.get_mut(&desktop_id)?;
    tracked.windows.retain(|w| *w != id);
    if !tracked.windows.is_empty() {
      return None;
    }

    self.running.remove(&desktop_id);
    log::debug!("Application '{desktop_id}' stopped");
    Some(Event::ApplicationStateChanged {
      desktop_id,
      running: false,
    })
  }

  // === Queries ===

  pub(crate) fn is_running(&self, desktop_id: &str) -> bool {
    self.running.contains_key(desktop_id)
  }

  pub(crate) fn windows_of(&self, desktop_id: &str) -> &[WindowId] {
    self
      .running
      .get(desktop_id)
      .map(|t| t.windows.as_slice())
      .unwrap_or_default()
  }

  pub(crate) fn desktop_id_for_window(&self, id: WindowId) -> Option<&DesktopId> {
    self.by_window.get(&id)
  }

  /// Sorted by desktop ID.
  pub(crate) fn running_applications(&self) -> Vec<&TrackedApplication> {
    let mut apps: Vec<&TrackedApplication> = self.running.values().collect();
    apps.sort_by(|a, b| a.desktop_id.cmp(&b.desktop_id));
    apps
  }
}
