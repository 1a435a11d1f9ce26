/*!
Read-only queries. These answer from cached state and never call the window
system; results are clones, so no lock is held once they return.
*/

use super::{TrackedApplication, Tracker};
use crate::appdb::AppInfo;
use crate::types::{DesktopId, Monitor, TrackerResult, Window, WindowId, Workspace};

impl Tracker {
  // === Windows ===

  /// All windows in creation order.
  pub fn get_windows(&self) -> Vec<Window> {
    self.read(|s| s.windows.windows().to_vec())
  }

  /// All windows in stacking order, bottom to top.
  pub fn get_windows_stacked(&self) -> Vec<Window> {
    self.read(|s| s.windows.windows_stacked().into_iter().cloned().collect())
  }

  pub fn get_window(&self, id: WindowId) -> Option<Window> {
    self.read(|s| s.windows.window(id).cloned())
  }

  /// Windows shown on a workspace, sticky windows included.
  pub fn get_windows_on_workspace(&self, number: u32) -> TrackerResult<Vec<Window>> {
    self.read(|s| {
      s.windows
        .windows_on_workspace(number)
        .map(|windows| windows.into_iter().cloned().collect())
    })
  }

  pub fn get_active_window(&self) -> Option<Window> {
    self.read(|s| s.windows.active_window().cloned())
  }

  // === Workspaces ===

  pub fn get_active_workspace(&self) -> Option<Workspace> {
    self.read(|s| s.windows.active_workspace().cloned())
  }

  /// Ordered by number.
  pub fn get_workspaces(&self) -> Vec<Workspace> {
    self.read(|s| s.windows.workspaces().to_vec())
  }

  pub fn get_workspaces_count(&self) -> u32 {
    self.read(|s| s.windows.workspaces_count())
  }

  /// Fails with `WorkspaceOutOfRange` unless `0 <= number < count`.
  pub fn get_workspace_by_number(&self, number: u32) -> TrackerResult<Workspace> {
    self.read(|s| s.windows.workspace_by_number(number).cloned())
  }

  // === Monitors ===

  pub fn get_monitors(&self) -> Vec<Monitor> {
    self.read(|s| s.windows.monitors().to_vec())
  }

  pub fn get_primary_monitor(&self) -> Option<Monitor> {
    self.read(|s| s.windows.primary_monitor().cloned())
  }

  pub fn get_monitor_by_number(&self, number: u32) -> TrackerResult<Monitor> {
    self.read(|s| s.windows.monitor_by_number(number).cloned())
  }

  /// Monitor showing the centre of a window, falling back to the primary.
  pub fn get_monitor_for_window(&self, id: WindowId) -> TrackerResult<Option<Monitor>> {
    self.read(|s| s.windows.monitor_for_window(id).map(|m| m.cloned()))
  }

  // === Applications ===

  pub fn is_running_by_desktop_id(&self, desktop_id: &str) -> bool {
    self.read(|s| s.apps.is_running(desktop_id))
  }

  pub fn is_running_by_app_info(&self, app_info: &AppInfo) -> bool {
    self.is_running_by_desktop_id(app_info.desktop_id.as_str())
  }

  /// Windows attributed to an application, in the order they opened.
  /// Empty if it is not running.
  pub fn get_window_list_by_desktop_id(&self, desktop_id: &str) -> Vec<Window> {
    self.read(|s| {
      s.apps
        .windows_of(desktop_id)
        .iter()
        .filter_map(|id| s.windows.window(*id).cloned())
        .collect()
    })
  }

  /// Running applications sorted by desktop ID.
  pub fn get_running_applications(&self) -> Vec<TrackedApplication> {
    self.read(|s| s.apps.running_applications().into_iter().cloned().collect())
  }

  pub fn get_desktop_id_for_window(&self, id: WindowId) -> Option<DesktopId> {
    self.read(|s| s.apps.desktop_id_for_window(id).cloned())
  }
}
