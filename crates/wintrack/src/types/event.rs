/*! Events emitted when tracked state changes. */

use super::{DesktopId, Monitor, Window, WindowId, Workspace};
use serde::Serialize;

/// Events emitted when state changes.
///
/// Window-lifecycle events are always emitted before the application events
/// they cause, so a consumer sees `window:opened` before the matching
/// `application:state-changed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
  // Window lifecycle
  #[serde(rename = "window:opened")]
  WindowOpened { window: Window },
  #[serde(rename = "window:closed")]
  WindowClosed { window: Window },

  // Per-window changes
  #[serde(rename = "window:name-changed")]
  WindowNameChanged { window: Window },
  #[serde(rename = "window:geometry-changed")]
  WindowGeometryChanged { window: Window },
  #[serde(rename = "window:state-changed")]
  WindowStateChanged { window: Window },
  #[serde(rename = "window:actions-changed")]
  WindowActionsChanged { window: Window },
  #[serde(rename = "window:icon-changed")]
  WindowIconChanged { window: Window },
  #[serde(rename = "window:workspace-changed")]
  WindowWorkspaceChanged {
    window: Window,
    previous: Option<u32>,
  },

  #[serde(rename = "window:stacking-changed")]
  StackingChanged,

  #[serde(rename = "window:active-changed")]
  ActiveWindowChanged {
    previous: Option<WindowId>,
    current: Option<WindowId>,
  },

  // Workspaces
  #[serde(rename = "workspace:added")]
  WorkspaceAdded { workspace: Workspace },
  #[serde(rename = "workspace:removed")]
  WorkspaceRemoved { workspace: Workspace },
  #[serde(rename = "workspace:name-changed")]
  WorkspaceNameChanged { workspace: Workspace },
  #[serde(rename = "workspace:active-changed")]
  ActiveWorkspaceChanged {
    previous: Option<u32>,
    current: Option<u32>,
  },

  // Monitors
  #[serde(rename = "monitor:added")]
  MonitorAdded { monitor: Monitor },
  #[serde(rename = "monitor:removed")]
  MonitorRemoved { monitor: Monitor },
  #[serde(rename = "monitor:geometry-changed")]
  MonitorGeometryChanged { monitor: Monitor },
  #[serde(rename = "monitor:primary-changed")]
  PrimaryMonitorChanged {
    previous: Option<u32>,
    current: Option<u32>,
  },

  // Applications
  #[serde(rename = "application:state-changed")]
  ApplicationStateChanged { desktop_id: DesktopId, running: bool },
  #[serde(rename = "application:added")]
  ApplicationAdded { desktop_id: DesktopId },
  #[serde(rename = "application:removed")]
  ApplicationRemoved { desktop_id: DesktopId },
  #[serde(rename = "application:menu-reload-required")]
  MenuReloadRequired,
}

impl Event {
  /// Desktop ID an application event is keyed by.
  ///
  /// Lets a consumer listen to the state of one application only:
  ///
  /// ```
  /// use wintrack::{DesktopId, Event};
  ///
  /// let event = Event::ApplicationStateChanged {
  ///   desktop_id: DesktopId::from("foo.desktop"),
  ///   running: true,
  /// };
  /// assert!(event.desktop_id().is_some_and(|id| id == "foo.desktop"));
  /// assert_eq!(Event::StackingChanged.desktop_id(), None);
  /// ```
  pub const fn desktop_id(&self) -> Option<&DesktopId> {
    match self {
      Self::ApplicationStateChanged { desktop_id, .. }
      | Self::ApplicationAdded { desktop_id }
      | Self::ApplicationRemoved { desktop_id } => Some(desktop_id),
      _ => None,
    }
  }

  /// Window a window event refers to.
  pub const fn window(&self) -> Option<&Window> {
    match self {
      Self::WindowOpened { window }
      | Self::WindowClosed { window }
      | Self::WindowNameChanged { window }
      | Self::WindowGeometryChanged { window }
      | Self::WindowStateChanged { window }
      | Self::WindowActionsChanged { window }
      | Self::WindowIconChanged { window }
      | Self::WindowWorkspaceChanged { window, .. } => Some(window),
      _ => None,
    }
  }
}
