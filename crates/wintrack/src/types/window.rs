/*! Window, workspace and monitor snapshots. */

use super::{Bounds, ProcessId, WindowId};
use serde::{Deserialize, Serialize};

/// Window-manager state flags of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct WindowState {
  pub minimized: bool,
  pub maximized: bool,
  pub fullscreen: bool,
  /// Window asks not to be shown in pagers / workspace views.
  pub skip_pager: bool,
  /// Window asks not to be shown in task lists / window switchers.
  pub skip_tasklist: bool,
  /// Shown on every workspace.
  pub sticky: bool,
  /// Demands attention.
  pub urgent: bool,
}

/// Actions the window manager allows on a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct WindowActions {
  pub close: bool,
  pub minimize: bool,
  pub maximize: bool,
  #[serde(rename = "move")]
  pub move_: bool,
  pub resize: bool,
  pub change_workspace: bool,
  pub fullscreen: bool,
}

/// A top-level window as last reported by the window manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
  pub id: WindowId,
  /// Owning process. None when the client does not advertise it.
  pub process_id: Option<ProcessId>,
  pub title: String,
  /// Instance part of `WM_CLASS` (usually the executable name).
  pub class_instance: String,
  /// Class part of `WM_CLASS` (usually the capitalised application name).
  pub class_name: String,
  pub bounds: Bounds,
  /// Workspace number. None for windows shown on all workspaces.
  pub workspace: Option<u32>,
  pub state: WindowState,
  pub actions: WindowActions,
  /// Fingerprint of the window icon data. Changes whenever the icon does.
  pub icon_digest: Option<u64>,
  /// Window belongs to the launcher itself.
  #[serde(default)]
  pub is_stage: bool,
}

impl Window {
  /// Instance and class names usable as application hints: non-empty,
  /// deduplicated, instance first.
  pub fn instance_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::with_capacity(2);
    for name in [self.class_instance.as_str(), self.class_name.as_str()] {
      let name = name.trim();
      if !name.is_empty() && !names.contains(&name) {
        names.push(name);
      }
    }
    names
  }

  /// Whether the window is visible on the given workspace.
  pub fn is_on_workspace(&self, number: u32) -> bool {
    self.state.sticky || self.workspace.is_none_or(|ws| ws == number)
  }
}

/// A virtual desktop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Workspace {
  /// 0-based index.
  pub number: u32,
  pub name: String,
}

/// A physical output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Monitor {
  /// 0-based index in the order reported by the display server.
  pub index: u32,
  pub bounds: Bounds,
  pub primary: bool,
}
