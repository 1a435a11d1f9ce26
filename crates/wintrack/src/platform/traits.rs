/*!
Platform abstraction traits.

These traits define the contract between core code and the native window
system. Backends (e.g. X11) implement them; core code only uses the traits,
never backend types directly.
*/

use std::io;
use std::path::PathBuf;

use serde::Serialize;

use crate::types::{Monitor, ProcessId, TrackerResult, Window, WindowId, Workspace};

/// Everything the window manager reports at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenSnapshot {
  /// Managed windows in creation order.
  pub windows: Vec<Window>,
  /// Window IDs in stacking order, bottom to top.
  pub stacking: Vec<WindowId>,
  /// Workspaces ordered by number.
  pub workspaces: Vec<Workspace>,
  pub active_window: Option<WindowId>,
  pub active_workspace: Option<u32>,
  pub monitors: Vec<Monitor>,
}

/// Where an X11 timestamp can come from, in the order they are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampSource {
  /// Most recent input event seen by the embedding UI toolkit.
  ToolkitEvent,
  /// Most recent event seen by a second toolkit sharing the display.
  SecondaryToolkitEvent,
  /// Last user-interaction time known to the display server.
  UserTime,
  /// Most recent event the backend itself received.
  NativeEvent,
  /// Server time obtained by a round-trip on a backend-owned window.
  ServerTime,
}

impl TimestampSource {
  /// All sources in consultation order.
  pub const ALL: [Self; 5] = [
    Self::ToolkitEvent,
    Self::SecondaryToolkitEvent,
    Self::UserTime,
    Self::NativeEvent,
    Self::ServerTime,
  ];

  /// Sources answered by the embedding application rather than the backend.
  pub const fn is_toolkit(self) -> bool {
    matches!(self, Self::ToolkitEvent | Self::SecondaryToolkitEvent)
  }
}

/// The native window manager / display server.
pub trait WindowSystem: Send + Sync + 'static {
  /// Read the complete current state.
  fn snapshot(&self) -> TrackerResult<ScreenSnapshot>;

  /// Drain native notifications. Returns true if anything may have changed
  /// since the last snapshot.
  fn poll_changes(&self) -> bool {
    true
  }

  /// Probe one backend timestamp source. `None` (or 0) means unavailable.
  fn timestamp(&self, source: TimestampSource) -> Option<u32> {
    let _ = source;
    None
  }
}

/// Access to the launch environment of other processes.
pub trait ProcessEnvironment: Send + Sync + 'static {
  /// Raw NUL-separated `KEY=VALUE` block the process was started with.
  fn read_environ(&self, pid: ProcessId) -> io::Result<Vec<u8>>;
}

/// Reads `<root>/<pid>/environ` from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
  root: PathBuf,
}

impl ProcFs {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl Default for ProcFs {
  fn default() -> Self {
    Self::new("/proc")
  }
}

impl ProcessEnvironment for ProcFs {
  fn read_environ(&self, pid: ProcessId) -> io::Result<Vec<u8>> {
    std::fs::read(self.root.join(pid.0.to_string()).join("environ"))
  }
}
