/*! Test doubles for the platform traits, plus fixture builders. */

use std::collections::HashMap;
use std::fmt::Display;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::platform::{ProcessEnvironment, ScreenSnapshot, TimestampSource, WindowSystem};
use crate::types::{
  Bounds, Monitor, ProcessId, TrackerError, TrackerResult, Window, WindowActions, WindowId,
  WindowState, Workspace,
};

#[derive(Debug, Default)]
struct Script {
  snapshot: ScreenSnapshot,
  pending: bool,
  fail_next: bool,
  snapshots_taken: usize,
  timestamps: HashMap<TimestampSource, u32>,
  probed: Vec<TimestampSource>,
}

/// A `WindowSystem` whose state the test sets directly. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedSystem {
  script: Arc<Mutex<Script>>,
}

impl ScriptedSystem {
  pub(crate) fn new(snapshot: ScreenSnapshot) -> Self {
    let system = Self::default();
    system.set(snapshot);
    system
  }

  /// Replace the reported state and mark changes as pending.
  pub(crate) fn set(&self, snapshot: ScreenSnapshot) {
    let mut script = self.script.lock();
    script.snapshot = snapshot;
    script.pending = true;
  }

  pub(crate) fn update(&self, f: impl FnOnce(&mut ScreenSnapshot)) {
    let mut script = self.script.lock();
    f(&mut script.snapshot);
    script.pending = true;
  }

  pub(crate) fn fail_next_snapshot(&self) {
    self.script.lock().fail_next = true;
  }

  pub(crate) fn set_timestamp(&self, source: TimestampSource, time: u32) {
    self.script.lock().timestamps.insert(source, time);
  }

  pub(crate) fn snapshots_taken(&self) -> usize {
    self.script.lock().snapshots_taken
  }

  /// Backend timestamp sources asked so far, in order.
  pub(crate) fn probed(&self) -> Vec<TimestampSource> {
    self.script.lock().probed.clone()
  }
}

impl WindowSystem for ScriptedSystem {
  fn snapshot(&self) -> TrackerResult<ScreenSnapshot> {
    let mut script = self.script.lock();
    script.snapshots_taken += 1;
    if std::mem::take(&mut script.fail_next) {
      return Err(TrackerError::Protocol("scripted failure".to_owned()));
    }
    Ok(script.snapshot.clone())
  }

  fn poll_changes(&self) -> bool {
    std::mem::take(&mut self.script.lock().pending)
  }

  fn timestamp(&self, source: TimestampSource) -> Option<u32> {
    let mut script = self.script.lock();
    script.probed.push(source);
    script.timestamps.get(&source).copied()
  }
}

/// In-memory process environments keyed by PID.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryEnvironment {
  environs: Arc<Mutex<HashMap<ProcessId, io::Result<Vec<u8>>>>>,
}

impl MemoryEnvironment {
  /// Environment built from `KEY=VALUE` pairs.
  pub(crate) fn with<K: Display, V: Display>(self, pid: u32, vars: &[(K, V)]) -> Self {
    let mut raw = Vec::new();
    for (key, value) in vars {
      raw.extend_from_slice(format!("{key}={value}").as_bytes());
      raw.push(0);
    }
    self.with_raw(pid, raw)
  }

  pub(crate) fn with_raw(self, pid: u32, raw: impl Into<Vec<u8>>) -> Self {
    self.environs.lock().insert(ProcessId(pid), Ok(raw.into()));
    self
  }

  pub(crate) fn with_error(self, pid: u32, kind: io::ErrorKind) -> Self {
    self.environs.lock().insert(ProcessId(pid), Err(kind.into()));
    self
  }
}

impl ProcessEnvironment for MemoryEnvironment {
  fn read_environ(&self, pid: ProcessId) -> io::Result<Vec<u8>> {
    match self.environs.lock().get(&pid) {
      Some(Ok(raw)) => Ok(raw.clone()),
      Some(Err(e)) => Err(e.kind().into()),
      None => Err(io::ErrorKind::NotFound.into()),
    }
  }
}

/// Launch environment of a process started from a desktop file.
pub(crate) fn launched_from(path: &str, pid: u32) -> [(&str, String); 2] {
  [
    ("GIO_LAUNCHED_DESKTOP_FILE", path.to_owned()),
    ("GIO_LAUNCHED_DESKTOP_FILE_PID", pid.to_string()),
  ]
}

pub(crate) fn window(id: u32, pid: Option<u32>, instance: &str, class: &str) -> Window {
  Window {
    id: WindowId(id),
    process_id: pid.map(ProcessId),
    title: format!("{class} {id}"),
    class_instance: instance.to_owned(),
    class_name: class.to_owned(),
    bounds: Bounds::new(0, 0, 640, 480),
    workspace: Some(0),
    state: WindowState::default(),
    actions: WindowActions::default(),
    icon_digest: None,
    is_stage: false,
  }
}

pub(crate) fn workspaces(count: u32) -> Vec<Workspace> {
  (0..count)
    .map(|number| Workspace {
      number,
      name: format!("Workspace {}", number + 1),
    })
    .collect()
}

pub(crate) fn monitor(index: u32, bounds: Bounds, primary: bool) -> Monitor {
  Monitor {
    index,
    bounds,
    primary,
  }
}

/// Snapshot with the given windows stacked in order on two workspaces and
/// one 1920x1080 monitor.
pub(crate) fn screen(windows: Vec<Window>) -> ScreenSnapshot {
  ScreenSnapshot {
    stacking: windows.iter().map(|w| w.id).collect(),
    windows,
    workspaces: workspaces(2),
    active_window: None,
    active_workspace: Some(0),
    monitors: vec![monitor(0, Bounds::new(0, 0, 1920, 1080), true)],
  }
}
