/*!
X11 / EWMH window system backend.

Reads the window manager's root-window properties (`_NET_CLIENT_LIST`,
`_NET_CURRENT_DESKTOP`, ...) and per-client properties to build snapshots.
Property and structure notifications on the root window and on every managed
client mark the backend dirty; `poll_changes` drains them without blocking.

A failed root-window read fails the whole snapshot. Clients that disappear
while being read are left out of it.
*/

mod mapping;

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
  Atom, AtomEnum, ChangeWindowAttributesAux, ConnectionExt as _, CreateWindowAux, EventMask,
  GetPropertyReply, PropMode, Window as XWindow, WindowClass,
};
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{ScreenSnapshot, TimestampSource, WindowSystem};
use crate::types::{Bounds, Monitor, ProcessId, TrackerError, TrackerResult, Window, WindowId, Workspace};
use mapping::{ActionAtoms, MonitorRect, StateAtoms};

/// How long a server-time round trip may take before the tier gives up.
const SERVER_TIME_TIMEOUT: Duration = Duration::from_millis(200);
const SERVER_TIME_POLL: Duration = Duration::from_millis(1);

atom_manager! {
  Atoms: AtomsCookie {
    UTF8_STRING,
    WM_CLASS,
    WM_NAME,
    _NET_CLIENT_LIST,
    _NET_CLIENT_LIST_STACKING,
    _NET_ACTIVE_WINDOW,
    _NET_NUMBER_OF_DESKTOPS,
    _NET_CURRENT_DESKTOP,
    _NET_DESKTOP_NAMES,
    _NET_WM_NAME,
    _NET_WM_PID,
    _NET_WM_DESKTOP,
    _NET_WM_ICON,
    _NET_WM_USER_TIME,
    _NET_WM_USER_TIME_WINDOW,
    _NET_WM_STATE,
    _NET_WM_STATE_HIDDEN,
    _NET_WM_STATE_MAXIMIZED_VERT,
    _NET_WM_STATE_MAXIMIZED_HORZ,
    _NET_WM_STATE_FULLSCREEN,
    _NET_WM_STATE_SKIP_PAGER,
    _NET_WM_STATE_SKIP_TASKBAR,
    _NET_WM_STATE_STICKY,
    _NET_WM_STATE_DEMANDS_ATTENTION,
    _NET_WM_ALLOWED_ACTIONS,
    _NET_WM_ACTION_CLOSE,
    _NET_WM_ACTION_MINIMIZE,
    _NET_WM_ACTION_MAXIMIZE_HORZ,
    _NET_WM_ACTION_MAXIMIZE_VERT,
    _NET_WM_ACTION_MOVE,
    _NET_WM_ACTION_RESIZE,
    _NET_WM_ACTION_CHANGE_DESKTOP,
    _NET_WM_ACTION_FULLSCREEN,
    _WINTRACK_TIMESTAMP_PROBE,
  }
}

#[derive(Debug, Default)]
struct EventState {
  /// Time stamp of the most recent timed event received.
  last_event_time: u32,
  /// Time of the latest notify on the probe window, whoever drained it.
  probe_time: Option<u32>,
  /// Events arrived since the last `poll_changes`.
  dirty: bool,
  /// Clients we selected property/structure notifications on.
  watched: HashSet<XWindow>,
}

impl EventState {
  fn record(&mut self, event: &XEvent, probe_window: XWindow) {
    match event {
      XEvent::PropertyNotify(e) => {
        self.last_event_time = e.time;
        if e.window == probe_window {
          self.probe_time = Some(e.time);
        } else {
          self.dirty = true;
        }
      }
      XEvent::ConfigureNotify(_)
      | XEvent::DestroyNotify(_)
      | XEvent::MapNotify(_)
      | XEvent::UnmapNotify(_) => self.dirty = true,
      XEvent::Error(e) => log::trace!("Ignoring X error: {e:?}"),
      _ => {}
    }
  }
}

/// Poll `check` every `interval` until it yields a value or `timeout` passes.
fn wait_for<T>(timeout: Duration, interval: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
  let deadline = Instant::now() + timeout;
  loop {
    if let Some(value) = check() {
      return Some(value);
    }
    if Instant::now() >= deadline {
      return None;
    }
    thread::sleep(interval);
  }
}

/// Window system backed by an X11 connection and an EWMH window manager.
pub struct X11WindowSystem {
  conn: RustConnection,
  root: XWindow,
  screen_size: (u16, u16),
  atoms: Atoms,
  state_atoms: StateAtoms,
  action_atoms: ActionAtoms,
  /// Unmapped helper window used for server-time round trips.
  probe_window: XWindow,
  events: Mutex<EventState>,
  /// Held while reading events off the connection.
  drain: Mutex<()>,
}

impl std::fmt::Debug for X11WindowSystem {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("X11WindowSystem")
      .field("root", &self.root)
      .finish_non_exhaustive()
  }
}

fn protocol_error(err: impl std::fmt::Display) -> TrackerError {
  TrackerError::Protocol(err.to_string())
}

impl X11WindowSystem {
  /// Connect to `display` (or `$DISPLAY` when None) and subscribe to root
  /// window notifications.
  pub fn connect(display: Option<&str>) -> TrackerResult<Self> {
    let (conn, screen_num) =
      x11rb::connect(display).map_err(|e| TrackerError::Connection(e.to_string()))?;

    let (root, screen_size) = {
      let screen = conn.setup().roots.get(screen_num).ok_or_else(|| {
        TrackerError::Connection(format!("screen {screen_num} not present"))
      })?;
      (
        screen.root,
        (screen.width_in_pixels, screen.height_in_pixels),
      )
    };

    let atoms = Atoms::new(&conn)
      .map_err(protocol_error)?
      .reply()
      .map_err(protocol_error)?;

    conn
      .change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new()
          .event_mask(EventMask::PROPERTY_CHANGE | EventMask::SUBSTRUCTURE_NOTIFY),
      )
      .map_err(protocol_error)?;

    let probe_window = conn.generate_id().map_err(protocol_error)?;
    conn
      .create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        probe_window,
        root,
        -1,
        -1,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        x11rb::COPY_FROM_PARENT,
        &CreateWindowAux::new()
          .override_redirect(1u32)
          .event_mask(EventMask::PROPERTY_CHANGE),
      )
      .map_err(protocol_error)?;
    conn.flush().map_err(protocol_error)?;

    log::debug!("Connected to X11 screen {screen_num}, root window {root:#x}");

    Ok(Self {
      conn,
      root,
      screen_size,
      state_atoms: StateAtoms {
        hidden: atoms._NET_WM_STATE_HIDDEN,
        maximized_vert: atoms._NET_WM_STATE_MAXIMIZED_VERT,
        maximized_horz: atoms._NET_WM_STATE_MAXIMIZED_HORZ,
        fullscreen: atoms._NET_WM_STATE_FULLSCREEN,
        skip_pager: atoms._NET_WM_STATE_SKIP_PAGER,
        skip_taskbar: atoms._NET_WM_STATE_SKIP_TASKBAR,
        sticky: atoms._NET_WM_STATE_STICKY,
        demands_attention: atoms._NET_WM_STATE_DEMANDS_ATTENTION,
      },
      action_atoms: ActionAtoms {
        close: atoms._NET_WM_ACTION_CLOSE,
        minimize: atoms._NET_WM_ACTION_MINIMIZE,
        maximize_horz: atoms._NET_WM_ACTION_MAXIMIZE_HORZ,
        maximize_vert: atoms._NET_WM_ACTION_MAXIMIZE_VERT,
        move_: atoms._NET_WM_ACTION_MOVE,
        resize: atoms._NET_WM_ACTION_RESIZE,
        change_desktop: atoms._NET_WM_ACTION_CHANGE_DESKTOP,
        fullscreen: atoms._NET_WM_ACTION_FULLSCREEN,
      },
      atoms,
      probe_window,
      events: Mutex::new(EventState {
        dirty: true,
        ..EventState::default()
      }),
      drain: Mutex::new(()),
    })
  }

  fn get_property(
    &self,
    window: XWindow,
    property: Atom,
    type_: impl Into<Atom>,
    max_longs: u32,
  ) -> TrackerResult<GetPropertyReply> {
    self
      .conn
      .get_property(false, window, property, type_, 0, max_longs)
      .map_err(protocol_error)?
      .reply()
      .map_err(protocol_error)
  }

  // === Root window ===
  // Failures here mean the connection or the window manager is broken, so
  // they fail the snapshot.

  fn root_values(&self, property: Atom, type_: impl Into<Atom>) -> TrackerResult<Vec<u32>> {
    let reply = self.get_property(self.root, property, type_, u32::MAX)?;
    Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
  }

  fn root_cardinal(&self, property: Atom) -> TrackerResult<Option<u32>> {
    Ok(self.root_values(property, AtomEnum::CARDINAL)?.first().copied())
  }

  fn read_workspaces(&self) -> TrackerResult<Vec<Workspace>> {
    let count = self
      .root_cardinal(self.atoms._NET_NUMBER_OF_DESKTOPS)?
      .unwrap_or(0);
    let names = self.get_property(
      self.root,
      self.atoms._NET_DESKTOP_NAMES,
      self.atoms.UTF8_STRING,
      u32::MAX,
    )?;
    Ok(mapping::workspaces(count, &names.value))
  }

  /// RandR monitors, or the whole screen when RandR is unavailable.
  fn read_monitors(&self) -> Vec<Monitor> {
    let reply = self
      .conn
      .randr_get_monitors(self.root, true)
      .ok()
      .and_then(|cookie| cookie.reply().ok());
    let rects: Vec<MonitorRect> = reply
      .map(|reply| reply.monitors.iter().map(MonitorRect::from).collect())
      .unwrap_or_default();
    if rects.is_empty() {
      log::debug!("RandR monitor list unavailable, using the whole screen");
    }
    mapping::monitors(&rects, self.screen_size)
  }

  // === Clients ===
  // A client can vanish between listing and reading; its reads yield None.

  fn client_bytes(&self, window: XWindow, property: Atom, type_: impl Into<Atom>) -> Option<Vec<u8>> {
    let reply = self.get_property(window, property, type_, u32::MAX).ok()?;
    if reply.type_ == x11rb::NONE {
      return None;
    }
    Some(reply.value)
  }

  fn client_values(&self, window: XWindow, property: Atom, type_: impl Into<Atom>) -> Option<Vec<u32>> {
    let reply = self.get_property(window, property, type_, u32::MAX).ok()?;
    reply.value32().map(Iterator::collect)
  }

  fn client_cardinal(&self, window: XWindow, property: Atom) -> Option<u32> {
    self
      .client_values(window, property, AtomEnum::CARDINAL)?
      .first()
      .copied()
  }

  fn read_title(&self, window: XWindow) -> String {
    self
      .client_bytes(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)
      .or_else(|| self.client_bytes(window, self.atoms.WM_NAME, AtomEnum::ANY))
      .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
      .unwrap_or_default()
  }

  fn read_bounds(&self, window: XWindow) -> Option<Bounds> {
    let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;
    let origin = self
      .conn
      .translate_coordinates(window, self.root, 0, 0)
      .ok()?
      .reply()
      .ok()?;
    Some(Bounds::new(
      i32::from(origin.dst_x),
      i32::from(origin.dst_y),
      u32::from(geometry.width),
      u32::from(geometry.height),
    ))
  }

  /// Read one client. None if the window vanished meanwhile.
  fn read_window(&self, window: XWindow) -> Option<Window> {
    let bounds = self.read_bounds(window)?;
    let (class_instance, class_name) = self
      .client_bytes(window, self.atoms.WM_CLASS, AtomEnum::STRING)
      .map(|bytes| mapping::split_class(&bytes))
      .unwrap_or_default();
    let states = self
      .client_values(window, self.atoms._NET_WM_STATE, AtomEnum::ATOM)
      .unwrap_or_default();
    let actions = self
      .client_values(window, self.atoms._NET_WM_ALLOWED_ACTIONS, AtomEnum::ATOM)
      .unwrap_or_default();
    let icon = self
      .client_values(window, self.atoms._NET_WM_ICON, AtomEnum::CARDINAL)
      .unwrap_or_default();

    Some(Window {
      id: WindowId(window),
      process_id: self
        .client_cardinal(window, self.atoms._NET_WM_PID)
        .filter(|pid| *pid > 0)
        .map(ProcessId),
      title: self.read_title(window),
      class_instance,
      class_name,
      bounds,
      workspace: mapping::window_workspace(self.client_cardinal(window, self.atoms._NET_WM_DESKTOP)),
      state: self.state_atoms.decode(&states),
      actions: self.action_atoms.decode(&actions),
      icon_digest: mapping::icon_digest(&icon),
      is_stage: false,
    })
  }

  /// Select property/structure notifications on newly seen clients and forget
  /// clients that went away.
  fn watch_clients(&self, clients: &[XWindow]) {
    let mut events = self.events.lock();
    events.watched.retain(|w| clients.contains(w));
    for &client in clients {
      if events.watched.insert(client) {
        // Errors for already-destroyed windows arrive as X errors and are ignored.
        drop(self.conn.change_window_attributes(
          client,
          &ChangeWindowAttributesAux::new()
            .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY),
        ));
      }
    }
    drop(events);
    drop(self.conn.flush());
  }

  // === Events and time ===

  /// Record every queued event. Callers hold `drain`.
  fn drain_events(&self) -> Result<(), ConnectionError> {
    while let Some(event) = self.conn.poll_for_event()? {
      self.events.lock().record(&event, self.probe_window);
    }
    Ok(())
  }

  fn user_time(&self) -> Option<u32> {
    let active = mapping::first_window(
      &self
        .root_values(self.atoms._NET_ACTIVE_WINDOW, AtomEnum::WINDOW)
        .ok()?,
    )?;
    let time_window = self
      .client_values(active, self.atoms._NET_WM_USER_TIME_WINDOW, AtomEnum::WINDOW)
      .and_then(|v| mapping::first_window(&v))
      .unwrap_or(active);
    self.client_cardinal(time_window, self.atoms._NET_WM_USER_TIME)
  }

  /// Touch the probe window's property and take the time stamp of the
  /// resulting notify. Gives up after `SERVER_TIME_TIMEOUT`.
  fn server_time(&self) -> Option<u32> {
    let _drain = self.drain.lock();

    // Consume notifies of earlier probes before asking again.
    if let Err(e) = self.drain_events() {
      log::debug!("Cannot read X11 events for server time: {e}");
      return None;
    }
    self.events.lock().probe_time = None;

    self
      .conn
      .change_property8(
        PropMode::APPEND,
        self.probe_window,
        self.atoms._WINTRACK_TIMESTAMP_PROBE,
        AtomEnum::STRING,
        &[],
      )
      .ok()?;
    self.conn.flush().ok()?;

    let time = wait_for(SERVER_TIME_TIMEOUT, SERVER_TIME_POLL, || {
      if let Err(e) = self.drain_events() {
        log::debug!("Cannot read X11 events for server time: {e}");
      }
      self.events.lock().probe_time.take()
    });
    if time.is_none() {
      log::debug!("Server time probe timed out");
    }
    time
  }
}

impl WindowSystem for X11WindowSystem {
  fn snapshot(&self) -> TrackerResult<ScreenSnapshot> {
    let clients = self.root_values(self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW)?;
    self.watch_clients(&clients);

    let windows: Vec<Window> = clients
      .iter()
      .filter_map(|&client| self.read_window(client))
      .collect();

    let stacking = self
      .root_values(self.atoms._NET_CLIENT_LIST_STACKING, AtomEnum::WINDOW)?
      .into_iter()
      .map(WindowId)
      .collect();

    let active_window = mapping::first_window(
      &self.root_values(self.atoms._NET_ACTIVE_WINDOW, AtomEnum::WINDOW)?,
    )
    .map(WindowId);

    Ok(ScreenSnapshot {
      windows,
      stacking,
      workspaces: self.read_workspaces()?,
      active_window,
      active_workspace: self.root_cardinal(self.atoms._NET_CURRENT_DESKTOP)?,
      monitors: self.read_monitors(),
    })
  }

  fn poll_changes(&self) -> bool {
    let drain = self.drain.lock();
    if let Err(e) = self.drain_events() {
      log::warn!("X11 connection error while polling events: {e}");
    }
    drop(drain);
    std::mem::take(&mut self.events.lock().dirty)
  }

  fn timestamp(&self, source: TimestampSource) -> Option<u32> {
    match source {
      TimestampSource::ToolkitEvent | TimestampSource::SecondaryToolkitEvent => None,
      TimestampSource::UserTime => self.user_time(),
      TimestampSource::NativeEvent => Some(self.events.lock().last_event_time),
      TimestampSource::ServerTime => self.server_time(),
    }
  }
}

impl Drop for X11WindowSystem {
  fn drop(&mut self) {
    drop(self.conn.destroy_window(self.probe_window));
    drop(self.conn.flush());
  }
}
