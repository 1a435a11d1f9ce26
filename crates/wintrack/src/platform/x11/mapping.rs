/*!
Decoding of raw X11 property values into tracker types.

Everything here is pure; the connection code in the parent module only
fetches property data and hands it over.
*/

use std::hash::{DefaultHasher, Hash, Hasher};

use x11rb::protocol::randr::MonitorInfo;
use x11rb::protocol::xproto::Atom;

use crate::types::{Bounds, Monitor, WindowActions, WindowState, Workspace};

/// `_NET_WM_DESKTOP` value for windows shown on all workspaces.
pub(super) const ALL_WORKSPACES: u32 = 0xFFFF_FFFF;

/// Split a list of NUL-terminated strings. A trailing terminator does not
/// produce an empty last element.
fn split_strings(bytes: &[u8]) -> Vec<String> {
  let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);
  if bytes.is_empty() {
    return Vec::new();
  }
  bytes
    .split(|b| *b == 0)
    .map(|part| String::from_utf8_lossy(part).into_owned())
    .collect()
}

/// `WM_CLASS` holds the instance name, then the class name.
pub(super) fn split_class(bytes: &[u8]) -> (String, String) {
  let mut parts = split_strings(bytes).into_iter();
  let instance = parts.next().unwrap_or_default();
  let class = parts.next().unwrap_or_default();
  (instance, class)
}

/// Workspaces `0..count`, named from `_NET_DESKTOP_NAMES`. Missing or empty
/// names become "Workspace N" (1-based).
pub(super) fn workspaces(count: u32, names: &[u8]) -> Vec<Workspace> {
  let names = split_strings(names);
  (0..count)
    .map(|number| {
      let name = usize::try_from(number)
        .ok()
        .and_then(|idx| names.get(idx))
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("Workspace {}", number.saturating_add(1)));
      Workspace { number, name }
    })
    .collect()
}

/// Workspace of a window from its `_NET_WM_DESKTOP`; None means all.
pub(super) fn window_workspace(desktop: Option<u32>) -> Option<u32> {
  desktop.filter(|ws| *ws != ALL_WORKSPACES)
}

/// First entry of a `WINDOW` property, unless it is `None`.
pub(super) fn first_window(values: &[u32]) -> Option<u32> {
  values.first().copied().filter(|w| *w != x11rb::NONE)
}

/// Fingerprint of `_NET_WM_ICON` data, None without an icon.
pub(super) fn icon_digest(data: &[u32]) -> Option<u64> {
  if data.is_empty() {
    return None;
  }
  let mut hasher = DefaultHasher::new();
  data.hash(&mut hasher);
  Some(hasher.finish())
}

/// `_NET_WM_STATE` atoms this backend understands.
#[derive(Debug, Clone, Copy)]
pub(super) struct StateAtoms {
  pub(super) hidden: Atom,
  pub(super) maximized_vert: Atom,
  pub(super) maximized_horz: Atom,
  pub(super) fullscreen: Atom,
  pub(super) skip_pager: Atom,
  pub(super) skip_taskbar: Atom,
  pub(super) sticky: Atom,
  pub(super) demands_attention: Atom,
}

impl StateAtoms {
  pub(super) fn decode(&self, states: &[Atom]) -> WindowState {
    let has = |atom: Atom| states.contains(&atom);
    WindowState {
      minimized: has(self.hidden),
      maximized: has(self.maximized_vert) && has(self.maximized_horz),
      fullscreen: has(self.fullscreen),
      skip_pager: has(self.skip_pager),
      skip_tasklist: has(self.skip_taskbar),
      sticky: has(self.sticky),
      urgent: has(self.demands_attention),
    }
  }
}

/// `_NET_WM_ALLOWED_ACTIONS` atoms this backend understands.
#[derive(Debug, Clone, Copy)]
pub(super) struct ActionAtoms {
  pub(super) close: Atom,
  pub(super) minimize: Atom,
  pub(super) maximize_horz: Atom,
  pub(super) maximize_vert: Atom,
  pub(super) move_: Atom,
  pub(super) resize: Atom,
  pub(super) change_desktop: Atom,
  pub(super) fullscreen: Atom,
}

impl ActionAtoms {
  /// Either maximize direction counts as maximizable.
  pub(super) fn decode(&self, actions: &[Atom]) -> WindowActions {
    let has = |atom: Atom| actions.contains(&atom);
    WindowActions {
      close: has(self.close),
      minimize: has(self.minimize),
      maximize: has(self.maximize_horz) || has(self.maximize_vert),
      move_: has(self.move_),
      resize: has(self.resize),
      change_workspace: has(self.change_desktop),
      fullscreen: has(self.fullscreen),
    }
  }
}

/// Geometry of one RandR monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MonitorRect {
  pub(super) x: i16,
  pub(super) y: i16,
  pub(super) width: u16,
  pub(super) height: u16,
  pub(super) primary: bool,
}

impl From<&MonitorInfo> for MonitorRect {
  fn from(info: &MonitorInfo) -> Self {
    Self {
      x: info.x,
      y: info.y,
      width: info.width,
      height: info.height,
      primary: info.primary,
    }
  }
}

/// Monitors in RandR order. Without any, the whole screen is one primary
/// monitor.
pub(super) fn monitors(rects: &[MonitorRect], screen_size: (u16, u16)) -> Vec<Monitor> {
  if rects.is_empty() {
    return vec![Monitor {
      index: 0,
      bounds: Bounds::new(0, 0, u32::from(screen_size.0), u32::from(screen_size.1)),
      primary: true,
    }];
  }
  rects
    .iter()
    .zip(0u32..)
    .map(|(rect, index)| Monitor {
      index,
      bounds: Bounds::new(
        i32::from(rect.x),
        i32::from(rect.y),
        u32::from(rect.width),
        u32::from(rect.height),
      ),
      primary: rect.primary,
    })
    .collect()
}
