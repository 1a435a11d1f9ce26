/*! Branded ID types for type-safe entity references. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Native window handle (the X11 window id on X11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
pub struct WindowId(pub u32);

/// Process ID - branded type to distinguish from other u32 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
pub struct ProcessId(pub u32);

/// Desktop-file ID, e.g. `org.gnome.Calculator.desktop`.
///
/// The unique key of an installed application. Compared byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct DesktopId(pub String);

impl DesktopId {
  /// Borrow the ID as a string slice.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for DesktopId {
  fn from(id: &str) -> Self {
    Self(id.to_owned())
  }
}

impl Borrow<str> for DesktopId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for DesktopId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl PartialEq<str> for DesktopId {
  fn eq(&self, other: &str) -> bool {
    self.0 == other
  }
}

impl PartialEq<&str> for DesktopId {
  fn eq(&self, other: &&str) -> bool {
    self.0 == *other
  }
}
