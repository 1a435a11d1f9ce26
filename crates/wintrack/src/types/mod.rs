/*! Core types shared by the trackers, the platform layer and consumers. */

#![allow(missing_docs)]

mod error;
mod event;
mod geometry;
mod ids;
mod window;

pub use error::{TrackerError, TrackerResult};
pub use event::Event;
pub use geometry::{Bounds, Point};
pub use ids::{DesktopId, ProcessId, WindowId};
pub use window::{Monitor, Window, WindowActions, WindowState, Workspace};
