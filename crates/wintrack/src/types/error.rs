/*! Error types for tracker operations. */

use super::WindowId;
use std::path::PathBuf;

/// Errors that can occur during tracker operations.
///
/// Window-to-application resolution never produces these: its failures
/// degrade to "try the next strategy" or "leave the window untracked".
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  #[error("Workspace {number} out of range (workspace count is {count})")]
  WorkspaceOutOfRange { number: u32, count: u32 },

  #[error("Monitor {number} out of range (monitor count is {count})")]
  MonitorOutOfRange { number: u32, count: u32 },

  #[error("Window not found: {0}")]
  WindowNotFound(WindowId),

  #[error("Cannot connect to display server: {0}")]
  Connection(String),

  #[error("Display server protocol error: {0}")]
  Protocol(String),

  #[error("Failed to read application catalog at {path}: {source}")]
  Catalog {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Tracker has been shut down")]
  ShutDown,
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
