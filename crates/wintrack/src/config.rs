/*!
Configuration for wintrack.

All values have sensible defaults. Create a custom config to override, or
read one from JSON:

```
use wintrack::TrackerConfig;

let config = TrackerConfig::from_json_str(r#"{ "poll_interval_ms": 100 }"#).unwrap();
assert_eq!(config.poll_interval_ms, 100);
assert_eq!(config.event_channel_capacity, 1000);
```
*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{ProcessId, TrackerError, TrackerResult};

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
  /// Capacity of the event broadcast channel. The oldest events are dropped
  /// when it is full.
  /// Default: 1000 events.
  pub event_channel_capacity: usize,

  /// Background polling interval in milliseconds. `0` disables the polling
  /// thread; the embedder then calls `dispatch_pending` itself.
  /// Default: 250ms.
  pub poll_interval_ms: u64,

  /// How often to rescan the application catalog (in poll cycles). `0`
  /// disables rescans.
  /// For 250ms polling, 240 cycles ≈ 1 minute.
  pub catalog_rescan_cycles: u64,

  /// procfs mount used to read launch environments.
  /// Default: `/proc`.
  pub proc_root: PathBuf,

  /// Process that owns the launcher's own windows.
  pub stage_pid: Option<ProcessId>,

  /// `applications` directories to load, highest precedence first.
  /// Empty means the XDG data directories.
  pub application_dirs: Vec<PathBuf>,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      event_channel_capacity: 1000,
      poll_interval_ms: 250,
      catalog_rescan_cycles: 240,
      proc_root: PathBuf::from("/proc"),
      stage_pid: None,
      application_dirs: Vec::new(),
    }
  }
}

impl TrackerConfig {
  /// Create a new config with default values.
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a JSON config. Missing fields keep their defaults.
  pub fn from_json_str(json: &str) -> TrackerResult<Self> {
    let config: Self = serde_json::from_str(json).map_err(|e| TrackerError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Read a JSON config file.
  pub fn load(path: impl AsRef<Path>) -> TrackerResult<Self> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
      .map_err(|e| TrackerError::Config(format!("{}: {e}", path.display())))?;
    Self::from_json_str(&json)
  }

  fn validate(&self) -> TrackerResult<()> {
    if self.event_channel_capacity == 0 {
      return Err(TrackerError::Config(
        "event_channel_capacity must be at least 1".to_owned(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_values() {
    let config = TrackerConfig::default();
    assert_eq!(config.event_channel_capacity, 1000);
    assert_eq!(config.poll_interval_ms, 250);
    assert_eq!(config.catalog_rescan_cycles, 240);
    assert_eq!(config.proc_root, Path::new("/proc"));
    assert_eq!(config.stage_pid, None);
    assert!(config.application_dirs.is_empty());
  }

  #[test]
  fn empty_object_is_the_default() {
    assert_eq!(TrackerConfig::from_json_str("{}").unwrap(), TrackerConfig::default());
  }

  #[test]
  fn fields_override_defaults() {
    let config = TrackerConfig::from_json_str(
      r#"{
        "stage_pid": 4242,
        "poll_interval_ms": 0,
        "application_dirs": ["/opt/apps/share/applications"]
      }"#,
    )
    .unwrap();
    assert_eq!(config.stage_pid, Some(ProcessId(4242)));
    assert_eq!(config.poll_interval_ms, 0);
    assert_eq!(config.application_dirs, vec![PathBuf::from("/opt/apps/share/applications")]);
    assert_eq!(config.catalog_rescan_cycles, 240);
  }

  #[test]
  fn unknown_fields_and_zero_capacity_are_rejected() {
    assert!(matches!(
      TrackerConfig::from_json_str(r#"{ "pol_interval_ms": 5 }"#),
      Err(TrackerError::Config(_))
    ));
    assert!(matches!(
      TrackerConfig::from_json_str(r#"{ "event_channel_capacity": 0 }"#),
      Err(TrackerError::Config(_))
    ));
  }

  #[test]
  fn load_reads_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wintrack.json");
    std::fs::write(&path, r#"{ "proc_root": "/host/proc" }"#).unwrap();

    let config = TrackerConfig::load(&path).unwrap();
    assert_eq!(config.proc_root, Path::new("/host/proc"));
    assert!(matches!(
      TrackerConfig::load(dir.path().join("missing.json")),
      Err(TrackerError::Config(_))
    ));
  }
}
