/*!
Window-to-application resolution.

Two strategies, first success wins:

1. The launch environment of the owning process (`GIO_LAUNCHED_DESKTOP_FILE`
   and `GIO_LAUNCHED_DESKTOP_FILE_PID`). This is the environment the process
   was spawned with, so it can be stale for processes that re-exec or hand
   windows to a long-lived server.
2. The window's instance and class names as desktop IDs.

Nothing here fails: probe errors, ambiguity and lookup misses all degrade to
"try the next strategy" or "unresolved".
*/

use std::path::Path;

use crate::appdb::{AppInfo, ApplicationDatabase};
use crate::platform::ProcessEnvironment;
use crate::types::{ProcessId, Window};

const LAUNCHED_DESKTOP_FILE: &str = "GIO_LAUNCHED_DESKTOP_FILE";
const LAUNCHED_DESKTOP_FILE_PID: &str = "GIO_LAUNCHED_DESKTOP_FILE_PID";

/// Launch information found in a process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchInfo {
  pub(crate) desktop_file: String,
  pub(crate) pid: ProcessId,
}

/// Why a launch environment yielded nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum LaunchInfoError {
  #[error("'{0}' is set more than once")]
  Ambiguous(&'static str),
  #[error("'{0}' is not set")]
  Missing(&'static str),
  #[error("invalid launcher PID '{0}'")]
  InvalidPid(String),
}

/// Extract launch information from a raw NUL-separated environment block.
pub(crate) fn parse_launch_info(environ: &[u8]) -> Result<LaunchInfo, LaunchInfoError> {
  let mut desktop_file = None;
  let mut pid = None;

  for entry in environ.split(|&b| b == 0).filter(|e| !e.is_empty()) {
    let entry = String::from_utf8_lossy(entry);
    let Some((key, value)) = entry.split_once('=') else {
      continue;
    };
    let (slot, name) = match key {
      LAUNCHED_DESKTOP_FILE => (&mut desktop_file, LAUNCHED_DESKTOP_FILE),
      LAUNCHED_DESKTOP_FILE_PID => (&mut pid, LAUNCHED_DESKTOP_FILE_PID),
      _ => continue,
    };
    if slot.replace(value.to_owned()).is_some() {
      return Err(LaunchInfoError::Ambiguous(name));
    }
  }

  let desktop_file = desktop_file.ok_or(LaunchInfoError::Missing(LAUNCHED_DESKTOP_FILE))?;
  let pid = pid.ok_or(LaunchInfoError::Missing(LAUNCHED_DESKTOP_FILE_PID))?;
  let pid = pid
    .trim()
    .parse::<u32>()
    .map(ProcessId)
    .map_err(|_| LaunchInfoError::InvalidPid(pid.clone()))?;

  Ok(LaunchInfo { desktop_file, pid })
}

/// Strategy 1: the desktop file recorded in the launch environment.
pub(crate) fn resolve_by_environment(
  window: &Window,
  environment: &dyn ProcessEnvironment,
  database: &ApplicationDatabase,
) -> Option<AppInfo> {
  let Some(pid) = window.process_id else {
    log::debug!("Window {}: no process ID, skipping environment lookup", window.id);
    return None;
  };

  let environ = match environment.read_environ(pid) {
    Ok(environ) => environ,
    Err(e) => {
      log::debug!("Window {}: cannot read environment of PID {pid}: {e}", window.id);
      return None;
    }
  };

  let launch = match parse_launch_info(&environ) {
    Ok(launch) => launch,
    Err(e) => {
      log::debug!("Window {}: launch environment of PID {pid} unusable: {e}", window.id);
      return None;
    }
  };

  if launch.pid != pid {
    log::debug!(
      "Window {}: launch environment belongs to PID {} not {pid}",
      window.id,
      launch.pid
    );
    return None;
  }

  let found = database.lookup_desktop_id(&launch.desktop_file).or_else(|| {
    let basename = Path::new(&launch.desktop_file).file_name()?.to_str()?;
    database.lookup_desktop_id(basename)
  });
  match &found {
    Some(app) => log::debug!(
      "Window {}: resolved to '{}' by launch environment",
      window.id,
      app.desktop_id
    ),
    None => log::debug!(
      "Window {}: launch desktop file '{}' is not installed",
      window.id,
      launch.desktop_file
    ),
  }
  found
}

/// Strategy 2: instance and class names as desktop IDs. Names that resolve
/// to different applications make the window ambiguous.
pub(crate) fn resolve_by_window_names(window: &Window, database: &ApplicationDatabase) -> Option<AppInfo> {
  let mut found: Option<AppInfo> = None;

  for name in window.instance_names() {
    let exact = format!("{name}.desktop");
    let Some(app) = database
      .lookup_desktop_id(&exact)
      .or_else(|| database.lookup_desktop_id(&exact.to_lowercase()))
    else {
      continue;
    };

    match &found {
      Some(previous) if previous.desktop_id != app.desktop_id => {
        log::debug!(
          "Window {}: names match both '{}' and '{}', leaving unresolved",
          window.id,
          previous.desktop_id,
          app.desktop_id
        );
        return None;
      }
      Some(_) => {}
      None => found = Some(app),
    }
  }

  if let Some(app) = &found {
    log::debug!("Window {}: resolved to '{}' by window name", window.id, app.desktop_id);
  }
  found
}

/// Run every strategy in order.
pub(crate) fn resolve_window(
  window: &Window,
  environment: &dyn ProcessEnvironment,
  database: &ApplicationDatabase,
) -> Option<AppInfo> {
  resolve_by_environment(window, environment, database).or_else(|| resolve_by_window_names(window, database))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{launched_from, window, MemoryEnvironment};
  use crate::types::DesktopId;
  use proptest::prelude::*;

  fn database() -> ApplicationDatabase {
    let mut foo = AppInfo::new("foo.desktop", "Foo");
    foo.path = "/usr/share/applications/foo.desktop".into();
    ApplicationDatabase::from_applications([
      foo,
      AppInfo::new("firefox.desktop", "Firefox"),
      AppInfo::new("navigator.desktop", "Navigator"),
      AppInfo::new("gimp.desktop", "GIMP"),
    ])
  }

  mod launch_info {
    use super::*;

    #[test]
    fn reads_both_keys() {
      let info = parse_launch_info(b"PATH=/bin\0GIO_LAUNCHED_DESKTOP_FILE=/a/foo.desktop\0GIO_LAUNCHED_DESKTOP_FILE_PID=12\0");
      assert_eq!(
        info,
        Ok(LaunchInfo {
          desktop_file: "/a/foo.desktop".to_owned(),
          pid: ProcessId(12),
        })
      );
    }

    #[test]
    fn duplicate_keys_are_ambiguous() {
      let raw = b"GIO_LAUNCHED_DESKTOP_FILE=/a.desktop\0GIO_LAUNCHED_DESKTOP_FILE=/b.desktop\0GIO_LAUNCHED_DESKTOP_FILE_PID=1\0";
      assert_eq!(parse_launch_info(raw), Err(LaunchInfoError::Ambiguous(LAUNCHED_DESKTOP_FILE)));

      let raw = b"GIO_LAUNCHED_DESKTOP_FILE_PID=1\0GIO_LAUNCHED_DESKTOP_FILE=/a.desktop\0GIO_LAUNCHED_DESKTOP_FILE_PID=1\0";
      assert_eq!(parse_launch_info(raw), Err(LaunchInfoError::Ambiguous(LAUNCHED_DESKTOP_FILE_PID)));
    }

    #[test]
    fn missing_or_malformed_values_fail() {
      assert_eq!(
        parse_launch_info(b"GIO_LAUNCHED_DESKTOP_FILE=/a.desktop\0"),
        Err(LaunchInfoError::Missing(LAUNCHED_DESKTOP_FILE_PID))
      );
      assert_eq!(
        parse_launch_info(b"GIO_LAUNCHED_DESKTOP_FILE_PID=1"),
        Err(LaunchInfoError::Missing(LAUNCHED_DESKTOP_FILE))
      );
      assert_eq!(
        parse_launch_info(b"GIO_LAUNCHED_DESKTOP_FILE=/a.desktop\0GIO_LAUNCHED_DESKTOP_FILE_PID=abc\0"),
        Err(LaunchInfoError::InvalidPid("abc".to_owned()))
      );
    }

    #[test]
    fn similar_keys_do_not_match() {
      let raw = b"GIO_LAUNCHED_DESKTOP_FILE_PIDX=1\0XGIO_LAUNCHED_DESKTOP_FILE=/a\0";
      assert_eq!(parse_launch_info(raw), Err(LaunchInfoError::Missing(LAUNCHED_DESKTOP_FILE)));
    }
  }

  mod environment_strategy {
    use super::*;

    #[test]
    fn matching_pid_resolves_by_full_path() {
      let env = MemoryEnvironment::default().with(7, &launched_from("/usr/share/applications/foo.desktop", 7));
      let app = resolve_by_environment(&window(1, Some(7), "x", "X"), &env, &database());
      assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("foo.desktop")));
    }

    #[test]
    fn unknown_path_falls_back_to_basename() {
      let env = MemoryEnvironment::default().with(7, &launched_from("/opt/elsewhere/gimp.desktop", 7));
      let app = resolve_by_environment(&window(1, Some(7), "x", "X"), &env, &database());
      assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("gimp.desktop")));
    }

    #[test]
    fn inherited_environment_is_rejected() {
      let env = MemoryEnvironment::default().with(7, &launched_from("/usr/share/applications/foo.desktop", 3));
      assert_eq!(resolve_by_environment(&window(1, Some(7), "x", "X"), &env, &database()), None);
    }

    #[test]
    fn probe_failures_yield_nothing() {
      let env = MemoryEnvironment::default().with_error(7, std::io::ErrorKind::PermissionDenied);
      let db = database();
      assert_eq!(resolve_by_environment(&window(1, Some(7), "x", "X"), &env, &db), None);
      assert_eq!(resolve_by_environment(&window(1, Some(8), "x", "X"), &env, &db), None);
      assert_eq!(resolve_by_environment(&window(1, None, "x", "X"), &env, &db), None);
    }
  }

  mod name_strategy {
    use super::*;

    #[test]
    fn lowercased_class_name_matches() {
      let app = resolve_by_window_names(&window(1, None, "", "Gimp"), &database());
      assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("gimp.desktop")));
    }

    #[test]
    fn names_agreeing_on_one_application_resolve() {
      let app = resolve_by_window_names(&window(1, None, "firefox", "Firefox"), &database());
      assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("firefox.desktop")));
    }

    #[test]
    fn conflicting_names_are_ambiguous() {
      assert_eq!(resolve_by_window_names(&window(1, None, "navigator", "Firefox"), &database()), None);
    }

    #[test]
    fn unknown_names_resolve_to_nothing() {
      assert_eq!(resolve_by_window_names(&window(1, None, "bar", "Bar"), &database()), None);
    }
  }

  #[test]
  fn ambiguous_environment_falls_through_to_names() {
    let raw = b"GIO_LAUNCHED_DESKTOP_FILE=/usr/share/applications/foo.desktop\0\
                GIO_LAUNCHED_DESKTOP_FILE=/usr/share/applications/foo.desktop\0\
                GIO_LAUNCHED_DESKTOP_FILE_PID=7\0";
    let env = MemoryEnvironment::default().with_raw(7, raw.as_slice());
    let app = resolve_window(&window(1, Some(7), "gimp", "Gimp"), &env, &database());
    assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("gimp.desktop")));
  }

  #[test]
  fn environment_wins_over_names() {
    let env = MemoryEnvironment::default().with(7, &launched_from("/usr/share/applications/foo.desktop", 7));
    let app = resolve_window(&window(1, Some(7), "gimp", "Gimp"), &env, &database());
    assert_eq!(app.map(|a| a.desktop_id), Some(DesktopId::from("foo.desktop")));
  }

  mod proptests {
    use super::*;

    proptest! {
      #[test]
      fn unrelated_variables_never_matter(
        vars in prop::collection::vec(("[A-Z_]{1,12}", "[ -~]{0,16}"), 0..8),
        pid in 1u32..100_000,
      ) {
        let mut raw = Vec::new();
        for (key, value) in &vars {
          if key.starts_with("GIO_LAUNCHED_DESKTOP_FILE") {
            continue;
          }
          raw.extend_from_slice(format!("{key}={value}\0").as_bytes());
        }
        raw.extend_from_slice(format!("GIO_LAUNCHED_DESKTOP_FILE=/x.desktop\0GIO_LAUNCHED_DESKTOP_FILE_PID={pid}\0").as_bytes());

        let info = parse_launch_info(&raw).unwrap();
        prop_assert_eq!(info.pid, ProcessId(pid));
        prop_assert_eq!(info.desktop_file, "/x.desktop");
      }

      #[test]
      fn arbitrary_bytes_never_panic(raw in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_launch_info(&raw);
      }
    }
  }
}
