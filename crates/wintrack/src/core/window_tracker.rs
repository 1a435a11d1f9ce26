/*!
Window tracker - cached window-manager state and snapshot diffing.

The tracker never talks to the window system. It receives complete
snapshots and turns the difference to the previous one into events, in a
fixed order: closed windows, opened windows, per-window changes, stacking,
workspaces, active workspace, active window, monitors.
*/

use std::collections::{HashMap, HashSet};

use crate::platform::ScreenSnapshot;
use crate::types::{
  Event, Monitor, ProcessId, TrackerError, TrackerResult, Window, WindowId, Workspace,
};

#[derive(Debug, Default)]
pub(crate) struct WindowTracker {
  /// Creation order (order of first appearance).
  windows: Vec<Window>,
  /// Bottom to top.
  stacking: Vec<WindowId>,
  workspaces: Vec<Workspace>,
  active_window: Option<WindowId>,
  active_workspace: Option<u32>,
  monitors: Vec<Monitor>,
  stage_pid: Option<ProcessId>,
}

impl WindowTracker {
  pub(crate) fn new(stage_pid: Option<ProcessId>) -> Self {
    Self {
      stage_pid,
      ..Self::default()
    }
  }

  /// Replace the cached state with `snapshot`, returning what changed.
  pub(crate) fn apply(&mut self, snapshot: ScreenSnapshot) -> Vec<Event> {
    let ScreenSnapshot {
      windows,
      stacking,
      workspaces,
      active_window,
      active_workspace,
      monitors,
    } = snapshot;

    let mut events = Vec::new();
    self.sync_windows(windows, &mut events);
    self.sync_stacking(stacking, &mut events);
    self.sync_workspaces(workspaces, &mut events);
    self.sync_active_workspace(active_workspace, &mut events);
    self.sync_active_window(active_window, &mut events);
    self.sync_monitors(monitors, &mut events);
    events
  }

  fn sync_windows(&mut self, incoming: Vec<Window>, events: &mut Vec<Event>) {
    let mut incoming: Vec<Window> = {
      let mut seen = HashSet::new();
      incoming.into_iter().filter(|w| seen.insert(w.id)).collect()
    };
    for window in &mut incoming {
      window.is_stage = self.stage_pid.is_some() && window.process_id == self.stage_pid;
    }
    let incoming_ids: HashSet<WindowId> = incoming.iter().map(|w| w.id).collect();

    // Closed
    let (kept, closed): (Vec<Window>, Vec<Window>) = std::mem::take(&mut self.windows)
      .into_iter()
      .partition(|w| incoming_ids.contains(&w.id));
    self.windows = kept;
    for window in closed {
      if self.active_window == Some(window.id) {
        self.active_window = None;
      }
      events.push(Event::WindowClosed { window });
    }

    // Opened and changed
    let mut changed = Vec::new();
    let positions: HashMap<WindowId, usize> =
      self.windows.iter().enumerate().map(|(i, w)| (w.id, i)).collect();
    for window in incoming {
      match positions.get(&window.id).copied() {
        Some(i) => {
          if let Some(cached) = self.windows.get_mut(i) {
            let previous = std::mem::replace(cached, window);
            changed.push((previous, cached.clone()));
          }
        }
        None => {
          events.push(Event::WindowOpened {
            window: window.clone(),
          });
          self.windows.push(window);
        }
      }
    }

    for (previous, current) in changed {
      window_changes(&previous, &current, events);
    }
  }

  fn sync_stacking(&mut self, stacking: Vec<WindowId>, events: &mut Vec<Event>) {
    let known: HashSet<WindowId> = self.windows.iter().map(|w| w.id).collect();
    let stacking: Vec<WindowId> = stacking.into_iter().filter(|id| known.contains(id)).collect();
    if stacking != self.stacking {
      self.stacking = stacking;
      events.push(Event::StackingChanged);
    }
  }

  fn sync_workspaces(&mut self, mut incoming: Vec<Workspace>, events: &mut Vec<Event>) {
    incoming.sort_by_key(|ws| ws.number);
    incoming.dedup_by_key(|ws| ws.number);
    // Workspace `n` lives at index `n`.
    let contiguous = incoming
      .iter()
      .zip(0u32..)
      .take_while(|(ws, index)| ws.number == *index)
      .count();
    if contiguous < incoming.len() {
      log::warn!(
        "Ignoring {} workspaces numbered past a gap at {contiguous}",
        incoming.len() - contiguous
      );
      incoming.truncate(contiguous);
    }

    for workspace in &self.workspaces {
      if !incoming.iter().any(|ws| ws.number == workspace.number) {
        if self.active_workspace == Some(workspace.number) {
          self.active_workspace = None;
        }
        events.push(Event::WorkspaceRemoved {
          workspace: workspace.clone(),
        });
      }
    }
    for workspace in &incoming {
      match self.workspaces.iter().find(|ws| ws.number == workspace.number) {
        None => events.push(Event::WorkspaceAdded {
          workspace: workspace.clone(),
        }),
        Some(cached) if cached.name != workspace.name => events.push(Event::WorkspaceNameChanged {
          workspace: workspace.clone(),
        }),
        Some(_) => {}
      }
    }
    self.workspaces = incoming;
  }

  fn sync_active_workspace(&mut self, active: Option<u32>, events: &mut Vec<Event>) {
    let current = active.filter(|&number| {
      let valid = self.workspaces.iter().any(|ws| ws.number == number);
      if !valid {
        log::warn!(
          "Active workspace {number} out of range (workspace count is {})",
          self.workspaces.len()
        );
      }
      valid
    });
    if current != self.active_workspace {
      let previous = std::mem::replace(&mut self.active_workspace, current);
      events.push(Event::ActiveWorkspaceChanged { previous, current });
    }
  }

  fn sync_active_window(&mut self, active: Option<WindowId>, events: &mut Vec<Event>) {
    let current = active.filter(|&id| {
      let known = self.windows.iter().any(|w| w.id == id);
      if !known {
        log::debug!("Active window {id} is not a managed window");
      }
      known
    });
    if current != self.active_window {
      let previous = std::mem::replace(&mut self.active_window, current);
      events.push(Event::ActiveWindowChanged { previous, current });
    }
  }

  fn sync_monitors(&mut self, mut incoming: Vec<Monitor>, events: &mut Vec<Event>) {
    incoming.sort_by_key(|m| m.index);
    incoming.dedup_by_key(|m| m.index);

    for monitor in &incoming {
      match self.monitors.iter().find(|m| m.index == monitor.index) {
        None => events.push(Event::MonitorAdded {
          monitor: monitor.clone(),
        }),
        Some(cached) if cached.bounds != monitor.bounds => {
          events.push(Event::MonitorGeometryChanged {
            monitor: monitor.clone(),
          });
        }
        Some(_) => {}
      }
    }
    for monitor in &self.monitors {
      if !incoming.iter().any(|m| m.index == monitor.index) {
        events.push(Event::MonitorRemoved {
          monitor: monitor.clone(),
        });
      }
    }

    let previous = primary_index(&self.monitors);
    let current = primary_index(&incoming);
    self.monitors = incoming;
    if previous != current {
      events.push(Event::PrimaryMonitorChanged { previous, current });
    }
  }

  // === Queries ===

  pub(crate) fn windows(&self) -> &[Window] {
    &self.windows
  }

  pub(crate) fn windows_stacked(&self) -> Vec<&Window> {
    self.stacking.iter().filter_map(|id| self.window(*id)).collect()
  }

  pub(crate) fn window(&self, id: WindowId) -> Option<&Window> {
    self.windows.iter().find(|w| w.id == id)
  }

  pub(crate) fn windows_on_workspace(&self, number: u32) -> TrackerResult<Vec<&Window>> {
    self.workspace_by_number(number)?;
    Ok(self.windows.iter().filter(|w| w.is_on_workspace(number)).collect())
  }

  pub(crate) fn active_window(&self) -> Option<&Window> {
    self.active_window.and_then(|id| self.window(id))
  }

  pub(crate) fn active_workspace(&self) -> Option<&Workspace> {
    let number = self.active_workspace?;
    self.workspaces.iter().find(|ws| ws.number == number)
  }

  pub(crate) fn workspaces(&self) -> &[Workspace] {
    &self.workspaces
  }

  pub(crate) fn workspaces_count(&self) -> u32 {
    count(self.workspaces.len())
  }

  pub(crate) fn workspace_by_number(&self, number: u32) -> TrackerResult<&Workspace> {
    usize::try_from(number)
      .ok()
      .and_then(|index| self.workspaces.get(index))
      .ok_or(TrackerError::WorkspaceOutOfRange {
        number,
        count: self.workspaces_count(),
      })
  }

  pub(crate) fn monitors(&self) -> &[Monitor] {
    &self.monitors
  }

  pub(crate) fn primary_monitor(&self) -> Option<&Monitor> {
    self.monitors.iter().find(|m| m.primary)
  }

  pub(crate) fn monitor_by_number(&self, number: u32) -> TrackerResult<&Monitor> {
    self
      .monitors
      .iter()
      .find(|m| m.index == number)
      .ok_or(TrackerError::MonitorOutOfRange {
        number,
        count: count(self.monitors.len()),
      })
  }

  /// Monitor containing the window's centre, else the primary monitor.
  pub(crate) fn monitor_for_window(&self, id: WindowId) -> TrackerResult<Option<&Monitor>> {
    let window = self.window(id).ok_or(TrackerError::WindowNotFound(id))?;
    let center = window.bounds.center();
    Ok(
      self
        .monitors
        .iter()
        .find(|m| m.bounds.contains(center))
        .or_else(|| self.primary_monitor()),
    )
  }
}

fn window_changes(previous: &Window, current: &Window, events: &mut Vec<Event>) {
  let window = || current.clone();
  if previous.title != current.title {
    events.push(Event::WindowNameChanged { window: window() });
  }
  if previous.bounds != current.bounds {
    events.push(Event::WindowGeometryChanged { window: window() });
  }
  if previous.state != current.state {
    events.push(Event::WindowStateChanged { window: window() });
  }
  if previous.actions != current.actions {
    events.push(Event::WindowActionsChanged { window: window() });
  }
  if previous.icon_digest != current.icon_digest {
    events.push(Event::WindowIconChanged { window: window() });
  }
  if previous.workspace != current.workspace {
    events.push(Event::WindowWorkspaceChanged {
      window: window(),
      previous: previous.workspace,
    });
  }
}

fn primary_index(monitors: &[Monitor]) -> Option<u32> {
  monitors.iter().find(|m| m.primary).map(|m| m.index)
}

fn count(len: usize) -> u32 {
  u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{monitor, screen, window, workspaces};
  use crate::types::Bounds;

  fn tracker_with(snapshot: ScreenSnapshot) -> WindowTracker {
    let mut tracker = WindowTracker::new(None);
    tracker.apply(snapshot);
    tracker
  }

  fn names(events: &[Event]) -> Vec<String> {
    events
      .iter()
      .map(|e| serde_json::to_value(e).unwrap()["event"].as_str().unwrap().to_owned())
      .collect()
  }

  mod lifecycle {
    use super::*;

    #[test]
    fn first_snapshot_opens_everything_in_order() {
      let mut tracker = WindowTracker::new(None);
      let events = tracker.apply(screen(vec![window(1, Some(10), "a", "A"), window(2, None, "b", "B")]));

      assert_eq!(
        names(&events),
        vec![
          "window:opened",
          "window:opened",
          "window:stacking-changed",
          "workspace:added",
          "workspace:added",
          "workspace:active-changed",
          "monitor:added",
          "monitor:primary-changed",
        ]
      );
      assert_eq!(events.first().and_then(Event::window).map(|w| w.id), Some(WindowId(1)));
    }

    #[test]
    fn identical_snapshot_emits_nothing() {
      let snapshot = screen(vec![window(1, None, "a", "A")]);
      let mut tracker = tracker_with(snapshot.clone());
      assert!(tracker.apply(snapshot).is_empty());
    }

    #[test]
    fn closes_come_before_opens() {
      let mut tracker = tracker_with(screen(vec![window(1, None, "a", "A")]));
      let events = tracker.apply(screen(vec![window(2, None, "b", "B")]));

      assert_eq!(names(&events)[..2], ["window:closed", "window:opened"]);
      assert_eq!(tracker.windows().len(), 1);
    }

    #[test]
    fn creation_order_survives_restacking() {
      let mut snapshot = screen(vec![window(1, None, "a", "A"), window(2, None, "b", "B")]);
      let mut tracker = tracker_with(snapshot.clone());

      snapshot.windows.reverse();
      snapshot.stacking.reverse();
      let events = tracker.apply(snapshot);

      assert_eq!(names(&events), vec!["window:stacking-changed"]);
      let created: Vec<u32> = tracker.windows().iter().map(|w| w.id.0).collect();
      let stacked: Vec<u32> = tracker.windows_stacked().iter().map(|w| w.id.0).collect();
      assert_eq!(created, vec![1, 2]);
      assert_eq!(stacked, vec![2, 1]);
    }

    #[test]
    fn stage_windows_are_flagged() {
      let mut tracker = WindowTracker::new(Some(ProcessId(42)));
      tracker.apply(screen(vec![window(1, Some(42), "launcher", "Launcher"), window(2, Some(7), "a", "A")]));
      assert!(tracker.window(WindowId(1)).is_some_and(|w| w.is_stage));
      assert!(tracker.window(WindowId(2)).is_some_and(|w| !w.is_stage));
    }
  }

  mod window_changes {
    use super::*;

    #[test]
    fn each_changed_attribute_has_its_event() {
      let mut snapshot = screen(vec![window(1, None, "a", "A")]);
      let mut tracker = tracker_with(snapshot.clone());

      if let Some(w) = snapshot.windows.first_mut() {
        w.title = "renamed".to_owned();
        w.bounds = Bounds::new(10, 10, 100, 100);
        w.state.maximized = true;
        w.actions.close = true;
        w.icon_digest = Some(7);
        w.workspace = Some(1);
      }
      let events = tracker.apply(snapshot);

      assert_eq!(
        names(&events),
        vec![
          "window:name-changed",
          "window:geometry-changed",
          "window:state-changed",
          "window:actions-changed",
          "window:icon-changed",
          "window:workspace-changed",
        ]
      );
      assert!(events.iter().any(|e| matches!(
        e,
        Event::WindowWorkspaceChanged { previous: Some(0), window } if window.workspace == Some(1)
      )));
    }
  }

  mod active_state {
    use super::*;

    #[test]
    fn closing_the_active_window_scrubs_it() {
      let mut snapshot = screen(vec![window(1, None, "a", "A"), window(2, None, "b", "B")]);
      snapshot.active_window = Some(WindowId(1));
      let mut tracker = tracker_with(snapshot.clone());
      assert_eq!(tracker.active_window().map(|w| w.id), Some(WindowId(1)));

      snapshot.windows.retain(|w| w.id != WindowId(1));
      snapshot.stacking.retain(|id| *id != WindowId(1));
      let events = tracker.apply(snapshot);

      assert!(tracker.active_window().is_none());
      assert!(!events.iter().any(|e| matches!(e, Event::ActiveWindowChanged { .. })));
    }

    #[test]
    fn active_window_change_reports_both_ends() {
      let mut snapshot = screen(vec![window(1, None, "a", "A"), window(2, None, "b", "B")]);
      snapshot.active_window = Some(WindowId(1));
      let mut tracker = tracker_with(snapshot.clone());

      snapshot.active_window = Some(WindowId(2));
      assert_eq!(
        tracker.apply(snapshot),
        vec![Event::ActiveWindowChanged {
          previous: Some(WindowId(1)),
          current: Some(WindowId(2)),
        }]
      );
    }

    #[test]
    fn unknown_active_window_is_ignored() {
      let mut snapshot = screen(vec![window(1, None, "a", "A")]);
      snapshot.active_window = Some(WindowId(99));
      let tracker = tracker_with(snapshot);
      assert!(tracker.active_window().is_none());
    }

    #[test]
    fn out_of_range_active_workspace_is_treated_as_absent() {
      let mut snapshot = screen(Vec::new());
      snapshot.active_workspace = Some(5);
      let tracker = tracker_with(snapshot);
      assert!(tracker.active_workspace().is_none());
    }

    #[test]
    fn removing_the_active_workspace_reports_the_new_one() {
      let mut snapshot = screen(Vec::new());
      snapshot.workspaces = workspaces(3);
      snapshot.active_workspace = Some(2);
      let mut tracker = tracker_with(snapshot.clone());

      snapshot.workspaces = workspaces(2);
      snapshot.active_workspace = Some(1);
      let events = tracker.apply(snapshot);

      assert_eq!(names(&events), vec!["workspace:removed", "workspace:active-changed"]);
      assert_eq!(
        events.last(),
        Some(&Event::ActiveWorkspaceChanged {
          previous: None,
          current: Some(1),
        })
      );
    }
  }

  mod workspaces {
    use super::*;

    #[test]
    fn lookup_by_number_is_range_checked() {
      let tracker = tracker_with(screen(Vec::new()));
      assert_eq!(tracker.workspaces_count(), 2);
      assert_eq!(tracker.workspace_by_number(1).map(|ws| ws.name.clone()).ok(), Some("Workspace 2".to_owned()));
      assert!(matches!(
        tracker.workspace_by_number(2),
        Err(TrackerError::WorkspaceOutOfRange { number: 2, count: 2 })
      ));
      assert!(tracker.workspace_by_number(u32::MAX).is_err());
    }

    #[test]
    fn numbering_gaps_are_cut_off() {
      let mut snapshot = screen(Vec::new());
      snapshot.workspaces = vec![
        Workspace { number: 3, name: "Far".to_owned() },
        Workspace { number: 1, name: "Web".to_owned() },
        Workspace { number: 0, name: "Main".to_owned() },
      ];
      let tracker = tracker_with(snapshot);

      assert_eq!(tracker.workspaces_count(), 2);
      assert_eq!(tracker.workspace_by_number(1).map(|ws| ws.name.as_str()).ok(), Some("Web"));
      assert!(matches!(
        tracker.workspace_by_number(3),
        Err(TrackerError::WorkspaceOutOfRange { number: 3, count: 2 })
      ));
    }

    #[test]
    fn rename_is_reported() {
      let mut snapshot = screen(Vec::new());
      let mut tracker = tracker_with(snapshot.clone());
      if let Some(ws) = snapshot.workspaces.get_mut(1) {
        ws.name = "Mail".to_owned();
      }
      let events = tracker.apply(snapshot);
      assert!(matches!(
        events.as_slice(),
        [Event::WorkspaceNameChanged { workspace }] if workspace.name == "Mail"
      ));
    }

    #[test]
    fn sticky_windows_are_on_every_workspace() {
      let mut sticky = window(2, None, "b", "B");
      sticky.workspace = None;
      let mut elsewhere = window(3, None, "c", "C");
      elsewhere.workspace = Some(0);
      let mut here = window(1, None, "a", "A");
      here.workspace = Some(1);
      let tracker = tracker_with(screen(vec![here, sticky, elsewhere]));

      let on_second: Vec<u32> = tracker.windows_on_workspace(1).unwrap().iter().map(|w| w.id.0).collect();
      assert_eq!(on_second, vec![1, 2]);
      assert!(tracker.windows_on_workspace(9).is_err());
    }
  }

  mod monitors {
    use super::*;

    fn dual_head() -> ScreenSnapshot {
      let mut snapshot = screen(Vec::new());
      snapshot.monitors = vec![
        monitor(0, Bounds::new(0, 0, 1920, 1080), true),
        monitor(1, Bounds::new(1920, 0, 1280, 1024), false),
      ];
      snapshot
    }

    #[test]
    fn window_maps_to_the_monitor_under_its_centre() {
      let mut snapshot = dual_head();
      let mut right = window(1, None, "a", "A");
      right.bounds = Bounds::new(2000, 100, 400, 300);
      let mut offscreen = window(2, None, "b", "B");
      offscreen.bounds = Bounds::new(-5000, -5000, 10, 10);
      snapshot.windows = vec![right, offscreen];
      let tracker = tracker_with(snapshot);

      assert_eq!(tracker.monitor_for_window(WindowId(1)).unwrap().map(|m| m.index), Some(1));
      assert_eq!(tracker.monitor_for_window(WindowId(2)).unwrap().map(|m| m.index), Some(0));
      assert!(matches!(
        tracker.monitor_for_window(WindowId(3)),
        Err(TrackerError::WindowNotFound(WindowId(3)))
      ));
    }

    #[test]
    fn primary_switch_and_resize_are_reported() {
      let mut snapshot = dual_head();
      let mut tracker = tracker_with(snapshot.clone());

      snapshot.monitors = vec![
        monitor(0, Bounds::new(0, 0, 1920, 1080), false),
        monitor(1, Bounds::new(1920, 0, 2560, 1440), true),
      ];
      let events = tracker.apply(snapshot);

      assert_eq!(names(&events), vec!["monitor:geometry-changed", "monitor:primary-changed"]);
      assert_eq!(
        events.last(),
        Some(&Event::PrimaryMonitorChanged {
          previous: Some(0),
          current: Some(1),
        })
      );
    }

    #[test]
    fn unplugging_is_reported_and_range_checked() {
      let mut snapshot = dual_head();
      let mut tracker = tracker_with(snapshot.clone());
      snapshot.monitors.truncate(1);
      let events = tracker.apply(snapshot);

      assert_eq!(names(&events), vec!["monitor:removed"]);
      assert!(matches!(
        tracker.monitor_by_number(1),
        Err(TrackerError::MonitorOutOfRange { number: 1, count: 1 })
      ));
      assert_eq!(tracker.primary_monitor().map(|m| m.index), Some(0));
    }
  }
}
