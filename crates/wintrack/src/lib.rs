/*!
wintrack - window and application tracking for desktop launchers

Follows the windows, workspaces and monitors an X11 window manager reports,
and attributes windows to the installed desktop-file applications they
belong to.

```ignore
use wintrack::{ApplicationDatabase, Tracker, X11WindowSystem};

// Connect, load the catalog and take the first snapshot
let tracker = Tracker::builder(X11WindowSystem::connect(None)?)
    .application_database(ApplicationDatabase::system())
    .stage_pid(std::process::id())
    .build()?;

// Query cached state
let windows = tracker.get_windows();
let running = tracker.is_running_by_desktop_id("org.gnome.Calculator.desktop");
let workspace = tracker.get_workspace_by_number(1)?;

// Subscribe to events
let mut events = tracker.subscribe();
while let Ok(event) = events.recv().await {
    // handle event
}

// Polling stops on shutdown or when the tracker is dropped
tracker.shutdown();
```
*/

mod appdb;
mod config;
mod core;
mod platform;
mod polling;

#[cfg(test)]
mod testing;

mod types;
pub use types::*;

pub use crate::appdb::{
  AppInfo, ApplicationDatabase, CatalogChanges, Menu, MenuSection, MAIN_CATEGORIES, OTHER_CATEGORY,
};
pub use crate::config::TrackerConfig;
pub use crate::core::{TrackedApplication, Tracker, TrackerBuilder};
pub use crate::platform::{ProcFs, ProcessEnvironment, ScreenSnapshot, TimestampSource, WindowSystem};

#[cfg(feature = "x11")]
pub use crate::platform::X11WindowSystem;
